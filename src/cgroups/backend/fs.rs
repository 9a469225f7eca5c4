//! cgroup v2 unified hierarchy backend
//!
//! Every cgroup node is a directory under the mount point. Resource limits
//! are plain text control files inside it:
//!
//! ```text
//! /sys/fs/cgroup/                     ← cgroup v2 root (mount point)
//! ├── cgroup.subtree_control          ← "+cpu +memory" delegates controllers
//! ├── pod-g1/                         ← Guaranteed pod
//! ├── Burstable/                      ← QoS parent
//! │   ├── cgroup.subtree_control
//! │   └── pod-b1/
//! │       ├── cpu.weight              ← relative share under contention
//! │       ├── cpu.max                 ← "{quota} {period}" or "max {period}"
//! │       ├── memory.max              ← bytes or "max"
//! │       └── cgroup.procs            ← PIDs in this cgroup
//! └── BestEffort/
//!     └── ...
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Cgroup, CgroupBackend, Limit};

/// Default cgroup v2 mount point
pub const DEFAULT_CGROUP_MOUNT: &str = "/sys/fs/cgroup";

/// CPU accounting period in microseconds (100ms)
pub const CPU_PERIOD_US: i64 = 100_000;

/// Bounds of the cgroup v1 `cpu.shares` range
const MIN_CPU_SHARES: i64 = 2;
const MAX_CPU_SHARES: i64 = 262_144;

/// Controllers delegated to child cgroups
const SUBTREE_CONTROLLERS: &str = "+cpu +memory";

/// Key under which `paths()` reports the unified hierarchy
const UNIFIED_SUBSYSTEM: &str = "unified";

/// Converts cgroup v1 shares ([2, 262144]) to a cgroup v2 weight
/// ([1, 10000]) with the linear mapping runc uses.
pub fn shares_to_weight(shares: i64) -> u64 {
    let shares = shares.clamp(MIN_CPU_SHARES, MAX_CPU_SHARES);
    (1 + ((shares - 2) * 9999) / 262_142) as u64
}

/// Converts a milli-CPU cap into a `cpu.max` quota for one period.
pub fn milli_cpu_to_quota(milli: i64) -> i64 {
    // Below 1ms per period the kernel rejects the write
    (milli.saturating_mul(CPU_PERIOD_US) / 1000).max(1000)
}

fn has_child_cgroups(dir: &Path) -> io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        if entry?.file_type()?.is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Cgroup v2 filesystem backend rooted at a mount point.
#[derive(Debug, Clone)]
pub struct UnifiedFsBackend {
    mount: PathBuf,
}

impl UnifiedFsBackend {
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        Self {
            mount: mount.into(),
        }
    }

    pub fn mount(&self) -> &Path {
        &self.mount
    }

    /// Filesystem directory of a cgroup path such as `/Burstable/pod-b1`
    fn dir(&self, path: &str) -> PathBuf {
        self.mount.join(path.trim_start_matches('/'))
    }

    /// Enables the cpu and memory controllers on every ancestor of `dir`
    /// that carries a `cgroup.subtree_control` file.
    ///
    /// In cgroups v2 a child can only use controllers its parent lists in
    /// `subtree_control`.
    fn delegate_controllers(&self, dir: &Path) -> io::Result<()> {
        let mut ancestors: Vec<&Path> = dir
            .ancestors()
            .skip(1)
            .take_while(|p| p.starts_with(&self.mount))
            .collect();
        ancestors.reverse();

        for ancestor in ancestors {
            let control = ancestor.join("cgroup.subtree_control");
            if control.exists() {
                fs::write(&control, SUBTREE_CONTROLLERS)?;
            }
        }
        Ok(())
    }
}

impl Default for UnifiedFsBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CGROUP_MOUNT)
    }
}

impl CgroupBackend for UnifiedFsBackend {
    fn apply(&self, cgroup: &Cgroup, pid: u32) -> io::Result<()> {
        let dir = self.dir(&cgroup.path);

        // The kernel creates the control files along with the directory
        fs::create_dir_all(&dir)?;
        self.delegate_controllers(&dir)?;

        if pid != 0 {
            // Writing a PID to cgroup.procs moves that process into the cgroup
            fs::write(dir.join("cgroup.procs"), pid.to_string())?;
        }
        debug!(path = %dir.display(), pid, "applied cgroup");
        Ok(())
    }

    fn set(&self, cgroup: &Cgroup) -> io::Result<()> {
        let dir = self.dir(&cgroup.path);
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("cgroup directory {} does not exist", dir.display()),
            ));
        }

        let resources = &cgroup.resources;
        if let Some(shares) = resources.cpu_shares {
            fs::write(dir.join("cpu.weight"), shares_to_weight(shares).to_string())?;
        }
        if let Some(quota) = resources.cpu_quota {
            let quota = match quota {
                Limit::Value(milli) => Limit::Value(milli_cpu_to_quota(milli)),
                Limit::Unlimited => Limit::Unlimited,
            };
            fs::write(dir.join("cpu.max"), format!("{} {}", quota, CPU_PERIOD_US))?;
        }
        if let Some(memory) = resources.memory {
            fs::write(dir.join("memory.max"), memory.to_string())?;
        }
        debug!(path = %dir.display(), ?resources, "set cgroup resources");
        Ok(())
    }

    fn destroy(&self, cgroup: &Cgroup) -> io::Result<()> {
        let dir = self.dir(&cgroup.path);

        // rmdir (not rm -rf) - the kernel requires this, and refuses while
        // processes are still attached
        match fs::remove_dir(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            // Only a plain directory tree (not cgroupfs) keeps control files
            // around; with no child cgroups left they can go with it
            Err(e) if e.raw_os_error() == Some(libc::ENOTEMPTY) => {
                if has_child_cgroups(&dir)? {
                    Err(e)
                } else {
                    fs::remove_dir_all(&dir)
                }
            }
            Err(e) if e.raw_os_error() == Some(libc::EBUSY) => Err(io::Error::new(
                e.kind(),
                format!("cgroup {} still has attached processes", dir.display()),
            )),
            Err(e) => Err(e),
        }
    }

    fn paths(&self, cgroup: &Cgroup) -> HashMap<String, PathBuf> {
        let mut paths = HashMap::new();
        paths.insert(UNIFIED_SUBSYSTEM.to_string(), self.dir(&cgroup.path));
        paths
    }

    fn pids(&self, cgroup: &Cgroup) -> io::Result<Vec<u32>> {
        let procs = self.dir(&cgroup.path).join("cgroup.procs");
        let content = match fs::read_to_string(&procs) {
            Ok(content) => content,
            // No procs file, so no pids attached to this directory
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.parse()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            })
            .collect()
    }

    fn exists(&self, path: &str) -> io::Result<bool> {
        match fs::metadata(self.dir(path)) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
