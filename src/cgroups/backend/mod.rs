//! Raw cgroup primitives
//!
//! The managers never touch the cgroup filesystem directly. They build a
//! backend `Cgroup` and drive it through the primitives below,
//! the same split libcontainer uses between its config and its managers.
//!
//! ```text
//! CgroupConfig ──(driver name adapter)──► Cgroup ──► CgroupBackend
//!                                                     ├── apply(pid)
//!                                                     ├── set()
//!                                                     ├── destroy()
//!                                                     ├── paths()
//!                                                     └── pids()
//! ```

pub mod fs;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use fs::UnifiedFsBackend;

/// Value of a hard limit control file such as `memory.max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Lifts the limit (`max`)
    Unlimited,
    Value(i64),
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unlimited => f.write_str("max"),
            Limit::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Resources to write. `None` leaves the control file untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resources {
    /// Bytes
    pub memory: Option<Limit>,
    pub cpu_shares: Option<i64>,
    /// Milli-CPU per period
    pub cpu_quota: Option<Limit>,
}

/// A cgroup node as the backend sees it: a driver-specific path and the
/// resources to enforce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cgroup {
    pub path: String,
    pub resources: Resources,
}

/// The raw enforcement primitive.
pub trait CgroupBackend: Send + Sync {
    /// Creates the node if needed and attaches `pid` to it.
    /// Pid 0 only creates the node.
    fn apply(&self, cgroup: &Cgroup, pid: u32) -> io::Result<()>;

    /// Writes the resource limits of an existing node.
    fn set(&self, cgroup: &Cgroup) -> io::Result<()>;

    /// Removes the node. A node that does not exist is not an error.
    fn destroy(&self, cgroup: &Cgroup) -> io::Result<()>;

    /// Filesystem locations of the node, keyed by subsystem.
    fn paths(&self, cgroup: &Cgroup) -> HashMap<String, PathBuf>;

    /// Pids attached to the node.
    fn pids(&self, cgroup: &Cgroup) -> io::Result<Vec<u32>>;

    /// Whether the node exists. Errors mean "could not tell".
    fn exists(&self, path: &str) -> io::Result<bool>;
}

/// How cgroup names map onto the hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CgroupDriver {
    /// Names are filesystem paths as given
    #[default]
    Cgroupfs,
    /// Names become nested systemd slice units
    Systemd,
}

impl CgroupDriver {
    /// Converts a cgroup name into the path this driver manages.
    ///
    /// ```text
    /// cgroupfs: /Burstable/pod-b1 → /Burstable/pod-b1
    /// systemd:  /Burstable/pod-b1 → /Burstable.slice/Burstable-pod_b1.slice
    /// ```
    pub fn adapt_name(&self, name: &str) -> String {
        match self {
            CgroupDriver::Cgroupfs => name.to_string(),
            CgroupDriver::Systemd => to_systemd_name(name),
        }
    }
}

/// Each path component becomes a slice whose unit name carries all of its
/// ancestors, joined by `-`. Dashes inside a component are escaped to `_`
/// because systemd reads `-` as the nesting separator.
///
/// The mapping is not injective: `pod-a-b` and `pod-a_b` land on the same
/// slice.
fn to_systemd_name(name: &str) -> String {
    let components: Vec<String> = name
        .split('/')
        .filter(|c| !c.is_empty())
        .map(|c| c.replace('-', "_"))
        .collect();
    if components.is_empty() {
        return "/".to_string();
    }

    let mut path = String::new();
    let mut unit = String::new();
    for component in components {
        if !unit.is_empty() {
            unit.push('-');
        }
        unit.push_str(&component);
        path.push('/');
        path.push_str(&unit);
        path.push_str(".slice");
    }
    path
}
