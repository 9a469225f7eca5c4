//! Cgroup node managers
//!
//! `CgroupManager` is the capability every per-node operation goes through.
//! Exactly one variant is active per process, picked from configuration at
//! startup:
//!
//! ```text
//! CgroupManagerKind
//! ├── Cgroupfs(LibcontainerCgroupManager)   names used as filesystem paths
//! ├── Systemd(LibcontainerCgroupManager)    names mapped to .slice units
//! └── Noop(NoopCgroupManager)               enforcement disabled
//! ```

use std::io;
use std::sync::Arc;

use tracing::{debug, warn};

use super::backend::{Cgroup, CgroupBackend, CgroupDriver, Limit, Resources, UnifiedFsBackend};
use super::error::CgroupError;
use super::types::{CgroupConfig, ResourceConfig};
use crate::config::NodeConfig;
use crate::metrics::record_operation;

/// Create/update/destroy/lookup for one cgroup node at a time.
pub trait CgroupManager: Send + Sync {
    /// Creates the node and applies its limits. Succeeds if the node exists.
    fn create(&self, config: &CgroupConfig) -> Result<(), CgroupError>;

    /// Re-applies limits to an existing node. `NotFound` if it is missing.
    fn update(&self, config: &CgroupConfig) -> Result<(), CgroupError>;

    /// Removes the node. A missing node is not an error.
    fn destroy(&self, config: &CgroupConfig) -> Result<(), CgroupError>;

    /// Whether the node exists, keeping "could not tell" as an error.
    fn lookup(&self, name: &str) -> Result<bool, CgroupError>;

    /// Whether the node exists. Lookup failures (permissions, missing
    /// mount) read as `false`; use `lookup` to tell them apart.
    fn exists(&self, name: &str) -> bool {
        match self.lookup(name) {
            Ok(exists) => exists,
            Err(e) => {
                warn!(cgroup = name, error = %e, "cgroup lookup failed, treating as absent");
                false
            }
        }
    }
}

impl<M: CgroupManager + ?Sized> CgroupManager for Arc<M> {
    fn create(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        (**self).create(config)
    }

    fn update(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        (**self).update(config)
    }

    fn destroy(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        (**self).destroy(config)
    }

    fn lookup(&self, name: &str) -> Result<bool, CgroupError> {
        (**self).lookup(name)
    }

    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }
}

/// Drives a raw `CgroupBackend`, libcontainer style: create is
/// `apply(0)` followed by `set`, update is `set` alone.
#[derive(Debug, Clone)]
pub struct LibcontainerCgroupManager<B> {
    backend: B,
    driver: CgroupDriver,
}

impl<B: CgroupBackend> LibcontainerCgroupManager<B> {
    pub fn new(backend: B, driver: CgroupDriver) -> Self {
        Self { backend, driver }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn driver(&self) -> CgroupDriver {
        self.driver
    }

    /// Backend cgroup for `config`. Zero resource fields are left unset so
    /// the backend does not touch those control files, except that with
    /// `lift_unset` a zero memory or CPU quota becomes `Limit::Unlimited`.
    /// Updates lift them so a limit dropped from a pod does not linger.
    fn backend_cgroup(&self, config: &CgroupConfig, lift_unset: bool) -> Result<Cgroup, CgroupError> {
        let name = config.path();
        let ResourceConfig {
            memory,
            cpu_shares,
            cpu_quota,
        } = config.resources;

        for (field, value) in [("memory", memory), ("cpu_shares", cpu_shares), ("cpu_quota", cpu_quota)] {
            if value < 0 {
                return Err(CgroupError::Configuration {
                    name,
                    reason: format!("{} must not be negative, got {}", field, value),
                });
            }
        }

        let non_zero = |v: i64| (v != 0).then_some(v);
        let limit = |v: i64| match (v, lift_unset) {
            (0, true) => Some(Limit::Unlimited),
            (0, false) => None,
            (v, _) => Some(Limit::Value(v)),
        };
        Ok(Cgroup {
            path: self.driver.adapt_name(&name),
            resources: Resources {
                memory: limit(memory),
                cpu_shares: non_zero(cpu_shares),
                cpu_quota: limit(cpu_quota),
            },
        })
    }
}

impl<B: CgroupBackend> CgroupManager for LibcontainerCgroupManager<B> {
    fn create(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        let result = self.backend_cgroup(config, false).and_then(|cgroup| {
            let wrap = |source| CgroupError::Create {
                name: config.path(),
                source,
            };
            // Apply(0) creates the node without attaching any real process
            self.backend.apply(&cgroup, 0).map_err(wrap)?;
            self.backend.set(&cgroup).map_err(wrap)?;
            debug!(cgroup = %cgroup.path, "created cgroup");
            Ok(())
        });
        record_operation("create", &result);
        result
    }

    fn update(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        let result = self.backend_cgroup(config, true).and_then(|cgroup| {
            let name = config.path();
            if !self.lookup(&name)? {
                return Err(CgroupError::NotFound { name });
            }
            self.backend.set(&cgroup).map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => CgroupError::NotFound { name: name.clone() },
                _ => CgroupError::Update {
                    name: name.clone(),
                    source,
                },
            })?;
            debug!(cgroup = %cgroup.path, resources = ?cgroup.resources, "updated cgroup");
            Ok(())
        });
        record_operation("update", &result);
        result
    }

    fn destroy(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        let result = self.backend_cgroup(config, false).and_then(|cgroup| {
            match self.backend.destroy(&cgroup) {
                Ok(()) => {}
                // Pods may be destroyed more than once
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(CgroupError::Destroy {
                        name: config.path(),
                        source,
                    })
                }
            }
            debug!(cgroup = %cgroup.path, "destroyed cgroup");
            Ok(())
        });
        record_operation("destroy", &result);
        result
    }

    fn lookup(&self, name: &str) -> Result<bool, CgroupError> {
        self.backend
            .exists(&self.driver.adapt_name(name))
            .map_err(|source| CgroupError::Lookup {
                name: name.to_string(),
                source,
            })
    }
}

/// Accepts every operation and reports every node as present.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCgroupManager;

impl CgroupManager for NoopCgroupManager {
    fn create(&self, _config: &CgroupConfig) -> Result<(), CgroupError> {
        Ok(())
    }

    fn update(&self, _config: &CgroupConfig) -> Result<(), CgroupError> {
        Ok(())
    }

    fn destroy(&self, _config: &CgroupConfig) -> Result<(), CgroupError> {
        Ok(())
    }

    fn lookup(&self, _name: &str) -> Result<bool, CgroupError> {
        Ok(true)
    }
}

/// The cgroup manager selected for this process.
#[derive(Debug, Clone)]
pub enum CgroupManagerKind {
    Cgroupfs(LibcontainerCgroupManager<UnifiedFsBackend>),
    Systemd(LibcontainerCgroupManager<UnifiedFsBackend>),
    Noop(NoopCgroupManager),
}

impl CgroupManagerKind {
    /// Picks the variant once from node configuration: no-op when per-QoS
    /// cgroups are disabled, otherwise the configured driver over the
    /// unified hierarchy at `cgroup_mount`.
    pub fn from_config(config: &NodeConfig) -> Self {
        if !config.cgroups_per_qos {
            return CgroupManagerKind::Noop(NoopCgroupManager);
        }
        let backend = UnifiedFsBackend::new(&config.cgroup_mount);
        match config.cgroup_driver {
            CgroupDriver::Cgroupfs => {
                CgroupManagerKind::Cgroupfs(LibcontainerCgroupManager::new(backend, CgroupDriver::Cgroupfs))
            }
            CgroupDriver::Systemd => {
                CgroupManagerKind::Systemd(LibcontainerCgroupManager::new(backend, CgroupDriver::Systemd))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CgroupManagerKind::Cgroupfs(_) => "cgroupfs",
            CgroupManagerKind::Systemd(_) => "systemd",
            CgroupManagerKind::Noop(_) => "noop",
        }
    }

    fn inner(&self) -> &dyn CgroupManager {
        match self {
            CgroupManagerKind::Cgroupfs(m) | CgroupManagerKind::Systemd(m) => m as &dyn CgroupManager,
            CgroupManagerKind::Noop(m) => m as &dyn CgroupManager,
        }
    }
}

impl CgroupManager for CgroupManagerKind {
    fn create(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        self.inner().create(config)
    }

    fn update(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        self.inner().update(config)
    }

    fn destroy(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        self.inner().destroy(config)
    }

    fn lookup(&self, name: &str) -> Result<bool, CgroupError> {
        self.inner().lookup(name)
    }
}
