//! Top level QoS cgroups
//!
//! Burstable and BestEffort pods each get a parent cgroup under the
//! configured root. Guaranteed pods have no parent of their own and sit
//! directly under the root.
//!
//! `init` runs once at node bootstrap, before any per-pod operation. A
//! failure there is fatal to startup and is not retried.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::QosInitError;
use super::manager::CgroupManager;
use super::naming;
use super::types::{CgroupConfig, QosClass, QosContainersInfo, ResourceConfig};
use crate::metrics::record_qos_init;

/// Root used when none is configured
pub const DEFAULT_ROOT_CONTAINER: &str = "/";

/// Classes that get a dedicated top level cgroup
const TOP_LEVEL_CLASSES: [QosClass; 2] = [QosClass::Burstable, QosClass::BestEffort];

/// How the QoS hierarchy is organized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QosConfig {
    /// Root of the QoS hierarchy; empty means `/`
    #[serde(default)]
    pub root_container_name: String,
}

impl QosConfig {
    pub fn new(root_container_name: impl Into<String>) -> Self {
        Self {
            root_container_name: root_container_name.into(),
        }
    }

    /// Configured root, falling back to `/`
    pub fn root(&self) -> &str {
        if self.root_container_name.is_empty() {
            DEFAULT_ROOT_CONTAINER
        } else {
            &self.root_container_name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosManagerState {
    Uninitialized,
    Ready,
}

/// Creates and names the top level QoS cgroups.
#[derive(Debug)]
pub struct QosContainerManager<M> {
    manager: M,
    config: QosConfig,
    state: QosManagerState,
}

impl<M: CgroupManager> QosContainerManager<M> {
    pub fn new(config: QosConfig, manager: M) -> Self {
        Self {
            manager,
            config,
            state: QosManagerState::Uninitialized,
        }
    }

    pub fn state(&self) -> QosManagerState {
        self.state
    }

    /// Creates placeholder cgroups for the Burstable and BestEffort classes
    /// under the configured root, with no resource constraints.
    ///
    /// Calling it again re-runs the same idempotent creates. It is not safe
    /// to race against per-pod operations.
    pub fn init(&mut self, config: &QosConfig) -> Result<(), QosInitError> {
        self.config = config.clone();
        let root = self.config.root().to_string();

        let result = TOP_LEVEL_CLASSES.iter().try_for_each(|&qos| {
            let container = CgroupConfig {
                name: qos.as_str().to_string(),
                parent: root.clone(),
                resources: ResourceConfig::default(),
            };
            self.manager
                .create(&container)
                .map_err(|source| QosInitError { qos, source })
        });
        record_qos_init(&result);
        result?;

        self.state = QosManagerState::Ready;
        info!(root = %root, "top level qos containers initialized");
        Ok(())
    }

    /// Absolute names of the QoS parents. Depends only on the root.
    pub fn containers_info(&self) -> QosContainersInfo {
        let root = self.config.root();
        QosContainersInfo {
            guaranteed: naming::clean(root),
            burstable: naming::join(root, QosClass::Burstable.as_str()),
            best_effort: naming::join(root, QosClass::BestEffort.as_str()),
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }
}
