//! Node configuration
//!
//! Loaded once at startup from a JSON file. Every field has a default, so
//! an empty object `{}` is a valid config.
//!
//! ```json
//! {
//!   "cgroup_root": "/kubepods",
//!   "cgroups_per_qos": true,
//!   "cgroup_driver": "cgroupfs",
//!   "cgroup_mount": "/sys/fs/cgroup",
//!   "capacity": { "cpu": "8", "memory": "32Gi" }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cgroups::backend::fs::DEFAULT_CGROUP_MOUNT;
use crate::cgroups::backend::CgroupDriver;
use crate::cgroups::qos::{QosConfig, DEFAULT_ROOT_CONTAINER};
use crate::cgroups::types::{Node, ResourceList};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Root of the QoS cgroup hierarchy
    pub cgroup_root: String,
    /// Per-QoS and per-pod cgroups; `false` selects the no-op managers
    pub cgroups_per_qos: bool,
    pub cgroup_driver: CgroupDriver,
    /// Where the cgroup v2 hierarchy is mounted
    pub cgroup_mount: PathBuf,
    /// Node capacity, used as the limit for unlimited containers
    pub capacity: ResourceList,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cgroup_root: DEFAULT_ROOT_CONTAINER.to_string(),
            cgroups_per_qos: true,
            cgroup_driver: CgroupDriver::default(),
            cgroup_mount: PathBuf::from(DEFAULT_CGROUP_MOUNT),
            capacity: ResourceList::default(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn qos_config(&self) -> QosConfig {
        QosConfig::new(self.cgroup_root.clone())
    }

    pub fn node(&self) -> Node {
        Node {
            capacity: self.capacity.clone(),
        }
    }
}
