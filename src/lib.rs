//! pod-cgroups - per-node cgroup hierarchy for pods grouped by QoS class
//!
//! This library sizes and maintains the cgroups that isolate pods on a
//! node: one parent per QoS class, one child per pod, with CPU and memory
//! limits derived from the pod's containers.
//!
//! # Modules
//!
//! - `cgroups` - resource aggregation, QoS policy, naming and the managers
//! - `config` - node configuration loaded at startup
//! - `metrics` - Prometheus counters for cgroup operations
//! - `tracing` - log subscriber setup
//!
//! # Quick Start
//!
//! ```ignore
//! use pod_cgroups::{NodeConfig, bootstrap};
//!
//! let config = NodeConfig::load("/etc/podcg/node.json")?;
//! let (_qos, pods) = bootstrap(&config)?;
//! pods.ensure_exists(&pod)?;
//! ```

pub mod cgroups;
pub mod config;
pub mod metrics;
pub mod tracing;

use std::sync::Arc;

// Re-export commonly used types at crate root for convenience
pub use cgroups::{
    CgroupConfig, CgroupManager, CgroupManagerKind, Pod, PodContainerManager, QosClass,
    QosContainersInfo, Quantity, ResourceConfig, ResourceList,
};
pub use config::NodeConfig;

/// Node bootstrap: picks the cgroup manager, creates the top level QoS
/// cgroups, and returns the pod manager for the sync loop.
///
/// Must finish before any per-pod operation runs.
pub fn bootstrap(
    config: &NodeConfig,
) -> Result<(QosContainersInfo, Box<dyn PodContainerManager>), cgroups::QosInitError> {
    let manager = Arc::new(CgroupManagerKind::from_config(config));
    ::tracing::info!(driver = manager.name(), root = %config.qos_config().root(), "bootstrapping cgroups");

    let mut qos = cgroups::QosContainerManager::new(config.qos_config(), Arc::clone(&manager));
    qos.init(&config.qos_config())?;
    let info = qos.containers_info();

    let pods = cgroups::new_pod_container_manager(config, info.clone(), manager);
    Ok((info, pods))
}
