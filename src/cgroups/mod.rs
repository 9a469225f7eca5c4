//! Pod and QoS cgroup hierarchy
//!
//! Containers are grouped into one cgroup per pod, and pods into one
//! parent per QoS class:
//!
//! ```text
//! {root}
//! ├── pod-{uid}            Guaranteed
//! ├── Burstable
//! │   └── pod-{uid}
//! └── BestEffort
//!     └── pod-{uid}
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use pod_cgroups::cgroups::{CgroupManagerKind, PodCgroupManager, PodContainerManager, QosContainerManager};
//!
//! let cgroups = Arc::new(CgroupManagerKind::from_config(&config));
//!
//! // Once at node bootstrap
//! let mut qos = QosContainerManager::new(config.qos_config(), Arc::clone(&cgroups));
//! qos.init(&config.qos_config())?;
//!
//! // From the pod sync loop
//! let pods = PodCgroupManager::new(config.node(), qos.containers_info(), cgroups);
//! pods.ensure_exists(&pod)?;
//! pods.destroy(&pod)?;
//! ```

pub mod aggregate;
pub mod backend;
pub mod classify;
pub mod error;
pub mod manager;
pub mod naming;
pub mod pod;
pub mod policy;
pub mod qos;
pub mod quantity;
pub mod testing;
pub mod types;

pub use aggregate::{pod_limits, pod_requests};
pub use backend::{CgroupBackend, CgroupDriver, Limit, UnifiedFsBackend};
pub use classify::{pod_qos_class, QosClassifier};
pub use error::{CgroupError, PodCgroupError, QosInitError, QuantityError};
pub use manager::{CgroupManager, CgroupManagerKind, LibcontainerCgroupManager, NoopCgroupManager};
pub use naming::pod_container_name;
pub use pod::{new_pod_container_manager, NoopPodContainerManager, PodCgroupManager, PodContainerManager};
pub use policy::{resource_config, MIN_SHARES};
pub use qos::{QosConfig, QosContainerManager, QosManagerState};
pub use quantity::Quantity;
pub use types::{
    CgroupConfig, Container, Node, Pod, QosClass, QosContainersInfo, ResourceConfig, ResourceList,
    ResourceName,
};
