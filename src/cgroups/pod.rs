//! Per-pod cgroup lifecycle
//!
//! ```text
//! Pod ──► pod_requests ─┐
//!     └─► pod_limits  ──┼─► resource_config(qos) ──► CgroupManager::update
//!                       │
//!          classifier ──┘
//! ```
//!
//! The manager holds no locks. Callers run at most one operation per pod
//! UID at a time and only after the QoS cgroups have been initialized.

use tracing::{debug, info, warn};

use super::aggregate::{pod_limits, pod_requests};
use super::classify::{pod_qos_class, QosClassifier};
use super::error::{CgroupError, PodCgroupError};
use super::manager::CgroupManager;
use super::naming;
use super::policy::resource_config;
use super::types::{CgroupConfig, Node, Pod, QosContainersInfo};
use crate::config::NodeConfig;

/// Pod level cgroup operations used by the pod sync loop.
pub trait PodContainerManager: Send + Sync {
    /// Whether the pod's cgroup exists. Lookup failures read as `false`.
    fn exists(&self, pod: &Pod) -> bool;

    /// Creates the pod cgroup if needed, then (re)applies its limits.
    /// A UID that is not a single path component is rejected up front.
    fn ensure_exists(&self, pod: &Pod) -> Result<(), PodCgroupError>;

    /// Absolute cgroup name of the pod.
    fn pod_container_name(&self, pod: &Pod) -> String;

    /// Removes the pod cgroup. Succeeds if it was never created.
    fn destroy(&self, pod: &Pod) -> Result<(), PodCgroupError>;
}

/// Enforcing implementation backed by a `CgroupManager`.
pub struct PodCgroupManager<M> {
    node: Node,
    qos_containers: QosContainersInfo,
    classifier: QosClassifier,
    cgroup_manager: M,
}

impl<M: CgroupManager> PodCgroupManager<M> {
    /// Manager using the default QoS classifier.
    pub fn new(node: Node, qos_containers: QosContainersInfo, cgroup_manager: M) -> Self {
        Self::with_classifier(node, qos_containers, pod_qos_class, cgroup_manager)
    }

    pub fn with_classifier(
        node: Node,
        qos_containers: QosContainersInfo,
        classifier: QosClassifier,
        cgroup_manager: M,
    ) -> Self {
        Self {
            node,
            qos_containers,
            classifier,
            cgroup_manager,
        }
    }

    pub fn qos_containers(&self) -> &QosContainersInfo {
        &self.qos_containers
    }

    /// The pod's cgroup name, once its UID is known to be safe to use as a
    /// path component.
    fn checked_name(&self, pod: &Pod) -> Result<String, PodCgroupError> {
        naming::validate_pod_uid(&pod.uid).map_err(|reason| PodCgroupError::InvalidUid {
            uid: pod.uid.clone(),
            reason,
        })?;
        Ok(self.pod_container_name(pod))
    }

    /// Sizes the pod cgroup from the pod's aggregated resources.
    pub(crate) fn apply_limits(&self, pod: &Pod) -> Result<(), CgroupError> {
        let qos = (self.classifier)(pod);
        let requests = pod_requests(pod);
        let limits = pod_limits(pod, &self.node);
        let config = CgroupConfig {
            name: self.pod_container_name(pod),
            parent: String::new(),
            resources: resource_config(qos, &requests, &limits),
        };
        debug!(pod = %pod.uid, %qos, cgroup = %config.name, resources = ?config.resources, "applying pod limits");
        self.cgroup_manager.update(&config)
    }
}

impl<M: CgroupManager> PodContainerManager for PodCgroupManager<M> {
    fn exists(&self, pod: &Pod) -> bool {
        match self.checked_name(pod) {
            Ok(name) => self.cgroup_manager.exists(&name),
            Err(e) => {
                warn!(error = %e, "pod cgroup lookup skipped");
                false
            }
        }
    }

    fn ensure_exists(&self, pod: &Pod) -> Result<(), PodCgroupError> {
        let name = self.checked_name(pod)?;

        // Create unconstrained first so a failed create never leaves
        // partially applied limits behind
        if !self.cgroup_manager.exists(&name) {
            self.cgroup_manager
                .create(&CgroupConfig::unconstrained(name.clone()))
                .map_err(|source| PodCgroupError::Create {
                    uid: pod.uid.clone(),
                    name: name.clone(),
                    source,
                })?;
            info!(pod = %pod.uid, cgroup = %name, "created pod cgroup");
        }

        self.apply_limits(pod).map_err(|source| PodCgroupError::Update {
            uid: pod.uid.clone(),
            name,
            source,
        })
    }

    fn pod_container_name(&self, pod: &Pod) -> String {
        naming::pod_container_name(&self.qos_containers, (self.classifier)(pod), &pod.uid)
    }

    fn destroy(&self, pod: &Pod) -> Result<(), PodCgroupError> {
        let name = self.checked_name(pod)?;
        self.cgroup_manager
            .destroy(&CgroupConfig::unconstrained(name.clone()))
            .map_err(|source| PodCgroupError::Destroy {
                uid: pod.uid.clone(),
                name: name.clone(),
                source,
            })?;
        info!(pod = %pod.uid, cgroup = %name, "destroyed pod cgroup");
        Ok(())
    }
}

/// Used when per-pod cgroups are disabled: keeps the interface, enforces
/// nothing.
#[derive(Debug, Clone)]
pub struct NoopPodContainerManager {
    cgroups_root: String,
}

impl NoopPodContainerManager {
    pub fn new(cgroups_root: impl Into<String>) -> Self {
        Self {
            cgroups_root: cgroups_root.into(),
        }
    }
}

impl PodContainerManager for NoopPodContainerManager {
    fn exists(&self, _pod: &Pod) -> bool {
        true
    }

    fn ensure_exists(&self, _pod: &Pod) -> Result<(), PodCgroupError> {
        Ok(())
    }

    fn pod_container_name(&self, _pod: &Pod) -> String {
        self.cgroups_root.clone()
    }

    fn destroy(&self, _pod: &Pod) -> Result<(), PodCgroupError> {
        Ok(())
    }
}

/// Picks the pod manager for this node: no-op when `cgroups_per_qos` is
/// off, otherwise an enforcing manager over `cgroup_manager`.
pub fn new_pod_container_manager<M>(
    config: &NodeConfig,
    qos_containers: QosContainersInfo,
    cgroup_manager: M,
) -> Box<dyn PodContainerManager>
where
    M: CgroupManager + 'static,
{
    if config.cgroups_per_qos {
        Box::new(PodCgroupManager::new(config.node(), qos_containers, cgroup_manager))
    } else {
        Box::new(NoopPodContainerManager::new(config.qos_config().root()))
    }
}
