//! Error types for the cgroup managers
//!
//! Backend failures arrive as `io::Error` and are wrapped here with the
//! cgroup name, QoS class, or pod UID they belong to. Nothing in this crate
//! retries: every error goes back to the caller's sync loop.

use std::io;

use thiserror::Error;

use super::types::QosClass;

/// Failure parsing a resource quantity string such as `100m` or `10Gi`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("quantity '{0}' is negative")]
    Negative(String),

    #[error("quantity '{0}' is not a number")]
    InvalidNumber(String),

    #[error("quantity '{input}' has unknown suffix '{suffix}'")]
    UnknownSuffix { input: String, suffix: String },

    #[error("quantity '{0}' is too large")]
    Overflow(String),
}

/// Failure of a single cgroup node operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CgroupError {
    /// The resource config cannot be expressed by the backend.
    #[error("invalid resource config for cgroup {name}: {reason}")]
    Configuration { name: String, reason: String },

    #[error("failed to create cgroup {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to update cgroup {name}: {source}")]
    Update {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Update was asked for a node that was never created.
    #[error("cgroup {name} does not exist")]
    NotFound { name: String },

    #[error("failed to destroy cgroup {name}: {source}")]
    Destroy {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The backend could not tell whether the node exists (permissions,
    /// missing mount). `CgroupManager::exists` folds this into `false`.
    #[error("failed to look up cgroup {name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl CgroupError {
    /// Name of the cgroup the error refers to.
    pub fn name(&self) -> &str {
        match self {
            CgroupError::Configuration { name, .. }
            | CgroupError::Create { name, .. }
            | CgroupError::Update { name, .. }
            | CgroupError::NotFound { name }
            | CgroupError::Destroy { name, .. }
            | CgroupError::Lookup { name, .. } => name,
        }
    }
}

/// Failure bootstrapping the top level QoS cgroups. Fatal to node startup.
#[derive(Debug, Error)]
#[error("failed to create cgroups for the {qos} qos class")]
pub struct QosInitError {
    pub qos: QosClass,
    #[source]
    pub source: CgroupError,
}

/// Failure of a per-pod operation. Only the named pod is affected.
#[derive(Debug, Error)]
pub enum PodCgroupError {
    /// Rejected before any cgroup is touched.
    #[error("invalid pod uid {uid:?}: {reason}")]
    InvalidUid { uid: String, reason: &'static str },

    #[error("failed to create container {name} for pod {uid}")]
    Create {
        uid: String,
        name: String,
        #[source]
        source: CgroupError,
    },

    #[error("failed to apply resource limits on container {name} for pod {uid}")]
    Update {
        uid: String,
        name: String,
        #[source]
        source: CgroupError,
    },

    #[error("failed to delete cgroup paths {name} for pod {uid}")]
    Destroy {
        uid: String,
        name: String,
        #[source]
        source: CgroupError,
    },
}

impl PodCgroupError {
    /// UID of the pod whose operation failed.
    pub fn uid(&self) -> &str {
        match self {
            PodCgroupError::InvalidUid { uid, .. }
            | PodCgroupError::Create { uid, .. }
            | PodCgroupError::Update { uid, .. }
            | PodCgroupError::Destroy { uid, .. } => uid,
        }
    }
}
