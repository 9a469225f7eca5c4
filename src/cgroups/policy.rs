//! QoS class → cgroup resource config
//!
//! Guaranteed and Burstable pods translate resources the same way; the two
//! classes differ only in where the pod cgroup is placed. BestEffort pods
//! get no limits and the lowest CPU weight the kernel accepts.

use super::types::{QosClass, ResourceConfig, ResourceList};

/// CPU shares floor for BestEffort pods
pub const MIN_SHARES: i64 = 2;

/// Resource config for a pod of class `qos` with the given aggregated
/// requests and limits.
pub fn resource_config(qos: QosClass, requests: &ResourceList, limits: &ResourceList) -> ResourceConfig {
    match qos {
        QosClass::Guaranteed => guaranteed_policy(requests, limits),
        QosClass::Burstable => burstable_policy(requests, limits),
        QosClass::BestEffort => best_effort_policy(requests, limits),
    }
}

pub fn guaranteed_policy(requests: &ResourceList, limits: &ResourceList) -> ResourceConfig {
    ResourceConfig {
        cpu_shares: requests.cpu().milli_value(),
        cpu_quota: limits.cpu().milli_value(),
        memory: limits.memory().value(),
    }
}

pub fn burstable_policy(requests: &ResourceList, limits: &ResourceList) -> ResourceConfig {
    ResourceConfig {
        cpu_shares: requests.cpu().milli_value(),
        cpu_quota: limits.cpu().milli_value(),
        memory: limits.memory().value(),
    }
}

pub fn best_effort_policy(_requests: &ResourceList, _limits: &ResourceList) -> ResourceConfig {
    ResourceConfig {
        cpu_shares: MIN_SHARES,
        ..ResourceConfig::default()
    }
}
