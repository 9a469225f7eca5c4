//! Prometheus metrics for cgroup management
//!
//! Counters are registered in the default registry on first use and
//! rendered with `encode_metrics()`.

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Cgroup node operations, by operation and outcome.
    ///
    /// Labels:
    /// - operation: "create", "update", "destroy"
    /// - result: "success" or "error"
    pub static ref CGROUP_OPERATIONS: IntCounterVec = register_int_counter_vec!(
        "pod_cgroups_operations_total",
        "Cgroup node operations by operation and result",
        &["operation", "result"]
    ).expect("failed to register CGROUP_OPERATIONS metric");

    /// Top level QoS cgroup bootstraps, by outcome.
    pub static ref QOS_INIT: IntCounterVec = register_int_counter_vec!(
        "pod_cgroups_qos_init_total",
        "Top level QoS cgroup initializations by result",
        &["result"]
    ).expect("failed to register QOS_INIT metric");
}

fn result_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

/// Count one cgroup operation.
pub fn record_operation<T, E>(operation: &str, result: &Result<T, E>) {
    CGROUP_OPERATIONS
        .with_label_values(&[operation, result_label(result)])
        .inc();
}

/// Count one QoS bootstrap.
pub fn record_qos_init<T, E>(result: &Result<T, E>) {
    QOS_INIT.with_label_values(&[result_label(result)]).inc();
}

/// Render every registered metric in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
