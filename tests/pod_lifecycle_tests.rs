//! Integration tests for the pod cgroup lifecycle
//!
//! These drive the public API end to end, against the recording mock and
//! against a cgroup v2 layout faked inside a temporary directory.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use pod_cgroups::cgroups::testing::MockCgroupManager;
use pod_cgroups::cgroups::{
    pod_limits, pod_requests, resource_config, CgroupDriver, Container, Node, PodCgroupManager,
    QosConfig, QosContainerManager, ResourceName, MIN_SHARES,
};
use pod_cgroups::{bootstrap, NodeConfig, Pod, PodContainerManager, QosClass, ResourceList};
use tempfile::TempDir;
use uuid::Uuid;

fn list(cpu: &str, memory: &str) -> ResourceList {
    let mut res = ResourceList::new();
    if !cpu.is_empty() {
        res.insert(ResourceName::Cpu, cpu.parse().unwrap());
    }
    if !memory.is_empty() {
        res.insert(ResourceName::Memory, memory.parse().unwrap());
    }
    res
}

fn node(cpu: &str, memory: &str) -> Node {
    Node {
        capacity: list(cpu, memory),
    }
}

fn guaranteed_pod(uid: &str) -> Pod {
    Pod::new(
        uid,
        vec![Container::new("app", list("500m", "256Mi"), list("500m", "256Mi"))],
    )
}

fn burstable_pod(uid: &str) -> Pod {
    Pod::new(uid, vec![Container::new("app", list("250m", "64Mi"), list("", ""))])
}

fn best_effort_pod(uid: &str) -> Pod {
    Pod::new(uid, vec![Container::new("app", list("", ""), list("", ""))])
}

fn temp_config(tmp: &TempDir) -> NodeConfig {
    NodeConfig {
        cgroup_mount: tmp.path().to_path_buf(),
        capacity: list("10", "10Gi"),
        ..NodeConfig::default()
    }
}

/// Three containers, no limits, on a (10, 10Gi) node
#[test]
fn test_aggregation_example() {
    let pod = Pod::new(
        "agg",
        vec![
            Container::new("a", list("100m", "100Mi"), list("", "")),
            Container::new("b", list("200m", "100Mi"), list("", "")),
            Container::new("c", list("50m", "100Mi"), list("", "")),
        ],
    );
    let node = node("10", "10Gi");

    let requests = pod_requests(&pod);
    let limits = pod_limits(&pod, &node);

    assert_eq!(requests.cpu().milli_value(), 350);
    assert_eq!(requests.memory().value(), 300 * 1024 * 1024);
    assert_eq!(limits.cpu().milli_value(), 10_000);
    assert_eq!(limits.memory().value(), 10 * 1024 * 1024 * 1024);
}

#[test]
fn test_best_effort_resolution() {
    let pod = best_effort_pod("e1");
    let config = resource_config(
        QosClass::BestEffort,
        &pod_requests(&pod),
        &pod_limits(&pod, &node("10", "10Gi")),
    );
    assert_eq!(config.memory, 0);
    assert_eq!(config.cpu_quota, 0);
    assert_eq!(config.cpu_shares, MIN_SHARES);
}

#[test]
fn test_default_root_paths() {
    let qos = QosContainerManager::new(QosConfig::default(), MockCgroupManager::new());
    let pods = PodCgroupManager::new(node("10", "10Gi"), qos.containers_info(), MockCgroupManager::new());

    assert_eq!(pods.pod_container_name(&guaranteed_pod("g1")), "/pod-g1");
    assert_eq!(pods.pod_container_name(&burstable_pod("b1")), "/Burstable/pod-b1");
    assert_eq!(pods.pod_container_name(&best_effort_pod("e1")), "/BestEffort/pod-e1");
}

#[test]
fn test_pod_names_are_injective() {
    let qos = QosContainerManager::new(QosConfig::new("/kubepods"), MockCgroupManager::new());
    let pods = PodCgroupManager::new(node("10", "10Gi"), qos.containers_info(), MockCgroupManager::new());

    let uids: Vec<String> = (0..64).map(|_| Uuid::now_v7().to_string()).collect();
    for make in [guaranteed_pod, burstable_pod, best_effort_pod] {
        let names: HashSet<String> = uids.iter().map(|uid| pods.pod_container_name(&make(uid))).collect();
        assert_eq!(names.len(), uids.len());

        let again: HashSet<String> = uids.iter().map(|uid| pods.pod_container_name(&make(uid))).collect();
        assert_eq!(names, again);
    }
}

#[test]
fn test_bootstrap_then_pods_with_mock() {
    let mock = Arc::new(MockCgroupManager::new());
    let mut qos = QosContainerManager::new(QosConfig::default(), Arc::clone(&mock));
    qos.init(&QosConfig::default()).unwrap();

    let pods = PodCgroupManager::new(node("4", "8Gi"), qos.containers_info(), Arc::clone(&mock));
    let pod = burstable_pod("b1");

    pods.ensure_exists(&pod).unwrap();
    pods.ensure_exists(&pod).unwrap();

    let pod_creates = mock
        .creates()
        .into_iter()
        .filter(|c| c.path() == "/Burstable/pod-b1")
        .count();
    assert_eq!(pod_creates, 1);
    assert!(mock.updates().len() <= 2);

    pods.destroy(&pod).unwrap();
    assert!(!pods.exists(&pod));
    assert!(mock.existing().contains("/Burstable"));
}

#[test]
fn test_filesystem_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let config = temp_config(&tmp);

    let (qos, pods) = bootstrap(&config).unwrap();
    assert_eq!(qos.burstable, "/Burstable");
    assert!(tmp.path().join("Burstable").is_dir());
    assert!(tmp.path().join("BestEffort").is_dir());

    let pod = guaranteed_pod("g1");
    assert!(!pods.exists(&pod));
    pods.ensure_exists(&pod).unwrap();
    assert!(pods.exists(&pod));

    let dir = tmp.path().join("pod-g1");
    assert_eq!(fs::read_to_string(dir.join("memory.max")).unwrap(), (256 * 1024 * 1024).to_string());
    assert_eq!(fs::read_to_string(dir.join("cpu.max")).unwrap(), "50000 100000");

    // Limits are refreshed on every call
    let resized = Pod::new(
        "g1",
        vec![Container::new("app", list("1", "512Mi"), list("1", "512Mi"))],
    );
    pods.ensure_exists(&resized).unwrap();
    assert_eq!(fs::read_to_string(dir.join("memory.max")).unwrap(), (512 * 1024 * 1024).to_string());

    pods.destroy(&pod).unwrap();
    assert!(!dir.exists());
    pods.destroy(&pod).unwrap();
}

#[test]
fn test_filesystem_best_effort_weight() {
    let tmp = TempDir::new().unwrap();
    let (_, pods) = bootstrap(&temp_config(&tmp)).unwrap();

    pods.ensure_exists(&best_effort_pod("e1")).unwrap();

    let dir = tmp.path().join("BestEffort/pod-e1");
    assert_eq!(fs::read_to_string(dir.join("cpu.weight")).unwrap(), "1");
    assert_eq!(fs::read_to_string(dir.join("memory.max")).unwrap(), "max");
    assert_eq!(fs::read_to_string(dir.join("cpu.max")).unwrap(), "max 100000");
}

/// No node capacity configured, so a pod without limits has nothing to
/// fall back to and runs unlimited
#[test]
fn test_filesystem_dropped_limit_is_lifted() {
    let tmp = TempDir::new().unwrap();
    let config = NodeConfig {
        cgroup_mount: tmp.path().to_path_buf(),
        ..NodeConfig::default()
    };
    let (_, pods) = bootstrap(&config).unwrap();

    let limited = Pod::new(
        "b1",
        vec![Container::new("app", list("250m", "64Mi"), list("", "128Mi"))],
    );
    pods.ensure_exists(&limited).unwrap();
    let memory_max = tmp.path().join("Burstable/pod-b1/memory.max");
    assert_eq!(fs::read_to_string(&memory_max).unwrap(), (128 * 1024 * 1024).to_string());

    pods.ensure_exists(&burstable_pod("b1")).unwrap();
    assert_eq!(fs::read_to_string(&memory_max).unwrap(), "max");
}

#[test]
fn test_filesystem_uid_cannot_reach_qos_parent() {
    let tmp = TempDir::new().unwrap();
    let (_, pods) = bootstrap(&temp_config(&tmp)).unwrap();

    for uid in ["x/..", "..", "y/../pod-z"] {
        let pod = best_effort_pod(uid);
        assert!(!pods.exists(&pod), "uid {:?}", uid);
        assert!(pods.ensure_exists(&pod).is_err(), "uid {:?}", uid);
        assert!(pods.destroy(&pod).is_err(), "uid {:?}", uid);
    }

    assert!(tmp.path().join("BestEffort").is_dir());
    assert!(!tmp.path().join("BestEffort/pod-z").exists());
    assert!(!tmp.path().join("BestEffort/cpu.weight").exists());
}

#[test]
fn test_filesystem_systemd_driver() {
    let tmp = TempDir::new().unwrap();
    let config = NodeConfig {
        cgroup_driver: CgroupDriver::Systemd,
        cgroup_root: "/kubepods".to_string(),
        ..temp_config(&tmp)
    };

    let (qos, pods) = bootstrap(&config).unwrap();
    assert_eq!(qos.burstable, "/kubepods/Burstable");
    assert!(tmp.path().join("kubepods.slice/kubepods-Burstable.slice").is_dir());

    let pod = burstable_pod("b-1");
    pods.ensure_exists(&pod).unwrap();
    assert_eq!(pods.pod_container_name(&pod), "/kubepods/Burstable/pod-b-1");
    assert!(tmp
        .path()
        .join("kubepods.slice/kubepods-Burstable.slice/kubepods-Burstable-pod_b_1.slice")
        .is_dir());
}

#[test]
fn test_disabled_cgroups_per_qos_is_noop() {
    let tmp = TempDir::new().unwrap();
    let config = NodeConfig {
        cgroups_per_qos: false,
        cgroup_root: "/kubepods".to_string(),
        ..temp_config(&tmp)
    };

    let (_, pods) = bootstrap(&config).unwrap();
    let pod = burstable_pod("b1");

    assert!(pods.exists(&pod));
    pods.ensure_exists(&pod).unwrap();
    pods.destroy(&pod).unwrap();
    assert_eq!(pods.pod_container_name(&pod), "/kubepods");
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_failure_is_scoped_to_one_pod() {
    let tmp = TempDir::new().unwrap();
    let (_, pods) = bootstrap(&temp_config(&tmp)).unwrap();

    // A regular file where the pod directory should go makes create fail
    fs::write(tmp.path().join("Burstable/pod-bad"), "").unwrap();

    let err = pods.ensure_exists(&burstable_pod("bad")).unwrap_err();
    assert_eq!(err.uid(), "bad");

    pods.ensure_exists(&burstable_pod("good")).unwrap();
    assert!(tmp.path().join("Burstable/pod-good").is_dir());
}
