//! Pod level resource totals
//!
//! Per-container requests and limits are summed into the single
//! `ResourceList` that the pod cgroup is sized from.

use super::quantity::Quantity;
use super::types::{Node, Pod, ResourceList, ResourceName};

/// Sum of every container's non-zero requests.
///
/// A zero or absent request contributes nothing, so a resource no
/// container asks for is absent from the result.
pub fn pod_requests(pod: &Pod) -> ResourceList {
    let mut requests = ResourceList::new();
    for container in &pod.containers {
        for (&name, &quantity) in container.requests.iter() {
            if !quantity.is_zero() {
                requests.add(name, quantity);
            }
        }
    }
    requests
}

/// Sum of container limits, falling back to node capacity.
///
/// If any container leaves a resource unlimited (absent or zero) the pod is
/// unlimited for that resource too, so the node's capacity replaces the
/// partial sum and the remaining containers are not looked at.
pub fn pod_limits(pod: &Pod, node: &Node) -> ResourceList {
    let mut limits = ResourceList::new();
    for name in ResourceName::ALL {
        let mut total = Quantity::ZERO;
        let mut unbounded = false;

        for container in &pod.containers {
            match container.limits.get(name).filter(|q| !q.is_zero()) {
                Some(limit) => total = total + limit,
                None => {
                    unbounded = true;
                    break;
                }
            }
        }

        if unbounded {
            if let Some(capacity) = node.capacity.get(name) {
                limits.insert(name, capacity);
            }
        } else if !pod.containers.is_empty() {
            limits.insert(name, total);
        }
    }
    limits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroups::types::Container;

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

    fn container(requests: ResourceList, limits: ResourceList) -> Container {
        Container::new("c", requests, limits)
    }

    fn assert_same(actual: &ResourceList, expected: &ResourceList, idx: usize) {
        assert_eq!(
            actual.cpu().milli_value(),
            expected.cpu().milli_value(),
            "case {} cpu",
            idx
        );
        assert_eq!(
            actual.memory().value(),
            expected.memory().value(),
            "case {} memory",
            idx
        );
    }

    #[test]
    fn test_pod_requests() {
        let cases = vec![
            (vec![container(list("", ""), list("", ""))], list("", "")),
            (vec![container(list("100m", ""), list("", ""))], list("100m", "")),
            (
                vec![container(list("100m", "100Mi"), list("", ""))],
                list("100m", "100Mi"),
            ),
            (
                vec![
                    container(list("100m", "100Mi"), list("", "")),
                    container(list("200m", "100Mi"), list("", "")),
                    container(list("50m", "100Mi"), list("", "")),
                ],
                list("350m", "300Mi"),
            ),
            (
                vec![
                    container(list("", ""), list("", "")),
                    container(list("", "100Mi"), list("", "")),
                    container(list("50m", "100Mi"), list("", "")),
                ],
                list("50m", "200Mi"),
            ),
        ];

        for (idx, (containers, expected)) in cases.into_iter().enumerate() {
            let actual = pod_requests(&Pod::new("foo", containers));
            assert_same(&actual, &expected, idx);
        }
    }

    #[test]
    fn test_pod_requests_skips_zero() {
        let pod = Pod::new(
            "zero",
            vec![
                container(list("0", "0"), list("", "")),
                container(list("10m", ""), list("", "")),
            ],
        );
        let requests = pod_requests(&pod);
        assert_eq!(requests.cpu().milli_value(), 10);
        assert_eq!(requests.get(ResourceName::Memory), None);
    }

    #[test]
    fn test_pod_limits() {
        let node_info = node("10", "10Gi");
        let cases = vec![
            (vec![container(list("", ""), list("", ""))], list("10", "10Gi")),
            (vec![container(list("", ""), list("100m", ""))], list("100m", "10Gi")),
            (vec![container(list("", ""), list("", "2Gi"))], list("10", "2Gi")),
            (
                vec![container(list("", ""), list("100m", "100Mi"))],
                list("100m", "100Mi"),
            ),
            (
                vec![
                    container(list("", ""), list("100m", "100Mi")),
                    container(list("", ""), list("200m", "100Mi")),
                    container(list("", ""), list("50m", "100Mi")),
                ],
                list("350m", "300Mi"),
            ),
            (
                vec![
                    container(list("", ""), list("", "100Mi")),
                    container(list("", ""), list("", "100Mi")),
                    container(list("", ""), list("50m", "100Mi")),
                ],
                list("10", "300Mi"),
            ),
            (
                vec![
                    container(list("", ""), list("100m", "")),
                    container(list("", ""), list("200m", "100Mi")),
                    container(list("", ""), list("50m", "100Mi")),
                ],
                list("350m", "10Gi"),
            ),
            (
                vec![
                    container(list("", ""), list("", "100Mi")),
                    container(list("", ""), list("200m", "100Mi")),
                    container(list("", ""), list("50m", "")),
                ],
                list("10", "10Gi"),
            ),
        ];

        for (idx, (containers, expected)) in cases.into_iter().enumerate() {
            let actual = pod_limits(&Pod::new("bar", containers), &node_info);
            assert_same(&actual, &expected, idx);
        }
    }

    #[test]
    fn test_missing_limit_wins_over_partial_sum() {
        // The unlimited container comes last, after a partial sum exists
        let pod = Pod::new(
            "late",
            vec![
                container(list("", ""), list("1", "1Gi")),
                container(list("", ""), list("1", "")),
            ],
        );
        let limits = pod_limits(&pod, &node("10", "10Gi"));
        assert_eq!(limits.memory().value(), 10 * 1024 * 1024 * 1024);
        assert_eq!(limits.cpu().milli_value(), 2000);
    }

    #[test]
    fn test_pod_limits_is_deterministic() {
        let pod = Pod::new(
            "same",
            vec![
                container(list("100m", ""), list("200m", "")),
                container(list("", "1Gi"), list("", "2Gi")),
            ],
        );
        let node_info = node("4", "8Gi");
        assert_eq!(pod_limits(&pod, &node_info), pod_limits(&pod, &node_info));
        assert_eq!(pod_requests(&pod), pod_requests(&pod));
    }
}
