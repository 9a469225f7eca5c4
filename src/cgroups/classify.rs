//! Default QoS classifier
//!
//! The pod managers take the classifier as a plain function so callers can
//! plug in their own. This is the standard rule set:
//!
//! - BestEffort: no container sets a non-zero request or limit
//! - Guaranteed: every container limits both CPU and memory, and every
//!   request it sets equals the limit (a missing request counts as equal)
//! - Burstable: everything else

use super::types::{Container, Pod, QosClass, ResourceName};

/// Signature of an injected pod classifier
pub type QosClassifier = fn(&Pod) -> QosClass;

/// Classifies a pod by the requests and limits of its containers.
pub fn pod_qos_class(pod: &Pod) -> QosClass {
    let best_effort = pod.containers.iter().all(|c| {
        c.requests.iter().all(|(_, q)| q.is_zero()) && c.limits.iter().all(|(_, q)| q.is_zero())
    });
    if best_effort {
        return QosClass::BestEffort;
    }

    if !pod.containers.is_empty() && pod.containers.iter().all(is_guaranteed) {
        QosClass::Guaranteed
    } else {
        QosClass::Burstable
    }
}

fn is_guaranteed(container: &Container) -> bool {
    ResourceName::ALL.iter().all(|&name| {
        match container.limits.get(name).filter(|q| !q.is_zero()) {
            Some(limit) => container
                .requests
                .get(name)
                .filter(|q| !q.is_zero())
                .map_or(true, |request| request == limit),
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroups::quantity::Quantity;
    use crate::cgroups::types::ResourceList;

    fn list(cpu: &str, memory: &str) -> ResourceList {
        let mut res = ResourceList::new();
        if !cpu.is_empty() {
            res.insert(ResourceName::Cpu, cpu.parse::<Quantity>().unwrap());
        }
        if !memory.is_empty() {
            res.insert(ResourceName::Memory, memory.parse::<Quantity>().unwrap());
        }
        res
    }

    fn pod(containers: &[(&str, &str, &str, &str)]) -> Pod {
        Pod::new(
            "uid",
            containers
                .iter()
                .map(|(rc, rm, lc, lm)| Container::new("c", list(rc, rm), list(lc, lm)))
                .collect(),
        )
    }

    #[test]
    fn test_best_effort() {
        assert_eq!(pod_qos_class(&pod(&[("", "", "", "")])), QosClass::BestEffort);
        assert_eq!(pod_qos_class(&Pod::new("empty", vec![])), QosClass::BestEffort);
    }

    #[test]
    fn test_guaranteed() {
        let p = pod(&[
            ("100m", "100Mi", "100m", "100Mi"),
            ("", "", "50m", "10Mi"),
        ]);
        assert_eq!(pod_qos_class(&p), QosClass::Guaranteed);
    }

    #[test]
    fn test_burstable() {
        assert_eq!(
            pod_qos_class(&pod(&[("100m", "100Mi", "200m", "100Mi")])),
            QosClass::Burstable
        );
        assert_eq!(pod_qos_class(&pod(&[("100m", "", "", "")])), QosClass::Burstable);
        assert_eq!(
            pod_qos_class(&pod(&[("100m", "100Mi", "100m", "100Mi"), ("", "", "", "")])),
            QosClass::Burstable
        );
    }
}
