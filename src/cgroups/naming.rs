//! Cgroup path naming
//!
//! Pods live one level below their QoS parent:
//!
//! ```text
//! {root}/                         ← Guaranteed pods
//! ├── pod-{uid}/
//! ├── Burstable/
//! │   └── pod-{uid}/
//! └── BestEffort/
//!     └── pod-{uid}/
//! ```

use super::types::{QosClass, QosContainersInfo};

/// Prefix of every per-pod cgroup name
pub const POD_CGROUP_NAME_PREFIX: &str = "pod-";

/// Checks that `uid` stays a single path component once prefixed, so the
/// pod cgroup sits directly under its QoS parent.
pub fn validate_pod_uid(uid: &str) -> Result<(), &'static str> {
    if uid.is_empty() {
        return Err("uid is empty");
    }
    if uid == "." || uid == ".." {
        return Err("uid is a relative path component");
    }
    if uid.contains('/') {
        return Err("uid contains '/'");
    }
    if uid.contains('\0') {
        return Err("uid contains a NUL byte");
    }
    Ok(())
}

/// Absolute cgroup name for a pod of the given class and UID.
///
/// Distinct UIDs that pass `validate_pod_uid` map to distinct names within
/// a class.
pub fn pod_container_name(info: &QosContainersInfo, qos: QosClass, uid: &str) -> String {
    let pod_container = format!("{}{}", POD_CGROUP_NAME_PREFIX, uid);
    join(info.parent_for(qos), &pod_container)
}

/// Joins two slash-separated path elements and cleans the result.
/// Empty elements are ignored.
pub fn join(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(child),
        (false, true) => clean(parent),
        (false, false) => clean(&format!("{}/{}", parent, child)),
    }
}

/// Lexical path cleanup: collapses repeated slashes, drops `.` and resolves
/// `..` without touching the filesystem. `..` never climbs above `/`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().map_or(false, |last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_info() -> QosContainersInfo {
        QosContainersInfo {
            guaranteed: "/".to_string(),
            burstable: "/Burstable".to_string(),
            best_effort: "/BestEffort".to_string(),
        }
    }

    #[test]
    fn test_pod_names_per_class() {
        let info = default_info();
        assert_eq!(pod_container_name(&info, QosClass::Guaranteed, "g1"), "/pod-g1");
        assert_eq!(pod_container_name(&info, QosClass::Burstable, "b1"), "/Burstable/pod-b1");
        assert_eq!(pod_container_name(&info, QosClass::BestEffort, "e1"), "/BestEffort/pod-e1");
    }

    #[test]
    fn test_validate_pod_uid() {
        assert!(validate_pod_uid("6c1f3a4e-9b2d-4c1a-8f00-1a2b3c4d5e6f").is_ok());
        assert!(validate_pod_uid("b1").is_ok());
        assert!(validate_pod_uid("").is_err());
        assert!(validate_pod_uid(".").is_err());
        assert!(validate_pod_uid("..").is_err());
        assert!(validate_pod_uid("x/..").is_err());
        assert!(validate_pod_uid("y/../pod-z").is_err());
    }

    #[test]
    fn test_unchecked_uid_can_escape() {
        // Why callers validate first
        let info = default_info();
        assert_eq!(pod_container_name(&info, QosClass::BestEffort, "x/.."), "/BestEffort");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "Burstable"), "/Burstable");
        assert_eq!(join("/root-container/", "Burstable"), "/root-container/Burstable");
        assert_eq!(join("", "/pod-a"), "/pod-a");
        assert_eq!(join("/kubepods", ""), "/kubepods");
        assert_eq!(join("", ""), "");
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("//a//b/./c/"), "/a/b/c");
        assert_eq!(clean("/a/../../b"), "/b");
        assert_eq!(clean("a/../.."), "..");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean("./"), ".");
    }
}
