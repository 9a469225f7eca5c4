//! Data model shared by the cgroup managers
//!
//! Pods and nodes are read-only descriptors handed in by the caller.
//! `CgroupConfig` values are built fresh for every operation.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::naming;
use super::quantity::Quantity;

/// Resources tracked at the pod cgroup level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceName {
    Cpu,
    Memory,
}

impl ResourceName {
    pub const ALL: [ResourceName; 2] = [ResourceName::Cpu, ResourceName::Memory];

    /// Looks up a tracked resource by its manifest key.
    pub fn from_key(key: &str) -> Option<ResourceName> {
        match key {
            "cpu" => Some(ResourceName::Cpu),
            "memory" => Some(ResourceName::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceName::Cpu => f.write_str("cpu"),
            ResourceName::Memory => f.write_str("memory"),
        }
    }
}

/// Resource name → quantity. Keys are unique; ordering carries no meaning.
///
/// Deserializing skips resources the cgroups do not enforce, such as
/// `ephemeral-storage` or extended resources, along with their values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResourceList(BTreeMap<ResourceName, Quantity>);

struct ResourceListVisitor;

impl<'de> Visitor<'de> for ResourceListVisitor {
    type Value = ResourceList;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of resource names to quantities")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ResourceList, A::Error> {
        let mut list = ResourceList::new();
        while let Some(key) = map.next_key::<String>()? {
            match ResourceName::from_key(&key) {
                Some(name) => list.insert(name, map.next_value()?),
                None => {
                    map.next_value::<de::IgnoredAny>()?;
                }
            }
        }
        Ok(list)
    }
}

impl<'de> Deserialize<'de> for ResourceList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ResourceListVisitor)
    }
}

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert`
    pub fn with(mut self, name: ResourceName, quantity: Quantity) -> Self {
        self.insert(name, quantity);
        self
    }

    pub fn insert(&mut self, name: ResourceName, quantity: Quantity) {
        self.0.insert(name, quantity);
    }

    pub fn get(&self, name: ResourceName) -> Option<Quantity> {
        self.0.get(&name).copied()
    }

    /// Adds `quantity` to whatever is already recorded for `name`.
    pub fn add(&mut self, name: ResourceName, quantity: Quantity) {
        let entry = self.0.entry(name).or_insert(Quantity::ZERO);
        *entry = entry.saturating_add(quantity);
    }

    /// CPU quantity, zero when absent
    pub fn cpu(&self) -> Quantity {
        self.get(ResourceName::Cpu).unwrap_or_default()
    }

    /// Memory quantity, zero when absent
    pub fn memory(&self) -> Quantity {
        self.get(ResourceName::Memory).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ResourceName, Quantity> {
        self.0.iter()
    }
}

impl FromIterator<(ResourceName, Quantity)> for ResourceList {
    fn from_iter<I: IntoIterator<Item = (ResourceName, Quantity)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resource parameters written to one cgroup node.
///
/// A zero field means "leave unconstrained"; backends skip it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Memory limit in bytes
    pub memory: i64,
    /// Relative CPU weight (milli-CPU of the aggregated requests)
    pub cpu_shares: i64,
    /// Hard CPU cap in milli-CPU
    pub cpu_quota: i64,
}

impl ResourceConfig {
    pub fn is_empty(&self) -> bool {
        *self == ResourceConfig::default()
    }
}

/// One cgroup node plus the resources to enforce on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgroupConfig {
    pub name: String,
    pub parent: String,
    pub resources: ResourceConfig,
}

impl CgroupConfig {
    /// Config for an absolute cgroup name with no resource constraints
    pub fn unconstrained(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Absolute path of the node: `parent` joined with `name`.
    pub fn path(&self) -> String {
        naming::join(&self.parent, &self.name)
    }
}

/// Pod quality-of-service class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QosClass {
    Guaranteed,
    Burstable,
    BestEffort,
}

impl QosClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            QosClass::Guaranteed => "Guaranteed",
            QosClass::Burstable => "Burstable",
            QosClass::BestEffort => "BestEffort",
        }
    }
}

impl fmt::Display for QosClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute names of the top level QoS cgroups
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QosContainersInfo {
    pub guaranteed: String,
    pub burstable: String,
    pub best_effort: String,
}

impl QosContainersInfo {
    /// Parent cgroup for pods of the given class
    pub fn parent_for(&self, qos: QosClass) -> &str {
        match qos {
            QosClass::Guaranteed => &self.guaranteed,
            QosClass::Burstable => &self.burstable,
            QosClass::BestEffort => &self.best_effort,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Container {
    pub name: String,
    pub requests: ResourceList,
    pub limits: ResourceList,
}

impl Container {
    pub fn new(name: impl Into<String>, requests: ResourceList, limits: ResourceList) -> Self {
        Self {
            name: name.into(),
            requests,
            limits,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub uid: String,
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Pod {
    pub fn new(uid: impl Into<String>, containers: Vec<Container>) -> Self {
        Self {
            uid: uid.into(),
            containers,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub capacity: ResourceList,
}
