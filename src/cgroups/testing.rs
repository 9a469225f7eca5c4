//! Recording test doubles for the cgroup layers
//!
//! `MockCgroupManager` stands in for a `CgroupManager` and `MockBackend`
//! for a raw `CgroupBackend`. Both keep an in-memory set of existing nodes
//! so idempotency can be observed, record every call for assertions, and
//! can be told to fail.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::backend::{Cgroup, CgroupBackend};
use super::error::CgroupError;
use super::manager::CgroupManager;
use super::types::CgroupConfig;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded `CgroupManager` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CgroupCall {
    Create(CgroupConfig),
    Update(CgroupConfig),
    Destroy(CgroupConfig),
    Lookup(String),
}

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Destroy,
    Lookup,
}

#[derive(Debug, Default)]
pub struct MockCgroupManager {
    calls: Mutex<Vec<CgroupCall>>,
    existing: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<Operation, io::ErrorKind>>,
}

impl MockCgroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as already present.
    pub fn with_existing(self, name: impl Into<String>) -> Self {
        lock(&self.existing).insert(name.into());
        self
    }

    /// Makes every later `operation` fail with `kind`.
    pub fn fail(&self, operation: Operation, kind: io::ErrorKind) {
        lock(&self.failures).insert(operation, kind);
    }

    pub fn clear_failure(&self, operation: Operation) {
        lock(&self.failures).remove(&operation);
    }

    pub fn calls(&self) -> Vec<CgroupCall> {
        lock(&self.calls).clone()
    }

    pub fn creates(&self) -> Vec<CgroupConfig> {
        self.filter(|c| match c {
            CgroupCall::Create(cfg) => Some(cfg.clone()),
            _ => None,
        })
    }

    pub fn updates(&self) -> Vec<CgroupConfig> {
        self.filter(|c| match c {
            CgroupCall::Update(cfg) => Some(cfg.clone()),
            _ => None,
        })
    }

    pub fn destroys(&self) -> Vec<CgroupConfig> {
        self.filter(|c| match c {
            CgroupCall::Destroy(cfg) => Some(cfg.clone()),
            _ => None,
        })
    }

    /// Names currently present
    pub fn existing(&self) -> HashSet<String> {
        lock(&self.existing).clone()
    }

    fn filter(&self, f: impl Fn(&CgroupCall) -> Option<CgroupConfig>) -> Vec<CgroupConfig> {
        lock(&self.calls).iter().filter_map(f).collect()
    }

    fn record(&self, call: CgroupCall) {
        lock(&self.calls).push(call);
    }

    fn injected(&self, operation: Operation) -> Option<io::Error> {
        lock(&self.failures).get(&operation).map(|&kind| io::Error::from(kind))
    }
}

impl CgroupManager for MockCgroupManager {
    fn create(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        self.record(CgroupCall::Create(config.clone()));
        if let Some(source) = self.injected(Operation::Create) {
            return Err(CgroupError::Create {
                name: config.path(),
                source,
            });
        }
        lock(&self.existing).insert(config.path());
        Ok(())
    }

    fn update(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        self.record(CgroupCall::Update(config.clone()));
        if let Some(source) = self.injected(Operation::Update) {
            return Err(CgroupError::Update {
                name: config.path(),
                source,
            });
        }
        if !lock(&self.existing).contains(&config.path()) {
            return Err(CgroupError::NotFound { name: config.path() });
        }
        Ok(())
    }

    fn destroy(&self, config: &CgroupConfig) -> Result<(), CgroupError> {
        self.record(CgroupCall::Destroy(config.clone()));
        if let Some(source) = self.injected(Operation::Destroy) {
            return Err(CgroupError::Destroy {
                name: config.path(),
                source,
            });
        }
        lock(&self.existing).remove(&config.path());
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<bool, CgroupError> {
        self.record(CgroupCall::Lookup(name.to_string()));
        if let Some(source) = self.injected(Operation::Lookup) {
            return Err(CgroupError::Lookup {
                name: name.to_string(),
                source,
            });
        }
        Ok(lock(&self.existing).contains(name))
    }
}

/// One recorded `CgroupBackend` primitive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Apply { path: String, pid: u32 },
    Set(Cgroup),
    Destroy(String),
}

#[derive(Debug, Default)]
pub struct MockBackend {
    calls: Mutex<Vec<BackendCall>>,
    existing: Mutex<HashSet<String>>,
    inaccessible: HashSet<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(self, path: impl Into<String>) -> Self {
        lock(&self.existing).insert(path.into());
        self
    }

    /// Lookups of `path` fail with `PermissionDenied`.
    pub fn with_inaccessible(mut self, path: impl Into<String>) -> Self {
        self.inaccessible.insert(path.into());
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }
}

impl CgroupBackend for MockBackend {
    fn apply(&self, cgroup: &Cgroup, pid: u32) -> io::Result<()> {
        lock(&self.calls).push(BackendCall::Apply {
            path: cgroup.path.clone(),
            pid,
        });
        lock(&self.existing).insert(cgroup.path.clone());
        Ok(())
    }

    fn set(&self, cgroup: &Cgroup) -> io::Result<()> {
        lock(&self.calls).push(BackendCall::Set(cgroup.clone()));
        if lock(&self.existing).contains(&cgroup.path) {
            Ok(())
        } else {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn destroy(&self, cgroup: &Cgroup) -> io::Result<()> {
        lock(&self.calls).push(BackendCall::Destroy(cgroup.path.clone()));
        lock(&self.existing).remove(&cgroup.path);
        Ok(())
    }

    fn paths(&self, cgroup: &Cgroup) -> HashMap<String, PathBuf> {
        let mut paths = HashMap::new();
        paths.insert("unified".to_string(), PathBuf::from(&cgroup.path));
        paths
    }

    fn pids(&self, _cgroup: &Cgroup) -> io::Result<Vec<u32>> {
        Ok(Vec::new())
    }

    fn exists(&self, path: &str) -> io::Result<bool> {
        if self.inaccessible.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(lock(&self.existing).contains(path))
    }
}
