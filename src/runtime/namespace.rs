//! Namespaces
//!
//! A [`Namespace`] is a shared handle: clones alias the same bindings, and
//! executions mutate it in place. The per-namespace execution lock is what
//! [`NamespacePolicy::Serialize`] holds for the length of a run.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};

use super::value::Value;

/// How concurrent executions against one namespace are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamespacePolicy {
    /// One execution at a time per namespace
    #[default]
    Serialize,
    /// No ordering; single reads and writes stay atomic but
    /// read-modify-write sequences may lose updates
    AllowRace,
}

#[derive(Debug)]
struct Inner {
    bindings: RwLock<IndexMap<String, Value>>,
    exec_lock: Mutex<()>,
    policy: NamespacePolicy,
}

/// Shared identifier → value mapping
#[derive(Debug, Clone)]
pub struct Namespace {
    inner: Arc<Inner>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Self {
        Self::with_policy(NamespacePolicy::default())
    }

    pub fn with_policy(policy: NamespacePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                bindings: RwLock::new(IndexMap::new()),
                exec_lock: Mutex::new(()),
                policy,
            }),
        }
    }

    pub fn policy(&self) -> NamespacePolicy {
        self.inner.policy
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.inner.bindings.read().get(name).cloned()
    }

    pub fn set(
        &self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.inner.bindings.write().insert(name.into(), value);
    }

    pub fn remove(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.inner.bindings.write().shift_remove(name)
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.inner.bindings.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binding names in definition order
    pub fn names(&self) -> Vec<String> {
        self.inner.bindings.read().keys().cloned().collect()
    }

    /// True when both handles refer to the same bindings
    pub fn ptr_eq(
        &self,
        other: &Namespace,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Acquire the execution lock when the policy asks for one
    pub fn execution_guard(&self) -> Option<MutexGuard<'_, ()>> {
        match self.inner.policy {
            NamespacePolicy::Serialize => Some(self.inner.exec_lock.lock()),
            NamespacePolicy::AllowRace => None,
        }
    }
}
