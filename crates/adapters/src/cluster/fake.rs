// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake cluster client for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ClusterClient, ClusterError, LabelMap, Object, ObjectKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Recorded cluster call
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterCall {
    Create {
        kind: ObjectKind,
        namespace: Option<String>,
        name: String,
    },
    GetSecret {
        namespace: String,
        name: String,
    },
    PatchSecret {
        namespace: String,
        name: String,
        set: Vec<String>,
        unset: Vec<String>,
    },
    DeleteNamespace {
        name: String,
    },
    DeleteCollection {
        kind: ObjectKind,
        namespace: String,
        selector: LabelMap,
    },
}

type ObjectKey = (ObjectKind, Option<String>, String);

#[derive(Default)]
struct FakeClusterState {
    objects: BTreeMap<ObjectKey, Object>,
    calls: Vec<ClusterCall>,
    failures: u32,
}

impl FakeClusterState {
    fn take_failure(&mut self) -> Result<(), ClusterError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(ClusterError::CommandFailed("injected failure".to_string()));
        }
        Ok(())
    }
}

/// In-memory cluster that stores created objects
#[derive(Clone, Default)]
pub struct FakeCluster {
    inner: Arc<Mutex<FakeClusterState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ClusterCall> {
        self.inner.lock().calls.clone()
    }

    /// Fail the next `n` calls with `CommandFailed`.
    pub fn fail_next(&self, n: u32) {
        self.inner.lock().failures = n;
    }

    /// Look up a stored object.
    pub fn get(&self, kind: ObjectKind, namespace: Option<&str>, name: &str) -> Option<Object> {
        let key = (kind, namespace.map(str::to_string), name.to_string());
        self.inner.lock().objects.get(&key).cloned()
    }

    /// Every stored object of `kind`, in key order.
    pub fn objects_of(&self, kind: ObjectKind) -> Vec<Object> {
        self.inner
            .lock()
            .objects
            .iter()
            .filter(|((k, _, _), _)| *k == kind)
            .map(|(_, object)| object.clone())
            .collect()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store an object directly, bypassing call recording.
    pub fn seed(&self, object: Object) {
        let meta = object.meta();
        let key = (object.kind(), meta.namespace.clone(), meta.name.clone());
        self.inner.lock().objects.insert(key, object);
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn create(&self, object: &Object) -> Result<(), ClusterError> {
        let meta = object.meta();
        let mut inner = self.inner.lock();
        inner.calls.push(ClusterCall::Create {
            kind: object.kind(),
            namespace: meta.namespace.clone(),
            name: meta.name.clone(),
        });
        inner.take_failure()?;

        let key = (object.kind(), meta.namespace.clone(), meta.name.clone());
        if inner.objects.contains_key(&key) {
            return Err(ClusterError::AlreadyExists(object.describe()));
        }
        if let Some(ref ns) = meta.namespace {
            let ns_key = (ObjectKind::Namespace, None, ns.clone());
            if !inner.objects.contains_key(&ns_key) {
                return Err(ClusterError::NotFound(format!("namespace {}", ns)));
            }
        }
        inner.objects.insert(key, object.clone());
        Ok(())
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClusterCall::GetSecret {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        inner.take_failure()?;

        let key = (
            ObjectKind::Secret,
            Some(namespace.to_string()),
            name.to_string(),
        );
        match inner.objects.get(&key) {
            Some(Object::Secret(secret)) => Ok(secret.string_data.clone()),
            _ => Err(ClusterError::NotFound(format!(
                "secret {}/{}",
                namespace, name
            ))),
        }
    }

    async fn patch_secret(
        &self,
        namespace: &str,
        name: &str,
        set: &BTreeMap<String, String>,
        unset: &[String],
    ) -> Result<(), ClusterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClusterCall::PatchSecret {
            namespace: namespace.to_string(),
            name: name.to_string(),
            set: set.keys().cloned().collect(),
            unset: unset.to_vec(),
        });
        inner.take_failure()?;

        let key = (
            ObjectKind::Secret,
            Some(namespace.to_string()),
            name.to_string(),
        );
        match inner.objects.get_mut(&key) {
            Some(Object::Secret(secret)) => {
                for key in unset {
                    secret.string_data.remove(key);
                }
                secret
                    .string_data
                    .extend(set.iter().map(|(k, v)| (k.clone(), v.clone())));
                Ok(())
            }
            _ => Err(ClusterError::NotFound(format!(
                "secret {}/{}",
                namespace, name
            ))),
        }
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClusterCall::DeleteNamespace {
            name: name.to_string(),
        });
        inner.take_failure()?;

        inner.objects.retain(|(kind, ns, obj_name), _| {
            let is_namespace = *kind == ObjectKind::Namespace && obj_name == name;
            let in_namespace = ns.as_deref() == Some(name);
            !is_namespace && !in_namespace
        });
        Ok(())
    }

    async fn delete_collection(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelMap,
    ) -> Result<(), ClusterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ClusterCall::DeleteCollection {
            kind,
            namespace: namespace.to_string(),
            selector: selector.clone(),
        });
        inner.take_failure()?;

        inner.objects.retain(|(k, ns, _), object| {
            let matches = *k == kind
                && ns.as_deref() == Some(namespace)
                && selector
                    .iter()
                    .all(|(key, value)| object.meta().labels.get(key) == Some(value));
            !matches
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
