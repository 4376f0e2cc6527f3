// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container-cluster access

mod kubectl;
pub mod object;

pub use kubectl::KubectlClient;
pub use object::{LabelMap, Object, ObjectKind, ObjectMeta};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ClusterCall, FakeCluster};

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from cluster operations
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// Cluster objects are not API resources; callers only ever see an internal error.
impl From<ClusterError> for convoy_core::Error {
    fn from(err: ClusterError) -> Self {
        convoy_core::Error::internal(err.to_string())
    }
}

/// Adapter for creating and deleting objects in a container cluster
#[async_trait]
pub trait ClusterClient: Clone + Send + Sync + 'static {
    /// Create an object. Fails with `AlreadyExists` if one with the same
    /// kind, namespace, and name is present.
    async fn create(&self, object: &Object) -> Result<(), ClusterError>;

    /// Decoded `data` of a secret.
    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError>;

    /// Write `set` into a secret's `data` and drop the `unset` keys, in one
    /// patch. Unsetting an absent key succeeds; an absent secret is
    /// `NotFound`.
    async fn patch_secret(
        &self,
        namespace: &str,
        name: &str,
        set: &BTreeMap<String, String>,
        unset: &[String],
    ) -> Result<(), ClusterError>;

    /// Delete a namespace and, by cascade, everything in it. Deleting an
    /// absent namespace succeeds.
    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError>;

    /// Delete every object of `kind` in `namespace` carrying all of
    /// `selector`'s labels. Matching nothing succeeds.
    async fn delete_collection(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelMap,
    ) -> Result<(), ClusterError>;
}
