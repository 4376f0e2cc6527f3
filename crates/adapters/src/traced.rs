// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::cluster::{ClusterClient, ClusterError, LabelMap, Object, ObjectKind};
use crate::queue::{QueueError, QueueWriter, QueueWriterFactory};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::Instrument;

/// Wrapper that adds tracing to any ClusterClient
#[derive(Clone)]
pub struct TracedCluster<C> {
    inner: C,
}

impl<C> TracedCluster<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ClusterClient> ClusterClient for TracedCluster<C> {
    async fn create(&self, object: &Object) -> Result<(), ClusterError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.create(object).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "created"),
                Err(ClusterError::AlreadyExists(_)) => {
                    tracing::debug!(elapsed_ms, "already exists")
                }
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create failed"),
            }
            result
        }
        .instrument(tracing::info_span!("cluster.create", object = %object.describe()))
        .await
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError> {
        let result = self.inner.get_secret(namespace, name).await;
        tracing::info_span!("cluster.get_secret", namespace, name).in_scope(|| match &result {
            Ok(data) => tracing::debug!(keys = data.len(), "read"),
            Err(e) => tracing::error!(error = %e, "read failed"),
        });
        result
    }

    async fn patch_secret(
        &self,
        namespace: &str,
        name: &str,
        set: &BTreeMap<String, String>,
        unset: &[String],
    ) -> Result<(), ClusterError> {
        let result = self.inner.patch_secret(namespace, name, set, unset).await;
        let keys: Vec<&String> = set.keys().collect();
        tracing::info_span!("cluster.patch_secret", namespace, name, ?keys, ?unset).in_scope(
            || match &result {
                Ok(()) => tracing::info!("patched"),
                Err(e) => tracing::error!(error = %e, "patch failed"),
            },
        );
        result
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.delete_namespace(name).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "deleted"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "delete failed"),
            }
            result
        }
        .instrument(tracing::info_span!("cluster.delete_namespace", name))
        .await
    }

    async fn delete_collection(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelMap,
    ) -> Result<(), ClusterError> {
        let result = self.inner.delete_collection(kind, namespace, selector).await;
        tracing::info_span!("cluster.delete_collection", %kind, namespace, ?selector)
            .in_scope(|| match &result {
                Ok(()) => tracing::info!("deleted"),
                Err(e) => tracing::error!(error = %e, "delete failed"),
            });
        result
    }
}

/// Wrapper that adds tracing to any QueueWriterFactory
#[derive(Clone)]
pub struct TracedQueue<Q> {
    inner: Q,
}

impl<Q> TracedQueue<Q> {
    pub fn new(inner: Q) -> Self {
        Self { inner }
    }
}

/// Writer handed out by [`TracedQueue`]
pub struct TracedQueueWriter<W> {
    queue: String,
    inner: W,
}

#[async_trait]
impl<Q: QueueWriterFactory> QueueWriterFactory for TracedQueue<Q> {
    type Writer = TracedQueueWriter<Q::Writer>;

    async fn writer(&self, queue: &str) -> Result<Self::Writer, QueueError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.writer(queue).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match result {
                Ok(inner) => {
                    tracing::debug!(elapsed_ms, "writer opened");
                    Ok(TracedQueueWriter {
                        queue: queue.to_string(),
                        inner,
                    })
                }
                Err(e) => {
                    tracing::error!(elapsed_ms, error = %e, "open writer failed");
                    Err(e)
                }
            }
        }
        .instrument(tracing::info_span!("queue.writer", queue))
        .await
    }

    async fn close(&self) -> Result<(), QueueError> {
        let result = self.inner.close().await;
        match &result {
            Ok(()) => tracing::info!("queue connection closed"),
            Err(e) => tracing::warn!(error = %e, "queue close failed"),
        }
        result
    }
}

#[async_trait]
impl<W: QueueWriter> QueueWriter for TracedQueueWriter<W> {
    async fn write(&self, message: &str) -> Result<(), QueueError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.write(message).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "message written"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "write failed"),
            }
            result
        }
        .instrument(tracing::info_span!("queue.write", queue = %self.queue, message))
        .await
    }

    async fn close(self) -> Result<(), QueueError> {
        let queue = self.queue;
        let result = self.inner.close().await;
        if let Err(ref e) = result {
            tracing::warn!(queue, error = %e, "writer close failed");
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
