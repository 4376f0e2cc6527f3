// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cluster::object::Secret;
use crate::cluster::{FakeCluster, ObjectMeta};
use crate::queue::FakeQueue;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

/// Assert that captured logs contain the expected substring
fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "Should log {label}. Logs:\n{logs}",);
}

fn namespace(name: &str) -> Object {
    Object::Namespace(ObjectMeta::named(name))
}

#[test]
#[serial(tracing)]
fn traced_create_logs_span_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedCluster::new(FakeCluster::new());
        traced.create(&namespace("convoy-italian-x")).await
    });

    assert!(result.is_ok(), "create should succeed: {:?}", result);
    assert_log(&logs, "span name", "cluster.create");
    assert_log(&logs, "object", "Namespace/convoy-italian-x");
    assert_log(&logs, "completion", "created");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[test]
#[serial(tracing)]
fn traced_create_conflict_is_not_an_error_log() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeCluster::new();
        fake.seed(namespace("ns"));
        TracedCluster::new(fake).create(&namespace("ns")).await
    });

    assert!(matches!(result, Err(ClusterError::AlreadyExists(_))));
    assert_log(&logs, "conflict", "already exists");
    assert!(!logs.contains("create failed"), "Logs:\n{logs}");
}

#[test]
#[serial(tracing)]
fn traced_get_secret_logs_failure() {
    let (logs, result) = with_tracing(|| async {
        TracedCluster::new(FakeCluster::new())
            .get_secret("ns", "project-secrets")
            .await
    });

    assert!(result.is_err());
    assert_log(&logs, "span", "cluster.get_secret");
    assert_log(&logs, "failure", "read failed");
}

#[test]
#[serial(tracing)]
fn traced_delete_collection_logs_selector() {
    let (logs, _) = with_tracing(|| async {
        let selector: LabelMap = [("convoy.dev/event".to_string(), "e1".to_string())]
            .into_iter()
            .collect();
        TracedCluster::new(FakeCluster::new())
            .delete_collection(ObjectKind::Pod, "ns", &selector)
            .await
    });

    assert_log(&logs, "span", "cluster.delete_collection");
    assert_log(&logs, "selector", "convoy.dev/event");
}

#[test]
#[serial(tracing)]
fn traced_patch_secret_logs_keys_but_not_values() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeCluster::new();
        fake.seed(namespace("ns"));
        fake.seed(Object::Secret(Secret::opaque(
            ObjectMeta::in_namespace("project-secrets", "ns"),
            BTreeMap::new(),
        )));
        let set: BTreeMap<String, String> =
            [("API_KEY".to_string(), "hunter2".to_string())].into_iter().collect();
        TracedCluster::new(fake)
            .patch_secret("ns", "project-secrets", &set, &[])
            .await
    });

    assert!(result.is_ok());
    assert_log(&logs, "span", "cluster.patch_secret");
    assert_log(&logs, "key", "API_KEY");
    assert!(!logs.contains("hunter2"), "secret value leaked:\n{logs}");
}

#[test]
#[serial(tracing)]
fn traced_write_logs_queue_and_message() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedQueue::new(FakeQueue::new());
        let writer = traced.writer("workers.italian").await?;
        writer.write("evt-1").await?;
        writer.close().await
    });

    assert!(result.is_ok());
    assert_log(&logs, "writer span", "queue.writer");
    assert_log(&logs, "write span", "queue.write");
    assert_log(&logs, "queue", "workers.italian");
    assert_log(&logs, "message", "evt-1");
    assert_log(&logs, "completion", "message written");
}

#[test]
#[serial(tracing)]
fn traced_write_logs_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeQueue::new();
        fake.fail_next(1);
        let writer = TracedQueue::new(fake).writer("jobs.italian").await?;
        writer.write("evt-1:build").await
    });

    assert!(result.is_err());
    assert_log(&logs, "failure", "write failed");
}

// =============================================================================
// Delegation tests - verify traced wrapper delegates to inner adapter
// =============================================================================

#[tokio::test]
async fn traced_cluster_delegates_to_inner() {
    let fake = FakeCluster::new();
    let traced = TracedCluster::new(fake.clone());

    traced.create(&namespace("ns")).await.unwrap();
    traced.delete_namespace("ns").await.unwrap();

    assert_eq!(fake.calls().len(), 2);
    assert!(fake.is_empty());
}

#[tokio::test]
async fn traced_queue_delegates_to_inner() {
    let fake = FakeQueue::new();
    let traced = TracedQueue::new(fake.clone());

    let writer = traced.writer("workers.italian").await.unwrap();
    writer.write("evt-1").await.unwrap();
    traced.close().await.unwrap();

    assert_eq!(fake.bodies("workers.italian"), vec!["evt-1".to_string()]);
    assert!(fake.is_closed());
}
