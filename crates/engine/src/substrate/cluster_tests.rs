// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use convoy_adapters::cluster::object::{PersistentVolumeClaim, Pod};
use convoy_adapters::{ClusterCall, FakeCluster, FakeQueue};
use convoy_core::test_support::{job_spec, provisioned_project, stored_event};
use convoy_core::{Job, WorkerPhase};

type TestSubstrate = ClusterSubstrate<FakeCluster, FakeQueue>;

fn setup() -> (TestSubstrate, FakeCluster, FakeQueue) {
    let cluster = FakeCluster::new();
    let queue = FakeQueue::new();
    let substrate = ClusterSubstrate::new(
        cluster.clone(),
        queue.clone(),
        ClusterSubstrateConfig::default(),
    );
    (substrate, cluster, queue)
}

fn secret(object: Option<Object>) -> Secret {
    match object {
        Some(Object::Secret(secret)) => secret,
        other => panic!("expected a secret, got {:?}", other),
    }
}

fn is_internal(err: &Error) -> bool {
    matches!(err.root(), Error::Internal(_))
}

/// A provisioned Project plus a PENDING Event bound to it.
async fn provisioned(substrate: &TestSubstrate) -> (Project, Event) {
    let project = provisioned_project("italian", "github");
    substrate.create_project(&project).await.unwrap();
    let mut event = stored_event("e1", "italian", WorkerPhase::Pending);
    event.kubernetes = project.kubernetes.clone();
    event.worker.token = Some("first-token".to_string());
    (project, event)
}

#[test]
fn pre_create_project_assigns_lowercase_namespace() {
    let (substrate, _, _) = setup();
    let project = substrate
        .pre_create_project(provisioned_project("Italian", "github"))
        .unwrap();
    let namespace = project.namespace().unwrap();
    assert!(namespace.starts_with("convoy-italian-"), "{}", namespace);
    assert_eq!(namespace.len(), "convoy-italian-".len() + 10);
    assert_eq!(namespace, namespace.to_lowercase());
}

#[test]
fn pre_update_project_keeps_original_namespace() {
    let (substrate, _, _) = setup();
    let original = provisioned_project("italian", "github");
    let mut updated = original.clone();
    updated.kubernetes = None;
    updated.description = "new".to_string();

    let updated = substrate.pre_update_project(&original, updated).unwrap();
    assert_eq!(updated.kubernetes, original.kubernetes);
    assert_eq!(updated.description, "new");
}

#[test]
fn pre_create_event_copies_project_identity() {
    let (substrate, _, _) = setup();
    let mut project = provisioned_project("italian", "github");
    project.spec.worker_template.kubernetes = Some(convoy_core::WorkerKubernetesConfig {
        image_pull_secrets: vec!["registry".to_string()],
    });
    let event = substrate
        .pre_create_event(&project, Event::new("github", "push"))
        .unwrap();
    assert_eq!(event.namespace(), project.namespace());
    assert_eq!(
        event.worker.spec.kubernetes,
        project.spec.worker_template.kubernetes
    );
}

#[tokio::test]
async fn create_project_provisions_namespace_identities_and_secrets() {
    let (substrate, cluster, _) = setup();
    let project = provisioned_project("italian", "github");
    let ns = project.namespace().unwrap().to_string();

    substrate.create_project(&project).await.unwrap();

    assert!(cluster.get(ObjectKind::Namespace, None, &ns).is_some());
    for name in ["workers", "jobs"] {
        assert!(cluster.get(ObjectKind::Role, Some(&ns), name).is_some());
        assert!(cluster.get(ObjectKind::ServiceAccount, Some(&ns), name).is_some());
        assert!(cluster.get(ObjectKind::RoleBinding, Some(&ns), name).is_some());
    }
    let secrets = secret(cluster.get(ObjectKind::Secret, Some(&ns), "project-secrets"));
    assert_eq!(secrets.secret_type, labels::SECRET_TYPE_PROJECT_SECRETS);
    assert!(secrets.string_data.is_empty());
}

#[tokio::test]
async fn create_project_is_repeatable() {
    let (substrate, cluster, _) = setup();
    let project = provisioned_project("italian", "github");
    substrate.create_project(&project).await.unwrap();
    let before = cluster.len();
    substrate.create_project(&project).await.unwrap();
    assert_eq!(cluster.len(), before);
}

#[tokio::test]
async fn create_project_without_namespace_is_internal() {
    let (substrate, cluster, _) = setup();
    let project = convoy_core::test_support::project("italian", "github");
    let err = substrate.create_project(&project).await.unwrap_err();
    assert!(is_internal(&err));
    assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn delete_project_removes_namespace() {
    let (substrate, cluster, _) = setup();
    let project = provisioned_project("italian", "github");
    substrate.create_project(&project).await.unwrap();

    substrate.delete_project(&project).await.unwrap();

    assert!(cluster.is_empty());
    assert!(cluster.calls().contains(&ClusterCall::DeleteNamespace {
        name: project.namespace().unwrap().to_string()
    }));
}

#[tokio::test]
async fn schedule_worker_writes_event_secret_and_enqueues() {
    let (substrate, cluster, queue) = setup();
    let (project, event) = provisioned(&substrate).await;

    substrate.schedule_worker(&project, &event).await.unwrap();

    let stored = secret(cluster.get(ObjectKind::Secret, event.namespace(), "event-e1"));
    assert!(stored.string_data["event.json"].contains("first-token"));
    assert_eq!(queue.bodies("workers.italian"), vec!["e1".to_string()]);
}

#[tokio::test]
async fn rescheduling_replaces_the_event_secret() {
    let (substrate, cluster, queue) = setup();
    let (project, mut event) = provisioned(&substrate).await;
    substrate.schedule_worker(&project, &event).await.unwrap();

    event.worker.token = Some("second-token".to_string());
    substrate.schedule_worker(&project, &event).await.unwrap();

    let stored = secret(cluster.get(ObjectKind::Secret, event.namespace(), "event-e1"));
    assert!(stored.string_data["event.json"].contains("second-token"));
    assert!(!stored.string_data["event.json"].contains("first-token"));
    assert_eq!(queue.bodies("workers.italian").len(), 2);
    // project secrets survive the replacement
    assert!(cluster
        .get(ObjectKind::Secret, event.namespace(), "project-secrets")
        .is_some());
}

#[tokio::test]
async fn schedule_worker_without_project_secrets_enqueues_nothing() {
    let (substrate, _, queue) = setup();
    let project = provisioned_project("italian", "github");
    let mut event = stored_event("e1", "italian", WorkerPhase::Pending);
    event.kubernetes = project.kubernetes.clone();

    let err = substrate.schedule_worker(&project, &event).await.unwrap_err();
    assert!(is_internal(&err));
    assert!(queue.messages().is_empty());
}

#[tokio::test]
async fn queue_failure_surfaces_as_internal() {
    let (substrate, _, queue) = setup();
    let (project, event) = provisioned(&substrate).await;
    queue.fail_next(1);

    let err = substrate.schedule_worker(&project, &event).await.unwrap_err();
    assert!(is_internal(&err));
    assert!(queue.messages().is_empty());
}

#[tokio::test]
async fn start_worker_creates_claim_only_with_workspace() {
    let (substrate, cluster, _) = setup();
    let (_, mut event) = provisioned(&substrate).await;

    substrate.start_worker(&event).await.unwrap();
    assert!(cluster.objects_of(ObjectKind::PersistentVolumeClaim).is_empty());
    assert_eq!(cluster.objects_of(ObjectKind::Pod).len(), 1);

    event.id = "e2".into();
    event.worker.spec.use_workspace = true;
    substrate.start_worker(&event).await.unwrap();
    let claims = cluster.objects_of(ObjectKind::PersistentVolumeClaim);
    assert_eq!(claims.len(), 1);
    let Object::PersistentVolumeClaim(PersistentVolumeClaim { metadata, .. }) = &claims[0] else {
        panic!("expected a claim");
    };
    assert_eq!(metadata.name, "workspace-e2");
}

#[tokio::test]
async fn start_worker_twice_keeps_one_pod() {
    let (substrate, cluster, _) = setup();
    let (_, event) = provisioned(&substrate).await;
    substrate.start_worker(&event).await.unwrap();
    substrate.start_worker(&event).await.unwrap();
    assert_eq!(cluster.objects_of(ObjectKind::Pod).len(), 1);
}

#[tokio::test]
async fn start_worker_propagates_cluster_failures() {
    let (substrate, cluster, _) = setup();
    let (_, event) = provisioned(&substrate).await;
    cluster.fail_next(1);
    let err = substrate.start_worker(&event).await.unwrap_err();
    assert!(is_internal(&err));
}

#[tokio::test]
async fn schedule_job_enqueues_event_and_name() {
    let (substrate, _, queue) = setup();
    let (project, event) = provisioned(&substrate).await;
    substrate
        .schedule_job(&project, &event, "build")
        .await
        .unwrap();
    assert_eq!(queue.bodies("jobs.italian"), vec!["e1:build".to_string()]);
}

#[tokio::test]
async fn start_job_requires_a_known_job() {
    let (substrate, _, _) = setup();
    let (_, event) = provisioned(&substrate).await;
    let err = substrate.start_job(&event, "missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn start_job_creates_secret_and_pod() {
    let (substrate, cluster, _) = setup();
    let (_, mut event) = provisioned(&substrate).await;
    event.worker.jobs.insert(
        "Build".to_string(),
        Job {
            name: "Build".to_string(),
            spec: job_spec("alpine"),
            ..Default::default()
        },
    );

    substrate.start_job(&event, "Build").await.unwrap();

    assert!(cluster
        .get(ObjectKind::Secret, event.namespace(), "job-e1-build")
        .is_some());
    match cluster.get(ObjectKind::Pod, event.namespace(), "job-e1-build") {
        Some(Object::Pod(Pod { spec, .. })) => {
            assert_eq!(spec.containers[0].name, "Build");
            assert_eq!(spec.containers[0].image, "alpine");
        }
        other => panic!("expected job pod, got {:?}", other),
    }
}

#[tokio::test]
async fn delete_worker_and_jobs_leaves_other_events_alone() {
    let (substrate, cluster, _) = setup();
    let (project, event) = provisioned(&substrate).await;
    let mut other = event.clone();
    other.id = "e2".into();
    for e in [&event, &other] {
        substrate.schedule_worker(&project, e).await.unwrap();
        substrate.start_worker(e).await.unwrap();
    }

    substrate.delete_worker_and_jobs(&event).await.unwrap();

    let ns = event.namespace();
    assert!(cluster.get(ObjectKind::Pod, ns, "worker-e1").is_none());
    assert!(cluster.get(ObjectKind::Secret, ns, "event-e1").is_none());
    assert!(cluster.get(ObjectKind::Pod, ns, "worker-e2").is_some());
    assert!(cluster.get(ObjectKind::Secret, ns, "event-e2").is_some());
    assert!(cluster.get(ObjectKind::Secret, ns, "project-secrets").is_some());

    // idempotent
    substrate.delete_worker_and_jobs(&event).await.unwrap();
}

#[tokio::test]
async fn delete_worker_and_jobs_without_namespace_is_a_no_op() {
    let (substrate, cluster, _) = setup();
    let mut event = stored_event("e1", "italian", WorkerPhase::Pending);
    event.kubernetes = None;
    substrate.delete_worker_and_jobs(&event).await.unwrap();
    assert!(cluster.calls().is_empty());
}

// ── Project secrets ─────────────────────────────────────────────────────────

fn event_document(cluster: &FakeCluster, event: &Event) -> serde_json::Value {
    let stored = secret(cluster.get(ObjectKind::Secret, event.namespace(), "event-e1"));
    serde_json::from_str(&stored.string_data["event.json"]).unwrap()
}

#[tokio::test]
async fn secrets_set_before_scheduling_reach_the_event_document() {
    let (substrate, cluster, _) = setup();
    let (project, event) = provisioned(&substrate).await;

    substrate
        .set_secret(&project, &convoy_core::Secret::new("API_KEY", "hunter2"))
        .await
        .unwrap();
    substrate.schedule_worker(&project, &event).await.unwrap();

    let document = event_document(&cluster, &event);
    assert_eq!(document["project"]["secrets"]["API_KEY"], "hunter2");
}

#[tokio::test]
async fn secrets_set_after_scheduling_leave_the_event_document_alone() {
    let (substrate, cluster, _) = setup();
    let (project, event) = provisioned(&substrate).await;
    substrate.schedule_worker(&project, &event).await.unwrap();

    substrate
        .set_secret(&project, &convoy_core::Secret::new("API_KEY", "hunter2"))
        .await
        .unwrap();

    let document = event_document(&cluster, &event);
    assert!(document["project"]["secrets"].get("API_KEY").is_none());
    assert_eq!(substrate.list_secrets(&project).await.unwrap(), vec!["API_KEY"]);
}

#[tokio::test]
async fn list_secrets_is_sorted_by_key() {
    let (substrate, _, _) = setup();
    let (project, _) = provisioned(&substrate).await;
    for key in ["ZED", "ALPHA", "MIDDLE"] {
        substrate
            .set_secret(&project, &convoy_core::Secret::new(key, "v"))
            .await
            .unwrap();
    }

    assert_eq!(
        substrate.list_secrets(&project).await.unwrap(),
        vec!["ALPHA", "MIDDLE", "ZED"]
    );
}

#[tokio::test]
async fn unset_secret_patches_only_present_keys() {
    let (substrate, cluster, _) = setup();
    let (project, _) = provisioned(&substrate).await;
    substrate
        .set_secret(&project, &convoy_core::Secret::new("API_KEY", "hunter2"))
        .await
        .unwrap();

    substrate.unset_secret(&project, "NEVER_SET").await.unwrap();
    substrate.unset_secret(&project, "API_KEY").await.unwrap();

    let patches: Vec<ClusterCall> = cluster
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ClusterCall::PatchSecret { .. }))
        .collect();
    assert_eq!(patches.len(), 2);
    assert_eq!(
        patches[1],
        ClusterCall::PatchSecret {
            namespace: project.namespace().unwrap().to_string(),
            name: "project-secrets".to_string(),
            set: Vec::new(),
            unset: vec!["API_KEY".to_string()],
        }
    );
    assert!(substrate.list_secrets(&project).await.unwrap().is_empty());
}

#[tokio::test]
async fn secrets_of_unprovisioned_project_are_internal() {
    let (substrate, _, _) = setup();
    let project = provisioned_project("italian", "github");

    let err = substrate
        .set_secret(&project, &convoy_core::Secret::new("API_KEY", "v"))
        .await
        .unwrap_err();
    assert!(is_internal(&err));
}
