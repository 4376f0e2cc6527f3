// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    ContainerSpec, Event, EventSubscription, JobContainerSpec, JobPolicies, JobSpec,
    KubernetesConfig, Project, ProjectId, ProjectSpec, WorkerPhase, WorkerSpec,
};

// ── Project factories ───────────────────────────────────────────────────────

/// A Project subscribed to `source` events of any type.
pub fn project(id: &str, source: &str) -> Project {
    Project::new(
        id,
        ProjectSpec {
            event_subscriptions: vec![EventSubscription {
                source: source.to_string(),
                types: vec!["*".to_string()],
                labels: Default::default(),
            }],
            worker_template: WorkerSpec::default(),
        },
    )
}

/// A Project that already went through substrate provisioning.
pub fn provisioned_project(id: &str, source: &str) -> Project {
    let mut project = project(id, source);
    project.kubernetes = Some(KubernetesConfig {
        namespace: format!("convoy-{}-abcdefghij", id),
    });
    project
}

// ── Event factories ─────────────────────────────────────────────────────────

/// An Event aimed at a single Project.
pub fn event_for(project_id: &str, source: &str, event_type: &str) -> Event {
    let mut event = Event::new(source, event_type);
    event.project_id = Some(ProjectId::new(project_id));
    event
}

/// A stored-looking Event in the given phase.
pub fn stored_event(id: &str, project_id: &str, phase: WorkerPhase) -> Event {
    let mut event = event_for(project_id, "github", "push");
    event.id = id.into();
    event.kubernetes = Some(KubernetesConfig {
        namespace: format!("convoy-{}-abcdefghij", project_id),
    });
    event.worker.spec = WorkerSpec::default().resolve(None);
    event.worker.status.phase = phase;
    event.worker.hashed_token = format!("hash-{}", id);
    event
}

// ── Job factories ───────────────────────────────────────────────────────────

pub fn job_container(image: &str) -> JobContainerSpec {
    JobContainerSpec {
        container: ContainerSpec {
            image: image.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn job_spec(image: &str) -> JobSpec {
    JobSpec {
        primary_container: job_container(image),
        ..Default::default()
    }
}

pub fn permissive_policies() -> JobPolicies {
    JobPolicies {
        allow_privileged: true,
        allow_docker_socket_mount: true,
        kubernetes: None,
    }
}
