// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Labels and names for cluster objects

use convoy_adapters::LabelMap;

pub const COMPONENT: &str = "convoy.dev/component";
pub const PROJECT: &str = "convoy.dev/project";
pub const EVENT: &str = "convoy.dev/event";
pub const JOB: &str = "convoy.dev/job";

pub const COMPONENT_PROJECT_SECRETS: &str = "project-secrets";
pub const COMPONENT_EVENT: &str = "event";
pub const COMPONENT_WORKSPACE: &str = "workspace";
pub const COMPONENT_WORKER: &str = "worker";
pub const COMPONENT_JOB: &str = "job";

pub const SECRET_TYPE_PROJECT_SECRETS: &str = "convoy.dev/project-secrets";
pub const SECRET_TYPE_EVENT: &str = "convoy.dev/event";
pub const SECRET_TYPE_JOB: &str = "convoy.dev/job";

/// Service account, role, and binding name shared by a Project's Workers.
pub const WORKERS_IDENTITY: &str = "workers";
/// Service account, role, and binding name shared by a Project's Jobs.
pub const JOBS_IDENTITY: &str = "jobs";
pub const PROJECT_SECRETS: &str = "project-secrets";

pub fn event_secret_name(event_id: &str) -> String {
    format!("event-{}", event_id)
}

pub fn workspace_claim_name(event_id: &str) -> String {
    format!("workspace-{}", event_id)
}

pub fn worker_pod_name(event_id: &str) -> String {
    format!("worker-{}", event_id)
}

/// Shared by the Job's pod and its secret.
pub fn job_object_name(event_id: &str, job_name: &str) -> String {
    format!("job-{}-{}", event_id, job_name.to_lowercase())
}

fn label_map(pairs: &[(&str, &str)]) -> LabelMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn for_project(component: &str, project_id: &str) -> LabelMap {
    label_map(&[(COMPONENT, component), (PROJECT, project_id)])
}

pub fn for_event(component: &str, project_id: &str, event_id: &str) -> LabelMap {
    label_map(&[
        (COMPONENT, component),
        (PROJECT, project_id),
        (EVENT, event_id),
    ])
}

pub fn for_job(project_id: &str, event_id: &str, job_name: &str) -> LabelMap {
    label_map(&[
        (COMPONENT, COMPONENT_JOB),
        (PROJECT, project_id),
        (EVENT, event_id),
        (JOB, job_name),
    ])
}

/// Selects every object belonging to one Event.
pub fn event_selector(event_id: &str) -> LabelMap {
    label_map(&[(EVENT, event_id)])
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
