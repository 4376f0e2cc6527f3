// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker specification, status, and phase machine

use crate::job::Job;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workspace size used when neither the template nor the Event sets one
pub const DEFAULT_WORKSPACE_SIZE: &str = "10Gi";

/// Git ref checked out when a clone URL names neither a commit nor a ref
pub const DEFAULT_GIT_REF: &str = "master";

/// Config file directory relative to the Worker's root
pub const DEFAULT_CONFIG_FILES_DIRECTORY: &str = ".";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Aborted,
    TimedOut,
    Unknown,
}

impl WorkerPhase {
    pub const ALL: [WorkerPhase; 8] = [
        WorkerPhase::Pending,
        WorkerPhase::Running,
        WorkerPhase::Succeeded,
        WorkerPhase::Failed,
        WorkerPhase::Canceled,
        WorkerPhase::Aborted,
        WorkerPhase::TimedOut,
        WorkerPhase::Unknown,
    ];

    /// Every phase except PENDING and RUNNING is terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, WorkerPhase::Pending | WorkerPhase::Running)
    }

    fn rank(self) -> u8 {
        match self {
            WorkerPhase::Pending => 0,
            WorkerPhase::Running => 1,
            _ => 2,
        }
    }

    /// Phases only move forward: PENDING, then RUNNING, then a terminal
    /// phase. Nothing leaves a terminal phase. Re-reporting the current
    /// non-terminal phase is allowed so timestamps can be refreshed.
    pub fn can_transition_to(self, next: WorkerPhase) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl std::fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WorkerPhase::Pending => "PENDING",
            WorkerPhase::Running => "RUNNING",
            WorkerPhase::Succeeded => "SUCCEEDED",
            WorkerPhase::Failed => "FAILED",
            WorkerPhase::Canceled => "CANCELED",
            WorkerPhase::Aborted => "ABORTED",
            WorkerPhase::TimedOut => "TIMED_OUT",
            WorkerPhase::Unknown => "UNKNOWN",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Image and process settings for a single container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub image_pull_policy: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerGitConfig {
    #[serde(default, rename = "cloneURL")]
    pub clone_url: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub init_submodules: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerKubernetesConfig {
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
}

/// Worker-level gates on what spawned Jobs may request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPolicies {
    #[serde(default)]
    pub allow_privileged: bool,
    #[serde(default)]
    pub allow_docker_socket_mount: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<WorkerKubernetesConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerSpec>,
    #[serde(default)]
    pub use_workspace: bool,
    #[serde(default)]
    pub workspace_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<WorkerGitConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<WorkerKubernetesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_policies: Option<JobPolicies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub config_files_directory: String,
    #[serde(default)]
    pub default_config_files: BTreeMap<String, String>,
}

impl WorkerSpec {
    /// Resolve a Project's worker template against an Event's git override.
    ///
    /// Event git fields win field by field when non-empty. Unset fields fall
    /// back to platform defaults; explicit values are never overwritten, so
    /// resolving twice yields the same spec.
    pub fn resolve(&self, event_git: Option<&crate::event::EventGitConfig>) -> WorkerSpec {
        let mut spec = self.clone();

        if spec.workspace_size.is_empty() {
            spec.workspace_size = DEFAULT_WORKSPACE_SIZE.to_string();
        }

        if let Some(overlay) = event_git {
            let git = spec.git.get_or_insert_with(WorkerGitConfig::default);
            if !overlay.clone_url.is_empty() {
                git.clone_url = overlay.clone_url.clone();
            }
            if !overlay.commit.is_empty() {
                git.commit = overlay.commit.clone();
            }
            if !overlay.git_ref.is_empty() {
                git.git_ref = overlay.git_ref.clone();
            }
        }

        if let Some(git) = spec.git.as_mut() {
            if !git.clone_url.is_empty() && git.commit.is_empty() && git.git_ref.is_empty() {
                git.git_ref = DEFAULT_GIT_REF.to_string();
            }
        }

        if spec.log_level.is_none() {
            spec.log_level = Some(LogLevel::Info);
        }

        if spec.config_files_directory.is_empty() {
            spec.config_files_directory = DEFAULT_CONFIG_FILES_DIRECTORY.to_string();
        }

        spec
    }

    /// Clone URL when source checkout is configured.
    pub fn clone_url(&self) -> Option<&str> {
        self.git
            .as_ref()
            .map(|g| g.clone_url.as_str())
            .filter(|url| !url.is_empty())
    }

    pub fn allows_privileged_jobs(&self) -> bool {
        self.job_policies
            .as_ref()
            .is_some_and(|p| p.allow_privileged)
    }

    pub fn allows_docker_socket_jobs(&self) -> bool {
        self.job_policies
            .as_ref()
            .is_some_and(|p| p.allow_docker_socket_mount)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub phase: WorkerPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended: Option<DateTime<Utc>>,
}

/// The execution unit handling exactly one Event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    #[serde(default)]
    pub spec: WorkerSpec,
    #[serde(default)]
    pub status: WorkerStatus,
    /// One-time bearer token. Present only on the value returned from
    /// creation; never stored or serialized.
    #[serde(skip)]
    pub token: Option<String>,
    /// Persisted in place of the token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hashed_token: String,
    /// Set once the substrate accepted the dispatch.
    #[serde(default)]
    pub scheduled: bool,
    #[serde(default)]
    pub jobs: BTreeMap<String, Job>,
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
