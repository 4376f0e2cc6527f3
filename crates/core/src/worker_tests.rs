// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::EventGitConfig;
use proptest::prelude::*;
use yare::parameterized;

#[parameterized(
    pending = { WorkerPhase::Pending, false },
    running = { WorkerPhase::Running, false },
    succeeded = { WorkerPhase::Succeeded, true },
    failed = { WorkerPhase::Failed, true },
    canceled = { WorkerPhase::Canceled, true },
    aborted = { WorkerPhase::Aborted, true },
    timed_out = { WorkerPhase::TimedOut, true },
    unknown = { WorkerPhase::Unknown, true },
)]
fn terminal_phases(phase: WorkerPhase, terminal: bool) {
    assert_eq!(phase.is_terminal(), terminal);
}

#[parameterized(
    pending_to_running = { WorkerPhase::Pending, WorkerPhase::Running, true },
    pending_to_pending = { WorkerPhase::Pending, WorkerPhase::Pending, true },
    pending_to_canceled = { WorkerPhase::Pending, WorkerPhase::Canceled, true },
    running_to_succeeded = { WorkerPhase::Running, WorkerPhase::Succeeded, true },
    running_to_running = { WorkerPhase::Running, WorkerPhase::Running, true },
    running_to_pending = { WorkerPhase::Running, WorkerPhase::Pending, false },
    succeeded_to_failed = { WorkerPhase::Succeeded, WorkerPhase::Failed, false },
    aborted_to_running = { WorkerPhase::Aborted, WorkerPhase::Running, false },
)]
fn phase_transitions(from: WorkerPhase, to: WorkerPhase, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn phases_serialize_in_upper_snake_case() {
    assert_eq!(
        serde_json::to_string(&WorkerPhase::TimedOut).unwrap(),
        "\"TIMED_OUT\""
    );
    assert_eq!(WorkerPhase::TimedOut.to_string(), "TIMED_OUT");
    assert_eq!(WorkerPhase::ALL.len(), 8);
}

#[test]
fn resolve_fills_platform_defaults() {
    let spec = WorkerSpec::default().resolve(None);
    assert_eq!(spec.workspace_size, DEFAULT_WORKSPACE_SIZE);
    assert_eq!(spec.log_level, Some(LogLevel::Info));
    assert_eq!(spec.config_files_directory, ".");
    assert!(spec.git.is_none());
}

#[test]
fn resolve_keeps_explicit_values() {
    let template = WorkerSpec {
        workspace_size: "1Gi".to_string(),
        log_level: Some(LogLevel::Debug),
        config_files_directory: ".convoy".to_string(),
        ..Default::default()
    };
    let spec = template.resolve(None);
    assert_eq!(spec.workspace_size, "1Gi");
    assert_eq!(spec.log_level, Some(LogLevel::Debug));
    assert_eq!(spec.config_files_directory, ".convoy");
}

#[test]
fn event_git_overrides_template_field_by_field() {
    let template = WorkerSpec {
        git: Some(WorkerGitConfig {
            clone_url: "https://example.com/template.git".to_string(),
            commit: String::new(),
            git_ref: "main".to_string(),
            init_submodules: true,
        }),
        ..Default::default()
    };
    let overlay = EventGitConfig {
        clone_url: String::new(),
        commit: "abc123".to_string(),
        git_ref: String::new(),
    };
    let git = template.resolve(Some(&overlay)).git.unwrap();
    assert_eq!(git.clone_url, "https://example.com/template.git");
    assert_eq!(git.commit, "abc123");
    assert_eq!(git.git_ref, "main");
    assert!(git.init_submodules);
}

#[test]
fn clone_url_without_commit_or_ref_defaults_the_ref() {
    let overlay = EventGitConfig {
        clone_url: "https://example.com/repo.git".to_string(),
        ..Default::default()
    };
    let spec = WorkerSpec::default().resolve(Some(&overlay));
    assert_eq!(spec.git.unwrap().git_ref, DEFAULT_GIT_REF);
}

#[test]
fn commit_alone_does_not_get_a_default_ref() {
    let overlay = EventGitConfig {
        clone_url: "https://example.com/repo.git".to_string(),
        commit: "abc123".to_string(),
        ..Default::default()
    };
    let spec = WorkerSpec::default().resolve(Some(&overlay));
    assert_eq!(spec.git.unwrap().git_ref, "");
}

#[test]
fn job_policy_helpers_default_to_forbidden() {
    let spec = WorkerSpec::default();
    assert!(!spec.allows_privileged_jobs());
    assert!(!spec.allows_docker_socket_jobs());
    let spec = WorkerSpec {
        job_policies: Some(JobPolicies {
            allow_privileged: true,
            ..Default::default()
        }),
        ..Default::default()
    };
    assert!(spec.allows_privileged_jobs());
    assert!(!spec.allows_docker_socket_jobs());
}

#[test]
fn only_the_hashed_token_is_serialized() {
    let worker = Worker {
        token: Some("secret".to_string()),
        hashed_token: "digest".to_string(),
        ..Default::default()
    };
    let json = serde_json::to_value(&worker).unwrap();
    assert!(!json.to_string().contains("secret"));
    assert_eq!(json["hashedToken"], "digest");

    let back: Worker = serde_json::from_value(json).unwrap();
    assert!(back.token.is_none());
    assert_eq!(back.hashed_token, "digest");
}

fn arb_spec() -> impl Strategy<Value = WorkerSpec> {
    (
        prop::option::of("[0-9]{1,2}Gi"),
        prop::option::of(prop_oneof![
            Just(LogLevel::Debug),
            Just(LogLevel::Info),
            Just(LogLevel::Warn),
            Just(LogLevel::Error)
        ]),
        prop::option::of("[a-z./]{1,8}"),
        prop::option::of(("[a-z:/.]{0,12}", "[a-f0-9]{0,6}", "[a-z]{0,6}")),
    )
        .prop_map(|(size, level, dir, git)| WorkerSpec {
            workspace_size: size.unwrap_or_default(),
            log_level: level,
            config_files_directory: dir.unwrap_or_default(),
            git: git.map(|(clone_url, commit, git_ref)| WorkerGitConfig {
                clone_url,
                commit,
                git_ref,
                init_submodules: false,
            }),
            ..Default::default()
        })
}

proptest! {
    #[test]
    fn resolve_is_idempotent(spec in arb_spec()) {
        let once = spec.resolve(None);
        let twice = once.resolve(None);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn resolve_never_overwrites_explicit_values(spec in arb_spec()) {
        let resolved = spec.resolve(None);
        if !spec.workspace_size.is_empty() {
            prop_assert_eq!(&resolved.workspace_size, &spec.workspace_size);
        }
        if spec.log_level.is_some() {
            prop_assert_eq!(resolved.log_level, spec.log_level);
        }
        if !spec.config_files_directory.is_empty() {
            prop_assert_eq!(&resolved.config_files_directory, &spec.config_files_directory);
        }
    }
}
