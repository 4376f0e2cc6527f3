// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translation of Workers and Jobs into cluster objects
//!
//! Pure builders; nothing here talks to the cluster.

use super::labels;
use super::ClusterSubstrateConfig;
use convoy_adapters::cluster::object::{
    Container, EnvVar, LocalObjectReference, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    Pod, PodSpec, ResourceRequests, Secret, SecurityContext, Volume, VolumeMount, VolumeSource,
};
use convoy_adapters::ObjectMeta;
use convoy_core::{Event, JobContainerSpec, JobSpec, KubernetesConfig, LogLevel, WorkerGitConfig};
use serde::Serialize;
use std::collections::BTreeMap;

pub(crate) const EVENT_MOUNT_PATH: &str = "/var/event";
pub(crate) const WORKSPACE_MOUNT_PATH: &str = "/var/workspace";
pub(crate) const VCS_MOUNT_PATH: &str = "/var/vcs";
pub(crate) const DOCKER_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Claim size when a Worker's spec leaves it blank.
const FALLBACK_WORKSPACE_SIZE: &str = "1G";

const VOLUME_EVENT: &str = "event";
const VOLUME_WORKSPACE: &str = "workspace";
const VOLUME_VCS: &str = "vcs";
const VOLUME_DOCKER_SOCKET: &str = "docker-socket";

/// Keys copied from the project secrets into every event secret.
pub(crate) const GIT_SSH_KEY: &str = "gitSSHKey";
pub(crate) const GIT_SSH_CERT: &str = "gitSSHCert";
pub(crate) const EVENT_DOCUMENT: &str = "event.json";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDocument<'a> {
    id: &'a str,
    project: ProjectDocument<'a>,
    source: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    short_title: &'a str,
    long_title: &'a str,
    payload: &'a str,
    worker: WorkerDocument<'a>,
}

#[derive(Serialize)]
struct ProjectDocument<'a> {
    id: &'a str,
    kubernetes: Option<&'a KubernetesConfig>,
    secrets: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkerDocument<'a> {
    api_address: &'a str,
    api_token: &'a str,
    log_level: Option<LogLevel>,
    config_files_directory: &'a str,
    default_config_files: &'a BTreeMap<String, String>,
}

/// Snapshot of the Event and its Project's secrets, as the Worker will see it.
pub(crate) fn event_secret(
    config: &ClusterSubstrateConfig,
    event: &Event,
    namespace: &str,
    project_secrets: &BTreeMap<String, String>,
) -> Result<Secret, serde_json::Error> {
    let spec = &event.worker.spec;
    let document = EventDocument {
        id: event.id.as_str(),
        project: ProjectDocument {
            id: event.project(),
            kubernetes: event.kubernetes.as_ref(),
            secrets: project_secrets,
        },
        source: &event.source,
        event_type: &event.event_type,
        short_title: &event.short_title,
        long_title: &event.long_title,
        payload: &event.payload,
        worker: WorkerDocument {
            api_address: &config.api_address,
            api_token: event.worker.token.as_deref().unwrap_or_default(),
            log_level: spec.log_level,
            config_files_directory: &spec.config_files_directory,
            default_config_files: &spec.default_config_files,
        },
    };

    let mut data = BTreeMap::new();
    data.insert(
        EVENT_DOCUMENT.to_string(),
        serde_json::to_string_pretty(&document)?,
    );
    for key in [GIT_SSH_KEY, GIT_SSH_CERT] {
        data.insert(
            key.to_string(),
            project_secrets.get(key).cloned().unwrap_or_default(),
        );
    }

    let meta = ObjectMeta::in_namespace(labels::event_secret_name(event.id.as_str()), namespace)
        .with_labels(labels::for_event(
            labels::COMPONENT_EVENT,
            event.project(),
            event.id.as_str(),
        ));
    Ok(Secret::typed(labels::SECRET_TYPE_EVENT, meta, data))
}

pub(crate) fn workspace_claim(
    config: &ClusterSubstrateConfig,
    event: &Event,
    namespace: &str,
) -> PersistentVolumeClaim {
    let size = match event.worker.spec.workspace_size.as_str() {
        "" => FALLBACK_WORKSPACE_SIZE,
        size => size,
    };
    let storage_class =
        Some(config.workspace_storage_class.clone()).filter(|class| !class.is_empty());
    PersistentVolumeClaim {
        metadata: ObjectMeta::in_namespace(
            labels::workspace_claim_name(event.id.as_str()),
            namespace,
        )
        .with_labels(labels::for_event(
            labels::COMPONENT_WORKSPACE,
            event.project(),
            event.id.as_str(),
        )),
        spec: PersistentVolumeClaimSpec {
            access_modes: vec!["ReadWriteMany".to_string()],
            storage_class_name: storage_class,
            resources: ResourceRequests {
                requests: [("storage".to_string(), size.to_string())]
                    .into_iter()
                    .collect(),
            },
        },
    }
}

/// Init container that checks out the Event's source into the `vcs` volume.
fn git_initializer(
    config: &ClusterSubstrateConfig,
    event_id: &str,
    git: &WorkerGitConfig,
) -> Container {
    let event_secret = labels::event_secret_name(event_id);
    Container {
        name: VOLUME_VCS.to_string(),
        image: config.git_initializer_image.clone(),
        image_pull_policy: config.git_initializer_image_pull_policy.clone(),
        env: vec![
            EnvVar::value("CONVOY_REMOTE_URL", &git.clone_url),
            EnvVar::value("CONVOY_COMMIT_ID", &git.commit),
            EnvVar::value("CONVOY_COMMIT_REF", &git.git_ref),
            EnvVar::from_secret("CONVOY_REPO_KEY", &event_secret, GIT_SSH_KEY),
            EnvVar::from_secret("CONVOY_REPO_SSH_CERT", &event_secret, GIT_SSH_CERT),
            EnvVar::value("CONVOY_SUBMODULES", git.init_submodules.to_string()),
            EnvVar::value("CONVOY_WORKSPACE", VCS_MOUNT_PATH),
        ],
        volume_mounts: vec![VolumeMount::new(VOLUME_VCS, VCS_MOUNT_PATH)],
        ..Default::default()
    }
}

fn image_pull_secrets(event: &Event) -> Vec<LocalObjectReference> {
    event
        .worker
        .spec
        .kubernetes
        .as_ref()
        .map(|k| LocalObjectReference::list(&k.image_pull_secrets))
        .unwrap_or_default()
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

pub(crate) fn worker_pod(config: &ClusterSubstrateConfig, event: &Event, namespace: &str) -> Pod {
    let event_id = event.id.as_str();
    let spec = &event.worker.spec;
    let container = spec.container.clone().unwrap_or_default();

    let mut volumes = vec![Volume {
        name: VOLUME_EVENT.to_string(),
        source: VolumeSource::Secret {
            secret_name: labels::event_secret_name(event_id),
        },
    }];
    let mut mounts = vec![VolumeMount::new(VOLUME_EVENT, EVENT_MOUNT_PATH).read_only()];

    if spec.use_workspace {
        volumes.push(Volume {
            name: VOLUME_WORKSPACE.to_string(),
            source: VolumeSource::PersistentVolumeClaim {
                claim_name: labels::workspace_claim_name(event_id),
            },
        });
        mounts.push(VolumeMount::new(VOLUME_WORKSPACE, WORKSPACE_MOUNT_PATH));
    }

    let mut init_containers = Vec::new();
    if let (Some(git), Some(_)) = (spec.git.as_ref(), spec.clone_url()) {
        volumes.push(Volume {
            name: VOLUME_VCS.to_string(),
            source: VolumeSource::EmptyDir {},
        });
        mounts.push(VolumeMount::new(VOLUME_VCS, VCS_MOUNT_PATH));
        init_containers.push(git_initializer(config, event_id, git));
    }

    let env = container
        .environment
        .iter()
        .map(|(name, value)| EnvVar::value(name, value))
        .collect();

    Pod {
        metadata: ObjectMeta::in_namespace(labels::worker_pod_name(event_id), namespace)
            .with_labels(labels::for_event(
                labels::COMPONENT_WORKER,
                event.project(),
                event_id,
            )),
        spec: PodSpec {
            service_account_name: labels::WORKERS_IDENTITY.to_string(),
            image_pull_secrets: image_pull_secrets(event),
            restart_policy: "Never".to_string(),
            init_containers,
            containers: vec![Container {
                name: "worker".to_string(),
                image: or_default(&container.image, &config.default_worker_image),
                image_pull_policy: or_default(
                    &container.image_pull_policy,
                    &config.default_worker_image_pull_policy,
                ),
                command: container.command,
                args: container.arguments,
                env,
                volume_mounts: mounts,
                ..Default::default()
            }],
            volumes,
            node_selector: BTreeMap::new(),
        },
    }
}

/// Environment values for every container, keyed `<container>.<VAR>`.
pub(crate) fn job_secret(event: &Event, job_name: &str, spec: &JobSpec, namespace: &str) -> Secret {
    let mut data = BTreeMap::new();
    for (container_name, container) in named_containers(job_name, spec) {
        for (var, value) in &container.container.environment {
            data.insert(format!("{}.{}", container_name, var), value.clone());
        }
    }
    let meta = ObjectMeta::in_namespace(labels::job_object_name(event.id.as_str(), job_name), namespace)
        .with_labels(labels::for_job(event.project(), event.id.as_str(), job_name));
    Secret::typed(labels::SECRET_TYPE_JOB, meta, data)
}

/// The primary container takes the Job's name; sidecars keep theirs.
fn named_containers<'a>(
    job_name: &'a str,
    spec: &'a JobSpec,
) -> impl Iterator<Item = (&'a str, &'a JobContainerSpec)> {
    std::iter::once((job_name, &spec.primary_container)).chain(
        spec.sidecar_containers
            .iter()
            .map(|(name, container)| (name.as_str(), container)),
    )
}

/// Volumes the Job's pod actually carries.
struct JobVolumes {
    workspace: bool,
    source: bool,
    docker_socket: bool,
}

fn job_container(
    name: &str,
    spec: &JobContainerSpec,
    secret_name: &str,
    volumes: &JobVolumes,
) -> Container {
    let env = spec
        .container
        .environment
        .keys()
        .map(|var| EnvVar::from_secret(var, secret_name, format!("{}.{}", name, var)))
        .collect();

    let mut mounts = Vec::new();
    if spec.use_workspace && volumes.workspace {
        mounts.push(VolumeMount::new(
            VOLUME_WORKSPACE,
            or_default(&spec.workspace_mount_path, WORKSPACE_MOUNT_PATH),
        ));
    }
    if spec.use_source && volumes.source {
        mounts.push(VolumeMount::new(
            VOLUME_VCS,
            or_default(&spec.source_mount_path, VCS_MOUNT_PATH),
        ));
    }
    if spec.use_host_docker_socket && volumes.docker_socket {
        mounts.push(VolumeMount::new(VOLUME_DOCKER_SOCKET, DOCKER_SOCKET_PATH));
    }

    Container {
        name: name.to_string(),
        image: spec.container.image.clone(),
        image_pull_policy: spec.container.image_pull_policy.clone(),
        command: spec.container.command.clone(),
        args: spec.container.arguments.clone(),
        working_dir: spec.working_directory.clone(),
        env,
        volume_mounts: mounts,
        security_context: spec
            .privileged
            .then_some(SecurityContext { privileged: true }),
    }
}

pub(crate) fn job_pod(
    config: &ClusterSubstrateConfig,
    event: &Event,
    job_name: &str,
    spec: &JobSpec,
    namespace: &str,
) -> Pod {
    let event_id = event.id.as_str();
    let object_name = labels::job_object_name(event_id, job_name);
    let features = spec.features();
    let git = event.worker.spec.git.as_ref();
    let has_source = features.source && event.worker.spec.clone_url().is_some();

    let present = JobVolumes {
        workspace: features.workspace,
        source: has_source,
        docker_socket: features.docker_socket,
    };

    let mut volumes = Vec::new();
    if present.workspace {
        volumes.push(Volume {
            name: VOLUME_WORKSPACE.to_string(),
            source: VolumeSource::PersistentVolumeClaim {
                claim_name: labels::workspace_claim_name(event_id),
            },
        });
    }
    let mut init_containers = Vec::new();
    if let (true, Some(git)) = (present.source, git) {
        volumes.push(Volume {
            name: VOLUME_VCS.to_string(),
            source: VolumeSource::EmptyDir {},
        });
        init_containers.push(git_initializer(config, event_id, git));
    }
    if present.docker_socket {
        volumes.push(Volume {
            name: VOLUME_DOCKER_SOCKET.to_string(),
            source: VolumeSource::HostPath {
                path: DOCKER_SOCKET_PATH.to_string(),
            },
        });
    }

    let containers = named_containers(job_name, spec)
        .map(|(name, container)| job_container(name, container, &object_name, &present))
        .collect();

    let mut node_selector = BTreeMap::new();
    if let Some(host) = spec.host.as_ref() {
        node_selector.extend(host.node_selector.clone());
        if let Some(os) = host.os.as_ref().filter(|os| !os.is_empty()) {
            node_selector.insert("kubernetes.io/os".to_string(), os.clone());
        }
    }

    Pod {
        metadata: ObjectMeta::in_namespace(object_name.clone(), namespace)
            .with_labels(labels::for_job(event.project(), event_id, job_name)),
        spec: PodSpec {
            service_account_name: labels::JOBS_IDENTITY.to_string(),
            image_pull_secrets: image_pull_secrets(event),
            restart_policy: "Never".to_string(),
            init_containers,
            containers,
            volumes,
            node_selector,
        },
    }
}

#[cfg(test)]
#[path = "pods_tests.rs"]
mod tests;
