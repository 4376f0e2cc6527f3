// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container-cluster substrate
//!
//! Each Project gets its own namespace. Workers and Jobs are announced on
//! per-Project queues and launched as pods when the scheduler calls back.

use super::{labels, pods, Substrate};
use async_trait::async_trait;
use convoy_adapters::cluster::object::{Role, RoleBinding, Secret, ServiceAccount};
use convoy_adapters::{
    ClusterClient, ClusterError, Object, ObjectKind, ObjectMeta, QueueWriter, QueueWriterFactory,
};
use convoy_core::{
    new_token, Error, Event, KubernetesConfig, Project, ResourceKind, Result, ResultExt,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Length of the random suffix on Project namespaces.
const NAMESPACE_SUFFIX_LEN: usize = 10;

/// Settings for [`ClusterSubstrate`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClusterSubstrateConfig {
    /// Address Workers use to call back into the API.
    pub api_address: String,
    pub default_worker_image: String,
    pub default_worker_image_pull_policy: String,
    pub workspace_storage_class: String,
    pub git_initializer_image: String,
    pub git_initializer_image_pull_policy: String,
}

impl Default for ClusterSubstrateConfig {
    fn default() -> Self {
        Self {
            api_address: "http://convoy-apiserver".to_string(),
            default_worker_image: "convoy/worker:latest".to_string(),
            default_worker_image_pull_policy: "IfNotPresent".to_string(),
            workspace_storage_class: "nfs".to_string(),
            git_initializer_image: "convoy/git-initializer:latest".to_string(),
            git_initializer_image_pull_policy: "Always".to_string(),
        }
    }
}

/// Substrate backed by a cluster client and a queue writer factory
#[derive(Clone)]
pub struct ClusterSubstrate<C, Q> {
    cluster: C,
    queue: Q,
    config: Arc<ClusterSubstrateConfig>,
}

pub(crate) fn workers_queue(project_id: &str) -> String {
    format!("workers.{}", project_id)
}

pub(crate) fn jobs_queue(project_id: &str) -> String {
    format!("jobs.{}", project_id)
}

fn project_namespace(project: &Project) -> Result<&str> {
    project.namespace().ok_or_else(|| {
        Error::internal(format!("project {} has no namespace assigned", project.id))
    })
}

fn event_namespace(event: &Event) -> Result<&str> {
    event
        .namespace()
        .ok_or_else(|| Error::internal(format!("event {} has no namespace assigned", event.id)))
}

impl<C, Q> ClusterSubstrate<C, Q>
where
    C: ClusterClient,
    Q: QueueWriterFactory,
{
    pub fn new(cluster: C, queue: Q, config: ClusterSubstrateConfig) -> Self {
        Self {
            cluster,
            queue,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClusterSubstrateConfig {
        &self.config
    }

    /// Create `object`, treating an existing one as success.
    async fn ensure(&self, object: Object) -> Result<()> {
        match self.cluster.create(&object).await {
            Ok(()) | Err(ClusterError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(Error::from(e).wrap(format!("create {}", object.describe()))),
        }
    }

    /// Publish one message and release the writer.
    async fn enqueue(&self, queue: &str, body: &str) -> Result<()> {
        let writer = self
            .queue
            .writer(queue)
            .await
            .context(|| format!("open writer for queue {}", queue))?;
        let written = writer.write(body).await;
        if let Err(e) = writer.close().await {
            tracing::warn!(queue, error = %e, "failed to close queue writer");
        }
        written.context(|| format!("write to queue {}", queue))
    }

    /// Write a fresh event secret, replacing one left by an earlier dispatch.
    async fn replace_event_secret(&self, secret: Secret, event: &Event) -> Result<()> {
        let object = Object::Secret(secret);
        match self.cluster.create(&object).await {
            Ok(()) => return Ok(()),
            Err(ClusterError::AlreadyExists(_)) => {}
            Err(e) => return Err(Error::from(e).wrap(format!("create {}", object.describe()))),
        }

        let namespace = event_namespace(event)?;
        let mut stale = labels::event_selector(event.id.as_str());
        stale.insert(
            labels::COMPONENT.to_string(),
            labels::COMPONENT_EVENT.to_string(),
        );
        tracing::info!(event_id = %event.id, "replacing existing event secret");
        self.cluster
            .delete_collection(ObjectKind::Secret, namespace, &stale)
            .await
            .context(|| format!("delete stale secret for event {}", event.id))?;
        self.cluster
            .create(&object)
            .await
            .context(|| format!("create {}", object.describe()))
    }

    /// A namespace-scoped Role, ServiceAccount and RoleBinding sharing `name`.
    async fn create_identity(&self, namespace: &str, name: &str) -> Result<()> {
        self.ensure(Object::Role(Role {
            metadata: ObjectMeta::in_namespace(name, namespace),
            rules: Vec::new(),
        }))
        .await?;
        self.ensure(Object::ServiceAccount(ServiceAccount {
            metadata: ObjectMeta::in_namespace(name, namespace),
            image_pull_secrets: Vec::new(),
        }))
        .await?;
        self.ensure(Object::RoleBinding(RoleBinding::same_name(namespace, name)))
            .await
    }
}

#[async_trait]
impl<C, Q> Substrate for ClusterSubstrate<C, Q>
where
    C: ClusterClient,
    Q: QueueWriterFactory,
{
    fn pre_create_project(&self, mut project: Project) -> Result<Project> {
        let namespace = format!(
            "convoy-{}-{}",
            project.id,
            new_token(NAMESPACE_SUFFIX_LEN)
        )
        .to_lowercase();
        project.kubernetes = Some(KubernetesConfig { namespace });
        Ok(project)
    }

    async fn create_project(&self, project: &Project) -> Result<()> {
        let namespace = project_namespace(project)?;
        self.ensure(Object::Namespace(ObjectMeta::named(namespace)))
            .await?;
        self.create_identity(namespace, labels::WORKERS_IDENTITY)
            .await?;
        self.create_identity(namespace, labels::JOBS_IDENTITY).await?;
        self.ensure(Object::Secret(Secret::typed(
            labels::SECRET_TYPE_PROJECT_SECRETS,
            ObjectMeta::in_namespace(labels::PROJECT_SECRETS, namespace).with_labels(
                labels::for_project(labels::COMPONENT_PROJECT_SECRETS, project.id.as_str()),
            ),
            BTreeMap::new(),
        )))
        .await?;
        tracing::info!(project_id = %project.id, namespace, "provisioned project");
        Ok(())
    }

    fn pre_update_project(&self, original: &Project, mut updated: Project) -> Result<Project> {
        updated.kubernetes = original.kubernetes.clone();
        Ok(updated)
    }

    async fn update_project(&self, _project: &Project) -> Result<()> {
        Ok(())
    }

    async fn delete_project(&self, project: &Project) -> Result<()> {
        let Some(namespace) = project.namespace() else {
            return Ok(());
        };
        self.cluster
            .delete_namespace(namespace)
            .await
            .context(|| format!("delete namespace {}", namespace))?;
        tracing::info!(project_id = %project.id, namespace, "deleted project namespace");
        Ok(())
    }

    fn pre_create_event(&self, project: &Project, mut event: Event) -> Result<Event> {
        event.kubernetes = project.kubernetes.clone();
        event.worker.spec.kubernetes = project.spec.worker_template.kubernetes.clone();
        Ok(event)
    }

    async fn schedule_worker(&self, project: &Project, event: &Event) -> Result<()> {
        let namespace = event_namespace(event)?;
        let project_secrets = self
            .cluster
            .get_secret(namespace, labels::PROJECT_SECRETS)
            .await
            .context(|| format!("read secrets of project {}", project.id))?;

        let secret = pods::event_secret(&self.config, event, namespace, &project_secrets)
            .map_err(|e| Error::internal(format!("encode event {}: {}", event.id, e)))?;
        self.replace_event_secret(secret, event).await?;

        self.enqueue(&workers_queue(project.id.as_str()), event.id.as_str())
            .await?;
        tracing::info!(event_id = %event.id, project_id = %project.id, "worker scheduled");
        Ok(())
    }

    async fn start_worker(&self, event: &Event) -> Result<()> {
        let namespace = event_namespace(event)?;
        if event.worker.spec.use_workspace {
            self.ensure(Object::PersistentVolumeClaim(pods::workspace_claim(
                &self.config,
                event,
                namespace,
            )))
            .await?;
        }
        self.ensure(Object::Pod(pods::worker_pod(&self.config, event, namespace)))
            .await?;
        tracing::info!(event_id = %event.id, "worker pod created");
        Ok(())
    }

    async fn schedule_job(&self, project: &Project, event: &Event, job_name: &str) -> Result<()> {
        let body = format!("{}:{}", event.id, job_name);
        self.enqueue(&jobs_queue(project.id.as_str()), &body).await?;
        tracing::info!(event_id = %event.id, job = job_name, "job scheduled");
        Ok(())
    }

    async fn start_job(&self, event: &Event, job_name: &str) -> Result<()> {
        let namespace = event_namespace(event)?;
        let job = event.worker.jobs.get(job_name).ok_or_else(|| {
            Error::not_found(ResourceKind::Job, format!("{}:{}", event.id, job_name))
        })?;
        self.ensure(Object::Secret(pods::job_secret(
            event, job_name, &job.spec, namespace,
        )))
        .await?;
        self.ensure(Object::Pod(pods::job_pod(
            &self.config,
            event,
            job_name,
            &job.spec,
            namespace,
        )))
        .await?;
        tracing::info!(event_id = %event.id, job = job_name, "job pod created");
        Ok(())
    }

    async fn list_secrets(&self, project: &Project) -> Result<Vec<String>> {
        let namespace = project_namespace(project)?;
        let data = self
            .cluster
            .get_secret(namespace, labels::PROJECT_SECRETS)
            .await
            .context(|| format!("read secrets of project {}", project.id))?;
        Ok(data.into_keys().collect())
    }

    async fn set_secret(&self, project: &Project, secret: &convoy_core::Secret) -> Result<()> {
        let namespace = project_namespace(project)?;
        let set = BTreeMap::from([(secret.key.clone(), secret.value.clone())]);
        self.cluster
            .patch_secret(namespace, labels::PROJECT_SECRETS, &set, &[])
            .await
            .context(|| format!("set secret {} of project {}", secret.key, project.id))?;
        tracing::info!(project_id = %project.id, key = %secret.key, "project secret set");
        Ok(())
    }

    async fn unset_secret(&self, project: &Project, key: &str) -> Result<()> {
        let namespace = project_namespace(project)?;
        let data = self
            .cluster
            .get_secret(namespace, labels::PROJECT_SECRETS)
            .await
            .context(|| format!("read secrets of project {}", project.id))?;
        if !data.contains_key(key) {
            return Ok(());
        }
        self.cluster
            .patch_secret(
                namespace,
                labels::PROJECT_SECRETS,
                &BTreeMap::new(),
                &[key.to_string()],
            )
            .await
            .context(|| format!("unset secret {} of project {}", key, project.id))?;
        tracing::info!(project_id = %project.id, key, "project secret unset");
        Ok(())
    }

    async fn delete_worker_and_jobs(&self, event: &Event) -> Result<()> {
        let Some(namespace) = event.namespace() else {
            return Ok(());
        };
        let selector = labels::event_selector(event.id.as_str());
        for kind in [
            ObjectKind::Pod,
            ObjectKind::PersistentVolumeClaim,
            ObjectKind::Secret,
        ] {
            self.cluster
                .delete_collection(kind, namespace, &selector)
                .await
                .context(|| format!("delete {} objects of event {}", kind, event.id))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
