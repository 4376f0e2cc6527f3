// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project lifecycle

use super::{ServiceDeps, Store};
use crate::substrate::Substrate;
use convoy_core::{
    authorize, Clock, ListOptions, Page, Principal, Project, Result, ResultExt, Role,
};

#[derive(Clone)]
pub struct ProjectsService<St, Su, C> {
    store: St,
    substrate: Su,
    clock: C,
}

impl<St, Su, C> ProjectsService<St, Su, C>
where
    St: Store,
    Su: Substrate,
    C: Clock,
{
    pub fn new<I>(deps: &ServiceDeps<St, Su, C, I>) -> Self {
        Self {
            store: deps.store.clone(),
            substrate: deps.substrate.clone(),
            clock: deps.clock.clone(),
        }
    }

    /// Persist a new Project, then provision it on the substrate.
    pub async fn create(&self, principal: &Principal, mut project: Project) -> Result<Project> {
        authorize(principal, &[Role::project_creator()])?;

        project.created = Some(self.clock.now());
        let project = self
            .substrate
            .pre_create_project(project)
            .context(|| "pre-create project on the substrate")?;

        self.store
            .create_project(&project)
            .await
            .context(|| format!("store new project {}", project.id))?;
        self.substrate
            .create_project(&project)
            .await
            .context(|| format!("create project {} on the substrate", project.id))?;

        tracing::info!(project_id = %project.id, "project created");
        Ok(project)
    }

    pub async fn list(&self, principal: &Principal, opts: &ListOptions) -> Result<Page<Project>> {
        authorize(principal, &[Role::reader()])?;
        self.store
            .list_projects(opts)
            .await
            .context(|| "list projects")
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> Result<Project> {
        authorize(principal, &[Role::reader()])?;
        self.store
            .get_project(id)
            .await
            .context(|| format!("get project {}", id))
    }

    /// Replace a Project's spec. Substrate identity and creation time are
    /// carried over from the stored record.
    pub async fn update(&self, principal: &Principal, project: Project) -> Result<Project> {
        authorize(principal, &[Role::project_developer(project.id.as_str())])?;

        let original = self
            .store
            .get_project(project.id.as_str())
            .await
            .context(|| format!("get project {}", project.id))?;
        let mut project = self
            .substrate
            .pre_update_project(&original, project)
            .context(|| format!("pre-update project {} on the substrate", original.id))?;
        project.created = original.created;

        self.store
            .update_project(&project)
            .await
            .context(|| format!("update project {} in store", project.id))?;
        self.substrate
            .update_project(&project)
            .await
            .context(|| format!("update project {} on the substrate", project.id))?;
        Ok(project)
    }

    /// Remove a Project and its Events, then tear down its namespace.
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        authorize(principal, &[Role::project_admin(id)])?;

        let project = self
            .store
            .get_project(id)
            .await
            .context(|| format!("get project {}", id))?;
        self.store
            .delete_project(id)
            .await
            .context(|| format!("delete project {} from store", id))?;
        self.substrate
            .delete_project(&project)
            .await
            .context(|| format!("delete project {} from the substrate", id))?;

        tracing::info!(project_id = id, "project deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "projects_tests.rs"]
mod tests;
