// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project secrets: write-only values handed to the Project's Workers

use super::{ServiceDeps, Store};
use crate::substrate::Substrate;
use convoy_core::{
    authorize, Error, ListOptions, Page, Principal, Project, Result, ResultExt, Role, Secret,
};

#[derive(Clone)]
pub struct SecretsService<St, Su> {
    store: St,
    substrate: Su,
}

/// One page of `keys` (already sorted), resuming after `continue_after`.
fn page_of(keys: Vec<String>, opts: &ListOptions) -> Page<Secret> {
    let start = match &opts.continue_after {
        Some(after) => keys.partition_point(|k| k.as_str() <= after.as_str()),
        None => 0,
    };
    let rest = &keys[start..];
    let taken = rest.len().min(opts.effective_limit());
    let remaining = rest.len() - taken;
    let items: Vec<Secret> = rest[..taken].iter().map(Secret::redacted).collect();
    let continue_after = if remaining > 0 {
        items.last().map(|s| s.key.clone())
    } else {
        None
    };
    Page {
        items,
        continue_after,
        remaining,
    }
}

impl<St, Su> SecretsService<St, Su>
where
    St: Store,
    Su: Substrate,
{
    pub fn new<C, I>(deps: &ServiceDeps<St, Su, C, I>) -> Self {
        Self {
            store: deps.store.clone(),
            substrate: deps.substrate.clone(),
        }
    }

    async fn project(&self, project_id: &str) -> Result<Project> {
        self.store
            .get_project(project_id)
            .await
            .context(|| format!("retrieve project {} from store", project_id))
    }

    /// Keys in order, every value redacted.
    pub async fn list(
        &self,
        principal: &Principal,
        project_id: &str,
        opts: &ListOptions,
    ) -> Result<Page<Secret>> {
        authorize(principal, &[Role::reader()])?;

        let project = self.project(project_id).await?;
        let mut keys = self
            .substrate
            .list_secrets(&project)
            .await
            .context(|| format!("list secrets of project {}", project_id))?;
        keys.sort();
        Ok(page_of(keys, opts))
    }

    /// Add or overwrite a secret. Events already scheduled keep the values
    /// they were scheduled with.
    pub async fn set(&self, principal: &Principal, project_id: &str, secret: Secret) -> Result<()> {
        authorize(principal, &[Role::project_admin(project_id)])?;
        if secret.key.is_empty() {
            return Err(Error::bad_request("Required value Key is missing."));
        }

        let project = self.project(project_id).await?;
        self.substrate
            .set_secret(&project, &secret)
            .await
            .context(|| format!("set secret {} of project {}", secret.key, project_id))?;
        tracing::info!(project_id, key = %secret.key, "secret set");
        Ok(())
    }

    /// Remove a secret. Unsetting a key that was never set succeeds.
    pub async fn unset(&self, principal: &Principal, project_id: &str, key: &str) -> Result<()> {
        authorize(principal, &[Role::project_admin(project_id)])?;

        let project = self.project(project_id).await?;
        self.substrate
            .unset_secret(&project, key)
            .await
            .context(|| format!("unset secret {} of project {}", key, project_id))?;
        tracing::info!(project_id, key, "secret unset");
        Ok(())
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
