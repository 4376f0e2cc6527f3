// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Roles, principals, and the authorization check every service runs first
//!
//! Authentication happens outside this crate. Services receive an already
//! resolved [`Principal`] as an explicit argument and call [`authorize`]
//! with the roles the operation requires.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Scope value that matches every scope
pub const SCOPE_GLOBAL: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    Admin,
    EventCreator,
    ProjectAdmin,
    ProjectCreator,
    ProjectDeveloper,
    ProjectUser,
    Reader,
    // Reserved for system components
    Observer,
    Scheduler,
    Worker,
}

/// A named capability, optionally narrowed to a scope (project, source, event)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub name: RoleName,
    #[serde(default)]
    pub scope: String,
}

impl Role {
    fn new(name: RoleName, scope: impl Into<String>) -> Self {
        Self {
            name,
            scope: scope.into(),
        }
    }

    pub fn admin() -> Self {
        Self::new(RoleName::Admin, "")
    }

    pub fn event_creator(source: &str) -> Self {
        Self::new(RoleName::EventCreator, source)
    }

    pub fn project_admin(project_id: &str) -> Self {
        Self::new(RoleName::ProjectAdmin, project_id)
    }

    pub fn project_creator() -> Self {
        Self::new(RoleName::ProjectCreator, "")
    }

    pub fn project_developer(project_id: &str) -> Self {
        Self::new(RoleName::ProjectDeveloper, project_id)
    }

    pub fn project_user(project_id: &str) -> Self {
        Self::new(RoleName::ProjectUser, project_id)
    }

    pub fn reader() -> Self {
        Self::new(RoleName::Reader, "")
    }

    pub fn observer() -> Self {
        Self::new(RoleName::Observer, "")
    }

    pub fn scheduler() -> Self {
        Self::new(RoleName::Scheduler, "")
    }

    pub fn worker(event_id: &str) -> Self {
        Self::new(RoleName::Worker, event_id)
    }

    /// Widen this role to every scope.
    pub fn global(mut self) -> Self {
        self.scope = SCOPE_GLOBAL.to_string();
        self
    }

    /// Whether holding `self` satisfies a requirement for `required`.
    pub fn grants(&self, required: &Role) -> bool {
        self.name == required.name && (self.scope == SCOPE_GLOBAL || self.scope == required.scope)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    User,
    ServiceAccount,
    Scheduler,
    Observer,
    Worker,
    Root,
}

/// The authenticated caller of a service operation
#[derive(Debug, Clone)]
pub struct Principal {
    pub kind: PrincipalKind,
    pub id: String,
    roles: Vec<Role>,
}

impl Principal {
    pub fn user(id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            kind: PrincipalKind::User,
            id: id.into(),
            roles,
        }
    }

    pub fn service_account(id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            kind: PrincipalKind::ServiceAccount,
            id: id.into(),
            roles,
        }
    }

    /// The component that launches queued Workers and Jobs.
    pub fn scheduler() -> Self {
        Self {
            kind: PrincipalKind::Scheduler,
            id: "scheduler".to_string(),
            roles: vec![Role::scheduler(), Role::reader()],
        }
    }

    /// The component that watches the substrate and reports status.
    pub fn observer() -> Self {
        Self {
            kind: PrincipalKind::Observer,
            id: "observer".to_string(),
            roles: vec![Role::observer(), Role::reader()],
        }
    }

    /// A running Worker, identified by its Event.
    pub fn worker(event_id: &str) -> Self {
        Self {
            kind: PrincipalKind::Worker,
            id: event_id.to_string(),
            roles: vec![Role::worker(event_id), Role::reader()],
        }
    }

    /// Holds every role. Used for internal maintenance passes.
    pub fn root() -> Self {
        Self {
            kind: PrincipalKind::Root,
            id: "root".to_string(),
            roles: Vec::new(),
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn has(&self, required: &Role) -> bool {
        self.kind == PrincipalKind::Root || self.roles.iter().any(|r| r.grants(required))
    }
}

/// Succeeds only when the principal holds every one of `required`.
pub fn authorize(principal: &Principal, required: &[Role]) -> Result<(), Error> {
    match required.iter().find(|role| !principal.has(role)) {
        None => Ok(()),
        Some(missing) => Err(Error::unauthorized(format!(
            "principal {:?} lacks role {:?} in scope {:?}",
            principal.id, missing.name, missing.scope
        ))),
    }
}

#[cfg(test)]
#[path = "authx_tests.rs"]
mod tests;
