// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API-level services
//!
//! Every operation takes the calling [`Principal`](convoy_core::Principal)
//! explicitly and authorizes before touching the store or the substrate.

mod events;
mod jobs;
mod projects;
mod secrets;
mod workers;

pub use events::EventsService;
pub use jobs::JobsService;
pub use projects::ProjectsService;
pub use secrets::SecretsService;
pub use workers::WorkersService;

use crate::inflight::InFlight;
use convoy_core::token::WORKER_TOKEN_LEN;
use convoy_core::{
    hash_token, CleanupsStore, EventsStore, JobsStore, ProjectsStore, WorkersStore,
};

/// Everything the services persist through
pub trait Store: ProjectsStore + EventsStore + WorkersStore + JobsStore + CleanupsStore {}

impl<T> Store for T where
    T: ProjectsStore + EventsStore + WorkersStore + JobsStore + CleanupsStore
{
}

/// Dependencies shared by every service
#[derive(Clone)]
pub struct ServiceDeps<St, Su, C, I> {
    pub store: St,
    pub substrate: Su,
    pub clock: C,
    pub ids: I,
    pub inflight: InFlight,
}

/// Worker tokens are hashed without a salt so they can be looked up by hash.
pub(crate) fn hash_worker_token(token: &str) -> String {
    hash_token("", token)
}

/// A fresh Worker token and the hash that is stored in its place.
pub(crate) fn issue_worker_token() -> (String, String) {
    let token = convoy_core::new_token(WORKER_TOKEN_LEN);
    let hashed = hash_worker_token(&token);
    (token, hashed)
}

#[cfg(test)]
pub(crate) mod test_helpers;
