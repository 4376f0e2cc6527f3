// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The assembled engine: services plus background passes

use crate::cleanup::CleanupPool;
use crate::config::EngineConfig;
use crate::reconcile::DispatchReconciler;
use crate::services::{
    EventsService, JobsService, ProjectsService, SecretsService, ServiceDeps, Store,
    WorkersService,
};
use crate::substrate::Substrate;
use convoy_core::{Clock, IdGen};

/// Every service wired to the same store and substrate
pub struct Engine<St, Su, C, I> {
    pub projects: ProjectsService<St, Su, C>,
    pub events: EventsService<St, Su, C, I>,
    pub workers: WorkersService<St, Su>,
    pub jobs: JobsService<St, Su, C>,
    pub secrets: SecretsService<St, Su>,
    pub dispatch: DispatchReconciler<St, Su, C>,
    pub cleanup: CleanupPool,
}

impl<St, Su, C, I> Engine<St, Su, C, I>
where
    St: Store,
    Su: Substrate,
    C: Clock,
    I: IdGen,
{
    /// Build the services and start the cleanup pool. Must run inside a
    /// tokio runtime.
    pub fn new(deps: ServiceDeps<St, Su, C, I>, config: &EngineConfig) -> Self {
        let cleanup = CleanupPool::spawn(
            deps.substrate.clone(),
            deps.store.clone(),
            &config.cleanup,
        );
        Self {
            projects: ProjectsService::new(&deps),
            events: EventsService::new(&deps, cleanup.clone()),
            workers: WorkersService::new(&deps, config.watch_interval),
            jobs: JobsService::new(&deps, config.watch_interval),
            secrets: SecretsService::new(&deps),
            dispatch: DispatchReconciler::new(&deps, config.dispatch_grace),
            cleanup,
        }
    }
}
