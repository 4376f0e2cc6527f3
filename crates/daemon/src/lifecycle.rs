// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, background passes, shutdown.

use std::fs::File;
use std::io::Write;
use std::time::Instant;

use convoy_adapters::{
    AmqpBroker, BrokerWriterFactory, KubectlClient, QueueError, QueueWriterFactory, RetryPolicy,
    TracedCluster, TracedQueue,
};
use convoy_core::{Clock, SystemClock, UuidIdGen};
use convoy_engine::{ClusterSubstrate, Engine, InFlight, ServiceDeps, Substrate};
use convoy_storage::{MemoryStore, SnapshotError};
use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

/// Queue writer factory used in production (wrapped with tracing)
pub type DaemonQueue = TracedQueue<BrokerWriterFactory<AmqpBroker>>;

/// Substrate with concrete adapter types
pub type DaemonSubstrate = ClusterSubstrate<TracedCluster<KubectlClient>, DaemonQueue>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Message broker unavailable: {0}")]
    Queue(#[from] QueueError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running daemon: the engine plus what it needs to persist and shut down.
pub struct Daemon<Su, Q> {
    pub config: Config,
    pub store: MemoryStore,
    pub engine: Engine<MemoryStore, Su, SystemClock, UuidIdGen>,
    pub start_time: Instant,
    queue: Q,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    lock_file: Option<File>,
}

impl<Su, Q> Daemon<Su, Q>
where
    Su: Substrate,
    Q: QueueWriterFactory,
{
    /// Wire the engine over `store` and `substrate`. Spawns the cleanup
    /// pool, so this must run inside a tokio runtime.
    pub fn new(config: Config, store: MemoryStore, substrate: Su, queue: Q) -> Self {
        let deps = ServiceDeps {
            store: store.clone(),
            substrate,
            clock: SystemClock,
            ids: UuidIdGen,
            inflight: InFlight::new(),
        };
        let engine = Engine::new(deps, &config.engine);
        Self {
            config,
            store,
            engine,
            start_time: Instant::now(),
            queue,
            lock_file: None,
        }
    }

    fn with_lock(mut self, lock_file: File) -> Self {
        self.lock_file = Some(lock_file);
        self
    }

    /// Enqueue the cleanups the store still owes from a previous run.
    pub async fn resume_cleanups(&self) {
        if let Err(e) = self.engine.cleanup.resume(&self.store).await {
            warn!(error = %e, "failed to resume pending cleanups");
        }
    }

    /// Retry dead-lettered cleanups and re-dispatch stranded Workers and
    /// Jobs. Failures are logged; the next pass tries again.
    pub async fn reconcile(&self) {
        let requeued = self.engine.cleanup.reconcile();
        if requeued > 0 {
            info!(requeued, "re-enqueued dead-lettered cleanups");
        }
        if let Err(e) = self.engine.dispatch.reconcile().await {
            warn!(error = %e, "dispatch reconciliation failed");
        }
    }

    /// Write the store snapshot. Failures are logged.
    pub fn checkpoint(&self) {
        match self.store.checkpoint(SystemClock.now()) {
            Ok(()) => tracing::debug!("saved store snapshot"),
            Err(e) => warn!(error = %e, "failed to save store snapshot"),
        }
    }

    /// Stop background work, persist, close the broker connection, and
    /// release the lock.
    pub async fn shutdown(self) {
        info!("Shutting down daemon...");

        // 1. Stop cleanup tasks. Unfinished cleanups stay recorded in the
        //    store and the next daemon resumes them at startup.
        let stopped = self.engine.cleanup.shutdown().await;
        if stopped > 0 {
            info!(stopped, "left cleanups for the next start");
        }

        // 2. Final snapshot
        self.checkpoint();

        // 3. Close the shared broker connection
        if let Err(e) = self.queue.close().await {
            warn!(error = %e, "failed to close message broker connection");
        }

        // 4. Remove PID file; the lock itself is released when the file drops
        if self.lock_file.is_some() && self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
    }
}

/// Start the daemon against the real cluster and broker.
pub async fn startup(
    config: Config,
) -> Result<Daemon<DaemonSubstrate, DaemonQueue>, LifecycleError> {
    // 1. Acquire lock file FIRST so two daemons never share a snapshot
    std::fs::create_dir_all(&config.state_dir)?;
    let lock_file = acquire_lock(&config)?;

    // 2. Load the store
    let store = MemoryStore::open(config.snapshot_path.clone())?;

    // 3. Set up adapters (wrapped with tracing for observability)
    let mut kubectl = KubectlClient::new().with_binary(config.kubectl_binary.clone());
    if let Some(context) = &config.kube_context {
        kubectl = kubectl.with_context(context.clone());
    }
    let cluster = TracedCluster::new(kubectl);

    info!(
        address = %config.amqp.address,
        multiplexed = config.multiplexed,
        "connecting to message broker",
    );
    let queue = TracedQueue::new(
        BrokerWriterFactory::connect(
            AmqpBroker::new(config.amqp.clone()),
            RetryPolicy::from_env(),
            config.multiplexed,
        )
        .await?,
    );

    // 4. Wire the engine and pick up cleanups owed from the last run
    let substrate = ClusterSubstrate::new(cluster, queue.clone(), config.substrate.clone());
    let daemon = Daemon::new(config, store, substrate, queue).with_lock(lock_file);
    daemon.resume_cleanups().await;
    Ok(daemon)
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    // Open without truncating so a running daemon's PID survives a failed attempt.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
