// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pool that tears down substrate objects for canceled and deleted
//! Events
//!
//! Requests never wait on cleanup: enqueueing is non-blocking, failures are
//! logged, and anything that cannot be completed lands on a dead-letter list
//! that [`CleanupPool::reconcile`] drains back into the queue. The store keeps
//! its own record of owed cleanups, so work lost with the process is picked
//! up again by [`CleanupPool::resume`].

use crate::config::CleanupConfig;
use crate::substrate::Substrate;
use convoy_core::{CleanupsStore, Event, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Why an Event ended up on the dead-letter list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadReason {
    /// The queue was full when the cleanup was requested.
    QueueFull,
    /// Every attempt failed.
    Exhausted,
    /// The drain tasks were shut down.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub event: Event,
    pub reason: DeadReason,
}

type Queue = Arc<tokio::sync::Mutex<mpsc::Receiver<Event>>>;

/// Handle to the cleanup tasks. Clones share the same queue.
#[derive(Clone)]
pub struct CleanupPool {
    tx: mpsc::Sender<Event>,
    rx: Queue,
    dead: Arc<Mutex<Vec<DeadLetter>>>,
    /// Events a drain task has taken off the queue, by task.
    active: Arc<Mutex<BTreeMap<usize, Event>>>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl CleanupPool {
    /// Start `config.workers` drain tasks on the current runtime. Finished
    /// cleanups are cleared from `store`.
    pub fn spawn<Su, St>(substrate: Su, store: St, config: &CleanupConfig) -> Self
    where
        Su: Substrate,
        St: CleanupsStore,
    {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let dead = Arc::new(Mutex::new(Vec::new()));
        let active = Arc::new(Mutex::new(BTreeMap::new()));

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let drain = Drain {
                    substrate: substrate.clone(),
                    store: store.clone(),
                    rx: Arc::clone(&rx),
                    dead: Arc::clone(&dead),
                    active: Arc::clone(&active),
                    attempts: config.attempts.max(1),
                    backoff: config.backoff,
                };
                tokio::spawn(drain.run(worker))
            })
            .collect();

        Self {
            tx,
            rx,
            dead,
            active,
            workers: Arc::new(Mutex::new(workers)),
        }
    }

    /// Queue substrate cleanup for `event` without waiting.
    pub fn enqueue(&self, event: Event) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(event_id = %event.id, "cleanup queue full, deferring");
                self.bury(event, DeadReason::QueueFull);
            }
            Err(TrySendError::Closed(event)) => {
                tracing::error!(event_id = %event.id, "cleanup pool stopped, deferring");
                self.bury(event, DeadReason::Stopped);
            }
        }
    }

    fn bury(&self, event: Event, reason: DeadReason) {
        self.dead.lock().push(DeadLetter { event, reason });
    }

    /// Snapshot of the dead-letter list.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead.lock().clone()
    }

    /// Move dead letters back onto the queue. Returns how many were
    /// re-enqueued; the rest stay dead until the next pass.
    pub fn reconcile(&self) -> usize {
        let letters = std::mem::take(&mut *self.dead.lock());
        if letters.is_empty() {
            return 0;
        }
        let total = letters.len();
        let mut requeued = 0;
        for letter in letters {
            match self.tx.try_send(letter.event) {
                Ok(()) => requeued += 1,
                Err(TrySendError::Full(event)) | Err(TrySendError::Closed(event)) => {
                    self.bury(event, letter.reason);
                }
            }
        }
        tracing::info!(requeued, total, "cleanup dead letters reconciled");
        requeued
    }

    /// Enqueue every cleanup `store` still owes, typically once at startup.
    /// Returns how many were found.
    pub async fn resume<St: CleanupsStore>(&self, store: &St) -> Result<usize> {
        let owed = store.pending_cleanups().await?;
        let total = owed.len();
        for event in owed {
            self.enqueue(event);
        }
        if total > 0 {
            tracing::info!(total, "resumed pending cleanups");
        }
        Ok(total)
    }

    /// Stop the drain tasks and close the queue. Cleanups that were queued
    /// or in progress become [`DeadReason::Stopped`] dead letters; their
    /// store records stay put for [`CleanupPool::resume`]. Returns how many
    /// were stopped.
    pub async fn shutdown(&self) -> usize {
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in &workers {
            worker.abort();
        }
        for worker in workers {
            let _ = worker.await;
        }

        let mut stopped: Vec<Event> = std::mem::take(&mut *self.active.lock())
            .into_values()
            .collect();
        {
            let mut rx = self.rx.lock().await;
            rx.close();
            while let Ok(event) = rx.try_recv() {
                stopped.push(event);
            }
        }

        let count = stopped.len();
        for event in stopped {
            self.bury(event, DeadReason::Stopped);
        }
        if count > 0 {
            tracing::warn!(count, "cleanup pool stopped with work outstanding");
        }
        count
    }
}

struct Drain<Su, St> {
    substrate: Su,
    store: St,
    rx: Queue,
    dead: Arc<Mutex<Vec<DeadLetter>>>,
    active: Arc<Mutex<BTreeMap<usize, Event>>>,
    attempts: u32,
    backoff: std::time::Duration,
}

impl<Su: Substrate, St: CleanupsStore> Drain<Su, St> {
    async fn run(self, worker: usize) {
        loop {
            let next = self.rx.lock().await.recv().await;
            let Some(event) = next else {
                break;
            };
            self.active.lock().insert(worker, event.clone());
            let cleaned = self.clean(&event).await;
            self.active.lock().remove(&worker);

            if cleaned {
                if let Err(e) = self.store.complete_cleanup(event.id.as_str()).await {
                    tracing::warn!(
                        event_id = %event.id,
                        error = %e,
                        "failed to clear cleanup record",
                    );
                }
            } else {
                self.dead.lock().push(DeadLetter {
                    event,
                    reason: DeadReason::Exhausted,
                });
            }
        }
        tracing::debug!(worker, "cleanup worker exiting");
    }

    async fn clean(&self, event: &Event) -> bool {
        for attempt in 1..=self.attempts {
            match self.substrate.delete_worker_and_jobs(event).await {
                Ok(()) => {
                    tracing::info!(event_id = %event.id, attempt, "cleaned up worker and jobs");
                    return true;
                }
                Err(e) if attempt < self.attempts => {
                    tracing::warn!(
                        event_id = %event.id,
                        attempt,
                        error = %e,
                        "cleanup failed, retrying",
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => {
                    tracing::error!(
                        event_id = %event.id,
                        attempts = self.attempts,
                        error = %e,
                        "cleanup gave up",
                    );
                }
            }
        }
        false
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
