// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling status streams
//!
//! Each subscriber owns one task that re-reads the store on a fixed timer.
//! Dropping the stream stops the task.

use convoy_core::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;

/// Lazy sequence of status snapshots
pub type StatusStream<T> = ReceiverStream<T>;

/// Call `poll` every `period` and forward what it returns.
///
/// The first snapshot arrives one period after subscribing. A failed poll
/// is logged and ends the stream.
pub(crate) fn poll_every<T, F, Fut>(period: Duration, what: String, mut poll: F) -> StatusStream<T>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send,
{
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                _ = ticker.tick() => {}
            }
            match poll().await {
                Ok(snapshot) => {
                    if tx.send(snapshot).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(watch = %what, error = %e, "status watch ended");
                    break;
                }
            }
        }
        tracing::debug!(watch = %what, "status watch stopped");
    });
    ReceiverStream::new(rx)
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
