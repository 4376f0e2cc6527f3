// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for Convoy

mod memory;
mod snapshot;
mod state;

pub use memory::MemoryStore;
pub use snapshot::{Snapshot, SnapshotError};
pub use state::StoreState;
