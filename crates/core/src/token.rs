// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer token generation and one-way hashing

use rand::distr::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a Worker's one-time bearer token
pub const WORKER_TOKEN_LEN: usize = 256;

/// A random alphanumeric token of `len` characters.
pub fn new_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Hex-encoded SHA-256 of `salt` followed by `token`.
///
/// Only this hash is ever persisted; the token itself is handed to the
/// caller once and forgotten.
pub fn hash_token(salt: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
