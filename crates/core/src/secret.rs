// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project secrets as seen through the services

use serde::{Deserialize, Serialize};

/// Stands in for every value when secrets are listed.
pub const REDACTED: &str = "*** REDACTED ***";

/// One key/value pair handed to a Project's Workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub key: String,
    pub value: String,
}

impl Secret {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn redacted(key: impl Into<String>) -> Self {
        Self::new(key, REDACTED)
    }
}
