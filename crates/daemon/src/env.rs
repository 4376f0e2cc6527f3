// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: CONVOY_STATE_DIR > XDG_STATE_HOME/convoy > ~/.local/state/convoy
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = string("CONVOY_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = string("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("convoy"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/convoy"))
}

/// TOML file layered under the environment
pub fn config_file() -> Option<PathBuf> {
    string("CONVOY_CONFIG").map(PathBuf::from)
}

/// A non-empty variable.
pub fn string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// A variable parsed as `T`. Unparseable values are ignored with a warning
/// on stderr, since logging is not up yet when configuration loads.
pub fn parsed<T: FromStr>(name: &str) -> Option<T> {
    let raw = string(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("warning: ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

pub fn millis(name: &str) -> Option<Duration> {
    parsed::<u64>(name).map(Duration::from_millis)
}

/// Accepts `true`/`false` as well as `1`/`0`.
pub fn flag(name: &str) -> Option<bool> {
    match string(name)?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        other => {
            eprintln!("warning: ignoring {}={:?}: not a boolean", name, other);
            None
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
