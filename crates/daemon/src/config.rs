// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: an optional TOML file overlaid by `CONVOY_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use convoy_adapters::AmqpSettings;
use convoy_engine::{CleanupConfig, ClusterSubstrateConfig, EngineConfig};
use serde::Deserialize;

use crate::env;
use crate::lifecycle::LifecycleError;

const DEFAULT_AMQP_ADDRESS: &str = "amqp://localhost:5672/%2f";
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Layout of the TOML file named by `CONVOY_CONFIG`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    state_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    reconcile_interval_ms: Option<u64>,
    checkpoint_interval_ms: Option<u64>,
    amqp: AmqpSection,
    kubectl: KubectlSection,
    substrate: ClusterSubstrateConfig,
    engine: EngineSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AmqpSection {
    address: Option<String>,
    username: Option<String>,
    password: Option<String>,
    multiplexed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct KubectlSection {
    binary: Option<String>,
    context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineSection {
    watch_interval_ms: Option<u64>,
    dispatch_grace_ms: Option<u64>,
    cleanup_workers: Option<usize>,
    cleanup_queue_depth: Option<usize>,
    cleanup_attempts: Option<u32>,
    cleanup_backoff_ms: Option<u64>,
}

/// Resolved daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/convoy)
    pub state_dir: PathBuf,
    /// Lock/PID file
    pub lock_path: PathBuf,
    /// Store snapshot
    pub snapshot_path: PathBuf,
    /// Log file; logs go to stdout when unset.
    pub log_path: Option<PathBuf>,
    pub amqp: AmqpSettings,
    /// Split queue names into base queue and message group.
    pub multiplexed: bool,
    pub kubectl_binary: String,
    pub kube_context: Option<String>,
    pub substrate: ClusterSubstrateConfig,
    pub engine: EngineConfig,
    /// Period of the cleanup and dispatch reconciliation passes.
    pub reconcile_interval: Duration,
    pub checkpoint_interval: Duration,
}

fn millis(ms: Option<u64>) -> Option<Duration> {
    ms.map(Duration::from_millis)
}

impl Config {
    /// Load from `CONVOY_CONFIG` (if set) and the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let file = match env::config_file() {
            Some(path) => read_file(&path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file)
    }

    fn resolve(file: FileConfig) -> Result<Self, LifecycleError> {
        let state_dir = match env::string("CONVOY_STATE_DIR").map(PathBuf::from) {
            Some(dir) => dir,
            None => match file.state_dir {
                Some(dir) => dir,
                None => env::state_dir()?,
            },
        };
        let log_dir = env::string("CONVOY_LOG_DIR")
            .map(PathBuf::from)
            .or(file.log_dir);

        let amqp = AmqpSettings {
            address: env::string("CONVOY_AMQP_ADDRESS")
                .or(file.amqp.address)
                .unwrap_or_else(|| DEFAULT_AMQP_ADDRESS.to_string()),
            username: env::string("CONVOY_AMQP_USERNAME")
                .or(file.amqp.username)
                .unwrap_or_default(),
            password: env::string("CONVOY_AMQP_PASSWORD")
                .or(file.amqp.password)
                .unwrap_or_default(),
        };

        let mut substrate = file.substrate;
        let overrides = [
            ("CONVOY_API_ADDRESS", &mut substrate.api_address),
            ("CONVOY_DEFAULT_WORKER_IMAGE", &mut substrate.default_worker_image),
            (
                "CONVOY_DEFAULT_WORKER_IMAGE_PULL_POLICY",
                &mut substrate.default_worker_image_pull_policy,
            ),
            (
                "CONVOY_WORKSPACE_STORAGE_CLASS",
                &mut substrate.workspace_storage_class,
            ),
            ("CONVOY_GIT_INITIALIZER_IMAGE", &mut substrate.git_initializer_image),
            (
                "CONVOY_GIT_INITIALIZER_IMAGE_PULL_POLICY",
                &mut substrate.git_initializer_image_pull_policy,
            ),
        ];
        for (name, field) in overrides {
            if let Some(value) = env::string(name) {
                *field = value;
            }
        }

        let defaults = EngineConfig::default();
        let section = file.engine;
        let engine = EngineConfig {
            watch_interval: env::millis("CONVOY_WATCH_INTERVAL_MS")
                .or(millis(section.watch_interval_ms))
                .unwrap_or(defaults.watch_interval),
            dispatch_grace: env::millis("CONVOY_DISPATCH_GRACE_MS")
                .or(millis(section.dispatch_grace_ms))
                .unwrap_or(defaults.dispatch_grace),
            cleanup: CleanupConfig {
                workers: env::parsed("CONVOY_CLEANUP_WORKERS")
                    .or(section.cleanup_workers)
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.cleanup.workers),
                queue_depth: env::parsed("CONVOY_CLEANUP_QUEUE_DEPTH")
                    .or(section.cleanup_queue_depth)
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.cleanup.queue_depth),
                attempts: env::parsed("CONVOY_CLEANUP_ATTEMPTS")
                    .or(section.cleanup_attempts)
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.cleanup.attempts),
                backoff: env::millis("CONVOY_CLEANUP_BACKOFF_MS")
                    .or(millis(section.cleanup_backoff_ms))
                    .unwrap_or(defaults.cleanup.backoff),
            },
        };

        Ok(Self {
            lock_path: state_dir.join("convoyd.pid"),
            snapshot_path: state_dir.join("store.json"),
            log_path: log_dir.map(|dir| dir.join("convoyd.log")),
            amqp,
            multiplexed: env::flag("CONVOY_AMQP_MULTIPLEXED")
                .or(file.amqp.multiplexed)
                .unwrap_or(false),
            kubectl_binary: env::string("CONVOY_KUBECTL")
                .or(file.kubectl.binary)
                .unwrap_or_else(|| "kubectl".to_string()),
            kube_context: env::string("CONVOY_KUBE_CONTEXT").or(file.kubectl.context),
            substrate,
            engine,
            reconcile_interval: env::millis("CONVOY_RECONCILE_INTERVAL_MS")
                .or(millis(file.reconcile_interval_ms))
                .filter(|d| !d.is_zero())
                .unwrap_or(DEFAULT_RECONCILE_INTERVAL),
            checkpoint_interval: env::millis("CONVOY_CHECKPOINT_INTERVAL_MS")
                .or(millis(file.checkpoint_interval_ms))
                .filter(|d| !d.is_zero())
                .unwrap_or(DEFAULT_CHECKPOINT_INTERVAL),
            state_dir,
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig, LifecycleError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| LifecycleError::Config(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&raw).map_err(|e| LifecycleError::Config(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
