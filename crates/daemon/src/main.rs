// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Convoy Daemon (convoyd)
//!
//! Owns the engine and runs its background passes.
//!
//! Architecture:
//! - Cleanup pool: spawned tasks draining substrate cleanup requests
//! - Main loop: periodic reconciliation and store checkpoints until a signal

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod lifecycle;

use std::path::Path;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::config::Config;
use crate::lifecycle::LifecycleError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rotate the log once it grows past this many bytes.
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated files kept as `<log>.1` through `<log>.N`.
const MAX_ROTATIONS: u32 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("convoyd {VERSION}");
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("convoyd {VERSION}");
                println!("Convoy Daemon - dispatches Workers and Jobs for incoming events");
                println!();
                println!("USAGE:");
                println!("    convoyd");
                println!();
                println!("Configuration is read from the TOML file named by CONVOY_CONFIG,");
                println!("overridden by CONVOY_* environment variables.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: convoyd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    if let Some(log_path) = &config.log_path {
        rotate_log_if_needed(log_path);
    }
    let log_guard = setup_logging(&config)?;

    info!(version = VERSION, "Starting convoyd");

    let daemon = match lifecycle::startup(config.clone()).await {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("convoyd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // NOTE: Intervals must be created outside the loop; select! re-evaluates
    // its branches on every iteration.
    let mut reconcile = tokio::time::interval(config.reconcile_interval);
    let mut checkpoint = tokio::time::interval(config.checkpoint_interval);
    // The first tick of an interval completes immediately.
    checkpoint.tick().await;

    info!(
        state_dir = %config.state_dir.display(),
        "Daemon ready"
    );
    println!("READY");

    loop {
        tokio::select! {
            _ = reconcile.tick() => daemon.reconcile().await,

            _ = checkpoint.tick() => daemon.checkpoint(),

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    let uptime = daemon.start_time.elapsed();
    daemon.shutdown().await;
    info!(uptime_secs = uptime.as_secs(), "Daemon stopped");
    Ok(())
}

/// Shift `<log>.N` up by one and move an oversized log to `<log>.1`. The
/// oldest rotation falls off. Errors are ignored; logging is not up yet.
fn rotate_log_if_needed(log_path: &Path) {
    let Ok(meta) = std::fs::metadata(log_path) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }

    let rotation = |n: u32| {
        let mut name = log_path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        std::path::PathBuf::from(name)
    };
    let _ = std::fs::remove_file(rotation(MAX_ROTATIONS));
    for n in (1..MAX_ROTATIONS).rev() {
        let from = rotation(n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotation(n + 1));
        }
    }
    let _ = std::fs::rename(log_path, rotation(1));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = match &config.log_path {
        Some(log_path) => {
            let dir = log_path
                .parent()
                .ok_or_else(|| LifecycleError::Config("log path has no directory".to_string()))?;
            std::fs::create_dir_all(dir)?;
            let file_name = log_path
                .file_name()
                .ok_or_else(|| LifecycleError::Config("log path has no file name".to_string()))?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
