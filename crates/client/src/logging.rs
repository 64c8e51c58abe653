//! Logging to stderr and to a per-player file.

use std::path::PathBuf;

use anyhow::Result;
use game_core::Address;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber. Keep the guard alive until exit.
pub fn setup_logging(player: Option<Address>, verbose: bool) -> Result<WorkerGuard> {
    let log_dir = log_directory().join(
        player
            .map(|address| address.to_short_hex())
            .unwrap_or_else(|| "anonymous".to_string()),
    );
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "hexed.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::debug!(dir = %log_dir.display(), "Logging initialized");
    Ok(guard)
}

/// Platform cache directory for logs.
fn log_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "hexed")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("/tmp/hexed/logs"))
}
