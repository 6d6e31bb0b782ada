//! Log setup: file output under the configured logs directory.
//!
//! The level comes from the config (overridable with `RUST_LOG`); log
//! files are named by epoch second and the oldest beyond `max_log_files`
//! are pruned at startup. Terminal output would fight the TUI, so
//! everything goes to the file.

use std::fs::{self, File};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use pedalera_config::LoggerConfig;
use tracing_subscriber::EnvFilter;

pub fn init(cfg: &LoggerConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&cfg.logs_dir)
        .with_context(|| format!("creating logs directory {}", cfg.logs_dir.display()))?;

    prune_old_logs(cfg);

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = cfg.logs_dir.join(format!("pedalera-{stamp}.log"));
    let file = File::create(&path)
        .with_context(|| format!("creating log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();

    tracing::info!(path = %path.display(), "logging to file");
    Ok(())
}

/// Delete the oldest log files so at most `max_log_files - 1` remain
/// before the new file is created.
fn prune_old_logs(cfg: &LoggerConfig) {
    if cfg.max_log_files == 0 {
        return;
    }

    let Ok(entries) = fs::read_dir(&cfg.logs_dir) else {
        return;
    };

    let mut logs: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().and_then(|e| e.to_str()) == Some("log")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("pedalera-"))
        })
        .collect();

    if logs.len() < cfg.max_log_files {
        return;
    }

    // Epoch-stamped names sort chronologically.
    logs.sort();
    let excess = logs.len() + 1 - cfg.max_log_files;
    for path in logs.into_iter().take(excess) {
        if let Err(error) = fs::remove_file(&path) {
            eprintln!("failed to prune log {}: {error}", path.display());
        }
    }
}
