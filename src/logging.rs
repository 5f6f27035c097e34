//! Structured logging for emovox using the tracing crate.
//!
//! Logs go to daily-rotated files under the XDG state directory, never to the
//! terminal, so the session screen is left alone. Only the 7 most recent log
//! files are kept.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// File name prefix of every log file.
pub const LOG_FILE_PREFIX: &str = "emovox.log";

const MAX_LOG_FILES: usize = 7;

/// Keeps the non-blocking writer alive for the whole program.
static APPENDER_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes file logging. `RUST_LOG` sets the level (default `info`).
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> Result<(), anyhow::Error> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    if let Err(e) = cleanup_old_logs(&log_dir) {
        eprintln!("Warning: Failed to cleanup old logs: {}", e);
    }

    let (non_blocking, guard) =
        tracing_appender::non_blocking(rolling::daily(&log_dir, LOG_FILE_PREFIX));
    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging initialized. Log directory: {}", log_dir.display());
    Ok(())
}

/// Log directory: `$XDG_STATE_HOME/emovox`, else `~/.local/state/emovox`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn log_dir() -> Result<PathBuf, anyhow::Error> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg_state).join("emovox"));
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".local/state/emovox"))
}

/// Log files in `log_dir` (`emovox.log.YYYY-MM-DD`), newest first.
pub fn rotated_logs(log_dir: &Path) -> Result<Vec<PathBuf>, anyhow::Error> {
    let mut files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let name = path.file_name()?.to_string_lossy().to_string();
            if !name.starts_with(LOG_FILE_PREFIX) {
                return None;
            }
            let modified = fs::metadata(&path).ok()?.modified().ok()?;
            Some((path, name, modified))
        })
        .collect();

    // Newest first; file names break ties since the date is in the suffix.
    files.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.1.cmp(&a.1)));
    Ok(files.into_iter().map(|(path, _, _)| path).collect())
}

/// Removes every rotated log file beyond the newest [`MAX_LOG_FILES`].
fn cleanup_old_logs(log_dir: &Path) -> Result<(), anyhow::Error> {
    for path in rotated_logs(log_dir)?.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to delete old log file {}: {}", path.display(), e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_newest_logs() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=9 {
            let path = dir.path().join(format!("{LOG_FILE_PREFIX}.2026-01-0{day}"));
            fs::write(path, "line").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "keep").unwrap();

        cleanup_old_logs(dir.path()).unwrap();

        let remaining = rotated_logs(dir.path()).unwrap();
        assert_eq!(remaining.len(), MAX_LOG_FILES);
        assert!(dir.path().join("unrelated.txt").exists());
    }
}
