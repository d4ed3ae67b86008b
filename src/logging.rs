//! Diagnostics go to `~/.claude/statusline-error.log` as JSON lines, never to
//! stdout, which belongs to the status line.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::utils::error_log_path;

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored. Falls back to discarding output when the log is unwritable.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    match error_log_path() {
        Some(path) => init_with_file(&path, level),
        None => init_sink(level),
    }
}

fn init_with_file(path: &Path, level: &str) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .json()
                .with_env_filter(EnvFilter::new(level))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(_) => init_sink(level),
    }
}

fn init_sink(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::sink)
        .try_init();
}
