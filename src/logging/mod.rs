//! Structured logging setup.
//!
//! `logs/app.jsonl` is a `tracing_subscriber` JSON layer over a
//! `tracing-appender` rolling-never non-blocking file writer, grounded on
//! `voice-core::main`'s tracing init — including its fallback to stderr if
//! the log directory can't be created.

pub mod performance;
pub mod transcriptions;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Must be kept alive for the lifetime of the process — dropping it stops
/// the non-blocking writer's background flush thread.
pub struct LoggingGuard {
    _app_log_guard: Option<WorkerGuard>,
}

pub fn init(logs_dir: &Path) -> LoggingGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match std::fs::create_dir_all(logs_dir) {
        Ok(()) => {
            let appender = RollingFileAppender::new(Rotation::NEVER, logs_dir, "app.jsonl");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .finish();
            if tracing::subscriber::set_global_default(subscriber).is_err() {
                eprintln!("tracing subscriber already set");
            }
            LoggingGuard {
                _app_log_guard: Some(guard),
            }
        }
        Err(e) => {
            eprintln!("failed to create log directory {:?}: {e} — logging to stderr", logs_dir);
            let subscriber = tracing_subscriber::fmt().json().with_env_filter(filter).finish();
            if tracing::subscriber::set_global_default(subscriber).is_err() {
                eprintln!("tracing subscriber already set");
            }
            LoggingGuard {
                _app_log_guard: None,
            }
        }
    }
}
