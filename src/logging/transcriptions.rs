//! `logs/transcriptions.log`: timestamped transcriptions, rotated daily, 7
//! days retained.
//!
//! The teacher doesn't rotate transcription logs at all; this is
//! supplemented from the spec's explicit retention requirement (§6) using
//! `tracing-appender`, a crate already in the dependency graph.

use std::path::Path;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

const RETENTION_DAYS: i64 = 7;

pub struct TranscriptionsLog {
    writer: tracing_appender::non_blocking::NonBlocking,
    _guard: WorkerGuard,
}

impl TranscriptionsLog {
    pub fn open(logs_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        cleanup_old_logs(logs_dir);
        let appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "transcriptions.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Ok(Self {
            writer,
            _guard: guard,
        })
    }

    pub fn record(&self, text: &str) {
        use std::io::Write;
        let stamp = Utc::now().to_rfc3339();
        let mut writer = self.writer.clone();
        if let Err(e) = writeln!(writer, "[{stamp}] {text}") {
            warn!("failed to write transcription log line: {e}");
        }
    }
}

/// Deletes `transcriptions.log.*` rotation files older than the retention
/// window. Run once at startup since `tracing-appender`'s daily rotation
/// doesn't prune on its own.
fn cleanup_old_logs(logs_dir: &Path) {
    let cutoff = Utc::now() - ChronoDuration::days(RETENTION_DAYS);
    let entries = match std::fs::read_dir(logs_dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with("transcriptions.log") {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                let modified: chrono::DateTime<Utc> = modified.into();
                if modified < cutoff {
                    if let Err(e) = std::fs::remove_file(&path) {
                        warn!("failed to remove stale transcription log {:?}: {e}", path);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn cleanup_removes_only_stale_transcription_files() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("transcriptions.log.2020-01-01");
        let fresh = dir.path().join("transcriptions.log.2099-01-01");
        let unrelated = dir.path().join("app.jsonl");
        std::fs::write(&stale, "old").unwrap();
        std::fs::write(&fresh, "new").unwrap();
        std::fs::write(&unrelated, "other").unwrap();

        let old_time = SystemTime::now() - Duration::from_secs(60 * 60 * 24 * 30);
        let file = std::fs::File::open(&stale).unwrap();
        file.set_modified(old_time).unwrap();

        cleanup_old_logs(dir.path());

        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }
}
