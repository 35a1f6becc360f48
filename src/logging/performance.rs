//! `logs/performance.jsonl`: one JSON record per latency checkpoint named
//! in §4.7 (`wake_to_transcription_start`,
//! `transcription_end_to_first_tts_chunk_request`, `llm_first_token_elapsed`,
//! plus the `turn_total` diagnostic this implementation also records).
//!
//! Appends are serialized behind a mutex-guarded file handle opened in
//! append mode — writes are small and infrequent enough that buffered
//! append is sufficient; the atomic temp-file-then-rename discipline cited
//! in SPEC_FULL applies instead to whole-file config rewrites
//! (`config/notes.json`), not this continuously-growing log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct Record<'a> {
    timestamp: String,
    event: &'a str,
    duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

pub struct PerformanceLog {
    file: Mutex<File>,
}

impl PerformanceLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub fn record(&self, event: &str, duration: Duration, context: Option<String>) {
        let record = Record {
            timestamp: Utc::now().to_rfc3339(),
            event,
            duration_ms: duration.as_millis(),
            context,
        };
        let line = match serde_json::to_string(&record) {
            Ok(l) => l,
            Err(e) => {
                warn!("failed to serialize performance record: {e}");
                return;
            }
        };
        let mut guard = self.file.lock().expect("performance log mutex poisoned");
        if let Err(e) = writeln!(guard, "{line}") {
            warn!("failed to write performance record: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("performance.jsonl");
        let log = PerformanceLog::open(&path).unwrap();
        log.record("wake_to_transcription_start", Duration::from_millis(120), None);
        log.record(
            "llm_first_token_elapsed",
            Duration::from_millis(340),
            Some("tokens=12".into()),
        );
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "wake_to_transcription_start");
        assert_eq!(first["duration_ms"], 120);
    }
}
