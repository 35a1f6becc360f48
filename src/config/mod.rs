//! Filesystem layout per spec §6: `models/`, `config/`, `logs/` under the
//! platform data directory. Grounded on `voice-core::config`'s tolerant
//! reads (missing or malformed files fall back to defaults rather than
//! erroring).

pub mod paths;

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ResourceError;
use paths::get_data_dir;

const DEFAULT_PERSONA: &str = "You are a helpful voice assistant.";

pub fn models_dir() -> PathBuf {
    get_data_dir().join("models")
}

pub fn config_dir() -> PathBuf {
    get_data_dir().join("config")
}

pub fn logs_dir() -> PathBuf {
    get_data_dir().join("logs")
}

pub fn sounds_dir() -> PathBuf {
    config_dir().join("sounds")
}

/// `models/<wakeword>.onnx` — missing is fatal (§6).
pub fn wakeword_model_path(wakeword: &str) -> Result<PathBuf, ResourceError> {
    let path = models_dir().join(format!("{wakeword}.onnx"));
    if !path.exists() {
        return Err(ResourceError::Missing { path });
    }
    Ok(path)
}

/// `config/sounds/kwd_success.wav` — non-fatal if missing.
pub fn kwd_success_chime_path() -> Option<PathBuf> {
    let path = sounds_dir().join("kwd_success.wav");
    path.exists().then_some(path)
}

/// `config/system_prompt.txt` — missing is non-fatal (default substituted).
pub fn read_system_prompt() -> String {
    let path = config_dir().join("system_prompt.txt");
    match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to read {:?}: {e}", path);
            }
            DEFAULT_PERSONA.to_string()
        }
    }
}

/// `config/memory.log` — newline-delimited entries, empty lines ignored;
/// missing file is auto-created as empty.
pub fn read_memory_log() -> Vec<String> {
    let path = config_dir().join("memory.log");
    match std::fs::read_to_string(&path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                let _ = std::fs::File::create(&path);
            } else {
                warn!("failed to read {:?}: {e}", path);
            }
            Vec::new()
        }
    }
}

/// Never deduplicated — appending the same entry twice yields two lines
/// (§8 testable property).
pub fn append_memory_entry(entry: &str) -> std::io::Result<()> {
    let path = config_dir().join("memory.log");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{entry}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub timestamp: String,
}

/// `config/notes.json` — JSON array of `{text, timestamp}`.
pub fn read_notes() -> Vec<Note> {
    read_json_file(&config_dir().join("notes.json")).unwrap_or_default()
}

pub fn append_note(text: &str) -> std::io::Result<()> {
    let mut notes = read_notes();
    notes.push(Note {
        text: text.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    });
    write_json_file_atomic(&config_dir().join("notes.json"), &notes)
}

/// `config/llm_responses.json` — canned-string keys to `{name}`-templated
/// values.
pub fn read_llm_responses() -> HashMap<String, String> {
    read_json_file(&config_dir().join("llm_responses.json")).unwrap_or_default()
}

pub fn render_response_template(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("failed to parse {:?}: {e}", path);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to read {:?}: {e}", path);
            }
            None
        }
    }
}

/// Atomic write-via-temp-file-then-rename, grounded on
/// `voice-core::inbox::InboxManager::write_inbox`.
fn write_json_file_atomic<T: Serialize>(path: &PathBuf, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(&tmp_path, body)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_template_substitutes_name() {
        let rendered = render_response_template("Hi {name}, got it.", "Sam");
        assert_eq!(rendered, "Hi Sam, got it.");
    }
}
