//! Session: persona prefix, mutable memory list, bounded turn history, and
//! the per-session dialog log.

use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;

/// Last N turns of history retained.
const HISTORY_CAP: usize = 16;

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: String,
    pub text: String,
}

pub struct Session {
    pub persona: String,
    pub memory: Vec<String>,
    history: VecDeque<Turn>,
    dialog_log_path: PathBuf,
    /// Diagnostic-only turn counter for log correlation; not a spec
    /// invariant.
    turn_counter: u64,
}

impl Session {
    pub fn new(persona: String, logs_dir: &std::path::Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let dialog_log_path = logs_dir.join(format!("dialog_{timestamp}.log"));
        std::fs::File::create(&dialog_log_path)?;
        Ok(Self {
            persona,
            memory: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_CAP),
            dialog_log_path,
            turn_counter: 0,
        })
    }

    pub fn push_turn(&mut self, role: &str, text: &str) {
        if self.history.len() >= HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(Turn {
            role: role.to_string(),
            text: text.to_string(),
        });
        self.turn_counter += 1;
        self.append_dialog_log(role, text);
    }

    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }

    pub fn turn_counter(&self) -> u64 {
        self.turn_counter
    }

    /// `[DD-MM-HH-MM-SS] ROLE: text` lines, per spec §6.
    fn append_dialog_log(&self, role: &str, text: &str) {
        let stamp = Local::now().format("%d-%m-%H-%M-%S");
        let line = format!("[{stamp}] {}: {text}\n", role.to_uppercase());
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.dialog_log_path)
        {
            let _ = file.write_all(line.as_bytes());
        }
    }

    /// Add the same memory entry — never deduplicated (§8 testable property).
    pub fn remember(&mut self, entry: String) {
        self.memory.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_history_caps_at_sixteen() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new("default".into(), dir.path()).unwrap();
        for i in 0..20 {
            session.push_turn("user", &format!("turn {i}"));
        }
        assert_eq!(session.history().count(), 16);
        assert_eq!(session.history().next().unwrap().text, "turn 4");
    }

    #[test]
    fn memory_entries_are_not_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new("default".into(), dir.path()).unwrap();
        session.remember("buy milk".into());
        session.remember("buy milk".into());
        assert_eq!(session.memory.len(), 2);
    }
}
