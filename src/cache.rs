//! Persistent session ledger
//!
//! The ledger is a single JSON array of [`Session`] records and is the only
//! durable state. Loading is best-effort: a missing or unreadable file is an
//! empty ledger, and invalid entries are dropped one by one. Saving goes
//! through a temporary file that is renamed over the target.

use crate::models::Session;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of reading the ledger from disk.
#[derive(Debug, Default)]
pub struct LoadedLedger {
    pub sessions: Vec<Session>,
    /// Entries skipped because they were missing required fields.
    pub dropped: usize,
}

pub struct LedgerCache {
    path: PathBuf,
}

impl LedgerCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger. Never fails; problems are logged and yield less data.
    pub fn load(&self) -> LoadedLedger {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No ledger yet");
                return LoadedLedger::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ledger unreadable, starting empty");
                return LoadedLedger::default();
            }
        };

        let entries = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!(path = %self.path.display(), "Ledger is not a JSON array, starting empty");
                return LoadedLedger::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ledger is corrupt, starting empty");
                return LoadedLedger::default();
            }
        };

        let total = entries.len();
        let sessions: Vec<Session> = entries.into_iter().filter_map(parse_entry).collect();
        let dropped = total - sessions.len();
        if dropped > 0 {
            warn!(path = %self.path.display(), dropped, "Dropped invalid ledger entries");
        }
        debug!(path = %self.path.display(), sessions = sessions.len(), "Loaded ledger");

        LoadedLedger { sessions, dropped }
    }

    /// Atomically replace the ledger with `sessions`.
    pub fn save(&self, sessions: &[Session]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let written = write_synced(&temp_path, sessions)
            .and_then(|()| {
                fs::rename(&temp_path, &self.path)
                    .with_context(|| format!("Failed to replace {}", self.path.display()))
            });
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temp ledger");
                }
            }
            return Err(e);
        }

        info!(path = %self.path.display(), sessions = sessions.len(), "Ledger saved");
        Ok(())
    }
}

fn parse_entry(entry: Value) -> Option<Session> {
    let session: Session = serde_json::from_value(entry).ok()?;
    let complete = !session.date.is_empty()
        && !session.source.is_empty()
        && !session.file.is_empty()
        && session.cost.is_finite();
    complete.then_some(session)
}

fn write_synced(path: &Path, sessions: &[Session]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, sessions).context("Failed to serialize ledger")?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(|file| file.sync_all())
        .with_context(|| format!("Failed to sync {}", path.display()))
}

/// Union of `fresh` and `cached`, keyed by [`Session::key`]. A fresh session
/// replaces every cached one with the same key; among cached duplicates the
/// first wins. The result is ordered by date, source, then file.
pub fn merge(fresh: Vec<Session>, cached: Vec<Session>) -> Vec<Session> {
    let mut keys: HashSet<String> = fresh.iter().map(Session::key).collect();
    let mut merged = fresh;

    let mut replaced = 0usize;
    for session in cached {
        if keys.insert(session.key()) {
            merged.push(session);
        } else {
            replaced += 1;
        }
    }
    debug!(replaced, merged = merged.len(), "Merged fresh sessions with ledger");

    merged.sort_by(|a, b| {
        (a.date.as_str(), a.source.as_str(), a.file.as_str())
            .cmp(&(b.date.as_str(), b.source.as_str(), b.file.as_str()))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(source: &str, file: &str, date: &str, cost: f64) -> Session {
        Session {
            date: date.to_string(),
            time: "10:00".to_string(),
            source: source.to_string(),
            file: file.to_string(),
            cost,
            input_tokens: 1,
            output_tokens: 1,
            cache_read: 0,
            cache_write: 0,
            model: String::new(),
        }
    }

    #[test]
    fn test_fresh_wins_on_same_key() {
        let fresh = vec![session("codex", "a.jsonl", "2025-01-10", 2.0)];
        let cached = vec![
            session("codex", "a.jsonl", "2025-01-10", 1.0),
            session("codex", "a.jsonl", "2025-01-09", 0.5),
        ];

        let merged = merge(fresh, cached);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].date, "2025-01-09");
        assert_eq!(merged[1].cost, 2.0);
    }

    #[test]
    fn test_cached_duplicates_collapse() {
        let cached = vec![
            session("pi", "s.jsonl", "2025-01-10", 1.0),
            session("pi", "s.jsonl", "2025-01-10", 3.0),
        ];
        let merged = merge(Vec::new(), cached);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].cost, 1.0);
    }

    #[test]
    fn test_missing_ledger_is_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = LedgerCache::new(dir.path().join("sessions.json")).load();
        assert!(loaded.sessions.is_empty());
        assert_eq!(loaded.dropped, 0);
    }

    #[test]
    fn test_non_array_ledger_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, r#"{"not":"an array"}"#).unwrap();
        assert!(LedgerCache::new(&path).load().sessions.is_empty());

        fs::write(&path, "[{\"date\":").unwrap();
        assert!(LedgerCache::new(&path).load().sessions.is_empty());
    }

    #[test]
    fn test_invalid_entries_dropped_individually() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(
            &path,
            r#"[
                {"date":"2025-01-10","source":"codex","file":"a.jsonl","cost":1.5},
                {"date":"2025-01-10","source":"codex","cost":1.5},
                {"date":"2025-01-10","source":"codex","file":"b.jsonl","cost":"lots"},
                42
            ]"#,
        )
        .unwrap();

        let loaded = LedgerCache::new(&path).load();
        assert_eq!(loaded.sessions.len(), 1);
        assert_eq!(loaded.dropped, 3);
        assert_eq!(loaded.sessions[0].time, "00:00");
        assert_eq!(loaded.sessions[0].input_tokens, 0);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let cache = LedgerCache::new(dir.path().join("nested").join("sessions.json"));
        let sessions = vec![session("codex", "a.jsonl", "2025-01-10", 0.5)];

        cache.save(&sessions).unwrap();
        assert!(!dir.path().join("nested").join("sessions.json.tmp").exists());

        let raw = fs::read_to_string(cache.path()).unwrap();
        assert!(raw.contains("\"inputTokens\""));
        assert_eq!(cache.load().sessions, sessions);
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory where the ledger should go makes the rename fail
        let path = dir.path().join("sessions.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let cache = LedgerCache::new(&path);
        let result = cache.save(&[session("codex", "a.jsonl", "2025-01-10", 0.5)]);

        assert!(result.is_err());
        assert!(!dir.path().join("sessions.json.tmp").exists());
        assert!(path.is_dir());
    }
}
