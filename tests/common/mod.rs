#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use usage_ledger::config::{Config, FileLabel, SourceConfig};
use usage_ledger::parser::SourceFormat;

pub fn create_test_jsonl(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub fn source(name: &str, format: SourceFormat, dir: &Path) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        format,
        dirs: vec![dir.to_string_lossy().into_owned()],
        patterns: vec!["*.jsonl".to_string()],
        file_label: FileLabel::Basename,
    }
}

/// A config rooted in `root` with UTC bucketing and no built-in sources.
pub fn test_config(root: &TempDir, sources: Vec<SourceConfig>) -> Config {
    let mut config = Config::default();
    config.scan.utc_offset = Some("+00:00".to_string());
    config.paths.ledger_file = root.path().join("state").join("sessions.json");
    config.paths.dashboard_data = root.path().join("state").join("data.js");
    config.paths.log_directory = root.path().join("logs");
    config.sources = sources;
    config
}

/// The two-line token-count log from the worked example: one day,
/// 3000 input and 500 output tokens of claude-sonnet-4-5.
pub const SONNET_EXAMPLE: &str = concat!(
    r#"{"message":{"usage":{"input_tokens":1000,"output_tokens":500},"model":"claude-sonnet-4-5"},"timestamp":"2025-01-10T10:00:00Z"}"#,
    "\n",
    r#"{"message":{"usage":{"input_tokens":2000,"output_tokens":0},"model":"claude-sonnet-4-5"},"timestamp":"2025-01-10T11:00:00Z"}"#,
    "\n"
);
