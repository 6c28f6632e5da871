//! Configuration
//!
//! Settings come from, in increasing precedence:
//! - Built-in defaults, including the discovery table
//! - A TOML config file (optional)
//! - Environment variables
//!
//! The discovery table (`[[sources]]`) is versioned data: each entry names a
//! tool, the log format it writes, and the directories it may write to. A
//! config file that supplies any sources replaces the built-in table.

use crate::parser::SourceFormat;
use crate::pricing::{PricingResolver, PricingRule};
use crate::timestamp_parser::LocalClock;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Current version of the discovery table layout.
pub const CONFIG_VERSION: u32 = 1;

pub const MAX_SCAN_DEPTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,

    pub logging: LoggingConfig,

    pub paths: PathsConfig,

    pub scan: ScanConfig,

    pub dashboard: DashboardConfig,

    /// Discovery table
    pub sources: Vec<SourceConfig>,

    /// Rate overrides, consulted before the built-in pricing table
    pub pricing: Vec<PricingRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub ledger_file: PathBuf,
    pub dashboard_data: PathBuf,
    pub log_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub max_depth: usize,
    pub skip_dirs: Vec<String>,
    /// Fixed offset such as `+09:00`; the host offset when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Sources listed first in the dashboard contract.
    pub primary_sources: Vec<String>,
}

/// How a file is named in its session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileLabel {
    #[default]
    Basename,
    /// Name of the containing directory, for tools that keep one
    /// identically named file per session directory.
    ParentDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub format: SourceFormat,
    pub dirs: Vec<String>,
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub file_label: FileLabel,
}

fn default_patterns() -> Vec<String> {
    vec!["*.jsonl".to_string()]
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("usage-ledger")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            logging: LoggingConfig::default(),
            paths: PathsConfig::default(),
            scan: ScanConfig::default(),
            dashboard: DashboardConfig::default(),
            sources: builtin_sources(),
            pricing: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let root = data_root();
        Self {
            ledger_file: root.join("sessions.json"),
            dashboard_data: root.join("dashboard").join("data.js"),
            log_directory: root.join("logs"),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            skip_dirs: [".git", "node_modules", ".venv", "target", "__pycache__"]
                .iter()
                .map(|dir| dir.to_string())
                .collect(),
            utc_offset: None,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            primary_sources: vec!["claude-code".to_string()],
        }
    }
}

fn source(name: &str, format: SourceFormat, dirs: &[&str], patterns: &[&str]) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        format,
        dirs: dirs.iter().map(|dir| dir.to_string()).collect(),
        patterns: patterns.iter().map(|pattern| pattern.to_string()).collect(),
        file_label: FileLabel::Basename,
    }
}

/// The discovery table used when the config file supplies none.
pub fn builtin_sources() -> Vec<SourceConfig> {
    use SourceFormat::*;

    let mut cline = source(
        "cline",
        HistoryDocument,
        &[
            "~/.config/Code/User/globalStorage/saoudrizwan.claude-dev/tasks",
            "~/Library/Application Support/Code/User/globalStorage/saoudrizwan.claude-dev/tasks",
        ],
        &["ui_messages.json"],
    );
    cline.file_label = FileLabel::ParentDir;

    vec![
        source(
            "claude-code",
            TokenCount,
            &["~/.claude/projects", "~/.config/claude/projects"],
            &["*.jsonl"],
        ),
        source("codex", Completions, &["~/.codex/sessions"], &["*.jsonl"]),
        source("openclaw", AgentCost, &["~/.openclaw/agents"], &["*.jsonl"]),
        source("clawdbot", AgentCost, &["~/.clawdbot/agents"], &["*.jsonl"]),
        source("moltbot", AgentCost, &["~/.moltbot/agents"], &["*.jsonl"]),
        source("pi", AgentCost, &["~/.pi/agent/sessions"], &["*.jsonl"]),
        cline,
    ]
}

impl Config {
    /// Load configuration from `explicit`, or the first config file found,
    /// then apply environment overrides and validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::search_paths().into_iter().find(|path| path.exists()) {
                Some(path) => {
                    info!(config_file = %path.display(), "Loading configuration from file");
                    Self::load_from_file(&path)?
                }
                None => Config::default(),
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("usage-ledger.toml"),
            PathBuf::from(".usage-ledger.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("usage-ledger").join("config.toml"));
        }
        paths
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // An explicit `sources = []` means the built-in table
        if config.sources.is_empty() {
            config.sources = builtin_sources();
        }

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        if let Ok(val) = env::var("USAGE_LEDGER_FILE") {
            self.paths.ledger_file = PathBuf::from(val);
        }
        if let Ok(val) = env::var("USAGE_LEDGER_DASHBOARD") {
            self.paths.dashboard_data = PathBuf::from(val);
        }
        if let Ok(val) = env::var("USAGE_LEDGER_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        if let Ok(val) = env::var("USAGE_LEDGER_MAX_DEPTH") {
            self.scan.max_depth = val.parse().context("Invalid USAGE_LEDGER_MAX_DEPTH")?;
        }
        if let Ok(val) = env::var("USAGE_LEDGER_UTC_OFFSET") {
            self.scan.utc_offset = Some(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.version > CONFIG_VERSION {
            bail!(
                "Config version {} is newer than supported version {}",
                self.version,
                CONFIG_VERSION
            );
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            bail!("Log format must be 'pretty' or 'json', got '{}'", self.logging.format);
        }
        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            bail!(
                "Log output must be 'console', 'file' or 'both', got '{}'",
                self.logging.output
            );
        }

        if self.scan.max_depth == 0 || self.scan.max_depth > MAX_SCAN_DEPTH {
            bail!(
                "Scan depth must be between 1 and {}, got {}",
                MAX_SCAN_DEPTH,
                self.scan.max_depth
            );
        }
        self.clock()?;

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                bail!("Source names cannot be empty");
            }
            if !names.insert(source.name.as_str()) {
                bail!("Duplicate source '{}'", source.name);
            }
            if source.dirs.is_empty() {
                bail!("Source '{}' has no directories", source.name);
            }
            if source.patterns.is_empty() {
                bail!("Source '{}' has no file patterns", source.name);
            }
            for pattern in &source.patterns {
                glob::Pattern::new(pattern).with_context(|| {
                    format!("Invalid pattern '{}' for source '{}'", pattern, source.name)
                })?;
            }
        }

        for rule in &self.pricing {
            if rule.pattern.trim().is_empty() {
                bail!("Pricing overrides need a non-empty pattern");
            }
        }

        Ok(())
    }

    /// Clock for this run, with the offset fixed now.
    pub fn clock(&self) -> Result<LocalClock> {
        match &self.scan.utc_offset {
            Some(offset) => LocalClock::from_offset_str(offset),
            None => Ok(LocalClock::from_system()),
        }
    }

    pub fn pricing_resolver(&self) -> PricingResolver {
        PricingResolver::with_overrides(&self.pricing)
    }
}
