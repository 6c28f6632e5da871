//! Dashboard data contract
//!
//! The rendering layer loads a script that assigns one global:
//!
//! ```js
//! window.USAGE_DATA = {"summary": {...}, "sessions": [...], "otherSessions": [...]};
//! ```
//!
//! `sessions` holds the primary source family and `otherSessions` everything
//! else. The renderer reads the two lists positionally.

use crate::models::{Session, Summary};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const GLOBAL_NAME: &str = "window.USAGE_DATA";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub summary: Summary,
    pub sessions: Vec<Session>,
    #[serde(rename = "otherSessions")]
    pub other_sessions: Vec<Session>,
}

impl DashboardData {
    /// Split `sessions` into the primary family and the rest, keeping order.
    pub fn new(summary: Summary, sessions: &[Session], primary_sources: &[String]) -> Self {
        let (primary, other): (Vec<Session>, Vec<Session>) = sessions
            .iter()
            .cloned()
            .partition(|session| primary_sources.iter().any(|name| *name == session.source));
        Self {
            summary,
            sessions: primary,
            other_sessions: other,
        }
    }

    pub fn to_script(&self) -> Result<String> {
        let json = serde_json::to_string(self).context("Failed to serialize dashboard data")?;
        Ok(format!("{} = {};\n", GLOBAL_NAME, json))
    }

    /// Write the script next to the dashboard, replacing any previous one.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let script = self.to_script()?;
        let temp_path = path.with_extension("js.tmp");
        fs::write(&temp_path, script)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        info!(
            path = %path.display(),
            primary = self.sessions.len(),
            other = self.other_sessions.len(),
            "Dashboard data written"
        );
        Ok(())
    }
}
