use crate::config::{FileLabel, ScanConfig, SourceConfig};
use anyhow::{Context, Result};
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Handles file system traversal and discovery of tool log files
pub struct FileDiscovery {
    max_depth: usize,
    skip_dirs: HashSet<String>,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

impl FileDiscovery {
    pub fn new(scan: &ScanConfig) -> Self {
        Self {
            max_depth: scan.max_depth,
            skip_dirs: scan.skip_dirs.iter().cloned().collect(),
        }
    }

    /// Candidate directories of `source` that exist, in table order, each once.
    pub fn existing_dirs(&self, source: &SourceConfig) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        source
            .dirs
            .iter()
            .map(|dir| expand_home(dir))
            .filter(|dir| dir.is_dir())
            .filter(|dir| seen.insert(dir.clone()))
            .collect()
    }

    /// Files under `root` whose name matches any of `patterns`, sorted by path.
    /// Skipped directory names are never entered; unreadable entries are logged
    /// and passed over.
    pub fn find_log_files(&self, root: &Path, patterns: &[Pattern]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|entry| !self.is_skipped(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if patterns.iter().any(|pattern| pattern.matches(&name)) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        debug!(root = %root.display(), files = files.len(), "Discovered log files");
        files
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self
                .skip_dirs
                .contains(entry.file_name().to_string_lossy().as_ref())
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw));
    }
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).with_context(|| format!("Invalid file pattern '{}'", pattern))
        })
        .collect()
}

/// The identity component of a session file.
pub fn file_label(path: &Path, label: FileLabel) -> Option<String> {
    let name = match label {
        FileLabel::Basename => path.file_name(),
        FileLabel::ParentDir => path.parent().and_then(Path::file_name),
    }?;
    Some(name.to_string_lossy().into_owned())
}
