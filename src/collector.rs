//! Source Collection
//!
//! A [`SourceCollector`] turns one row of the discovery table into sessions:
//! it walks every candidate directory that exists, keeps the first file seen
//! under each file label, parses each kept file with the source's format and
//! flattens the resulting day buckets.
//!
//! File failures are counted in the [`SourceReport`] and never abort the
//! source. With the `parallel` feature, kept files are parsed on the rayon
//! pool; discovery and label de-duplication always run first and in order.

use crate::aggregator::to_sessions;
use crate::config::SourceConfig;
use crate::file_discovery::{compile_patterns, file_label, FileDiscovery};
use crate::models::{DayBuckets, Session};
use crate::parser::{parse_file, ParseContext};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of collecting one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub dirs_found: usize,
    pub files_parsed: usize,
    /// Files whose label had already been seen in an earlier directory.
    pub duplicate_files: usize,
    pub file_errors: usize,
    pub sessions: usize,
    pub cost: f64,
}

#[derive(Debug, Default)]
pub struct Collected {
    pub sessions: Vec<Session>,
    pub report: SourceReport,
}

pub struct SourceCollector<'a> {
    source: &'a SourceConfig,
    discovery: &'a FileDiscovery,
    ctx: ParseContext<'a>,
}

impl<'a> SourceCollector<'a> {
    pub fn new(source: &'a SourceConfig, discovery: &'a FileDiscovery, ctx: ParseContext<'a>) -> Self {
        Self {
            source,
            discovery,
            ctx,
        }
    }

    pub fn collect(&self) -> Result<Collected> {
        let patterns = compile_patterns(&self.source.patterns)?;
        let dirs = self.discovery.existing_dirs(self.source);

        let mut report = SourceReport {
            source: self.source.name.clone(),
            dirs_found: dirs.len(),
            ..SourceReport::default()
        };

        let mut seen_labels = HashSet::new();
        let mut files: Vec<(PathBuf, String)> = Vec::new();
        for dir in &dirs {
            for path in self.discovery.find_log_files(dir, &patterns) {
                let Some(label) = file_label(&path, self.source.file_label) else {
                    continue;
                };
                if !seen_labels.insert(label.clone()) {
                    debug!(file = %path.display(), "Already collected under another directory");
                    report.duplicate_files += 1;
                    continue;
                }
                files.push((path, label));
            }
        }

        let parsed = self.parse_all(&files);

        let mut sessions = Vec::new();
        for ((path, label), result) in files.iter().zip(parsed) {
            match result {
                Ok(buckets) => {
                    report.files_parsed += 1;
                    sessions.extend(to_sessions(&buckets, &self.source.name, label));
                }
                Err(e) => {
                    report.file_errors += 1;
                    warn!(source = %self.source.name, file = %path.display(), error = %e, "Failed to parse file");
                }
            }
        }

        report.sessions = sessions.len();
        report.cost = sessions.iter().map(|session| session.cost).sum();

        info!(
            source = %report.source,
            dirs = report.dirs_found,
            files = report.files_parsed,
            errors = report.file_errors,
            sessions = report.sessions,
            "Collected source"
        );

        Ok(Collected { sessions, report })
    }

    #[cfg(not(feature = "parallel"))]
    fn parse_all(&self, files: &[(PathBuf, String)]) -> Vec<Result<DayBuckets>> {
        files
            .iter()
            .map(|(path, _)| parse_file(path, self.source.format, self.ctx))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn parse_all(&self, files: &[(PathBuf, String)]) -> Vec<Result<DayBuckets>> {
        let format = self.source.format;
        let ctx = self.ctx;
        files
            .par_iter()
            .map(|(path, _)| parse_file(path, format, ctx))
            .collect()
    }
}
