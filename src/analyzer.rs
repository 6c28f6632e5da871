//! Ledger Pipeline
//!
//! [`LedgerAnalyzer`] runs the whole batch in one pass:
//!
//! 1. **Collect**: every source in the discovery table, in table order
//! 2. **Load**: the persisted ledger (skipped with `use_cache: false`)
//! 3. **Merge**: fresh sessions replace cached ones with the same key
//! 4. **Save**: the merged ledger, atomically
//! 5. **Publish**: the summary and the dashboard data script
//!
//! Collection always completes before the ledger is read, and the ledger is
//! saved only after the merge. Failures below the source level become counts
//! in the [`SourceReport`]s; only a failed save fails the run.
//!
//! ```no_run
//! use usage_ledger::{Config, LedgerAnalyzer, ScanOptions};
//!
//! # fn example() -> anyhow::Result<()> {
//! let analyzer = LedgerAnalyzer::new(Config::load(None)?)?;
//! let outcome = analyzer.scan(ScanOptions::default())?;
//! println!("{} sessions", outcome.sessions.len());
//! # Ok(())
//! # }
//! ```

use crate::cache::{merge, LedgerCache, LoadedLedger};
use crate::collector::{SourceCollector, SourceReport};
use crate::config::Config;
use crate::dashboard::DashboardData;
use crate::display::DisplayManager;
use crate::file_discovery::FileDiscovery;
use crate::logging::run_span;
use crate::models::{Session, Summary};
use crate::parser::ParseContext;
use crate::pricing::PricingResolver;
use crate::summary::build_summary;
use crate::timestamp_parser::LocalClock;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub json_output: bool,
    pub use_cache: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            json_output: false,
            use_cache: true,
        }
    }
}

/// Everything one scan produced.
#[derive(Debug)]
pub struct ScanOutcome {
    pub reports: Vec<SourceReport>,
    pub cached: usize,
    pub dropped: usize,
    pub sessions: Vec<Session>,
    pub dashboard: DashboardData,
    /// Set when the dashboard script was written.
    pub dashboard_path: Option<PathBuf>,
}

pub struct LedgerAnalyzer {
    config: Config,
    pricing: PricingResolver,
    clock: LocalClock,
    discovery: FileDiscovery,
    display_manager: DisplayManager,
}

impl LedgerAnalyzer {
    /// The clock offset is fixed here, once per run.
    pub fn new(config: Config) -> Result<Self> {
        let clock = config.clock()?;
        Ok(Self {
            pricing: config.pricing_resolver(),
            discovery: FileDiscovery::new(&config.scan),
            clock,
            config,
            display_manager: DisplayManager::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn cache(&self) -> LedgerCache {
        LedgerCache::new(&self.config.paths.ledger_file)
    }

    /// Fresh sessions from every configured source.
    pub fn collect(&self) -> (Vec<Session>, Vec<SourceReport>) {
        let ctx = ParseContext {
            pricing: &self.pricing,
            clock: self.clock,
        };

        let mut sessions = Vec::new();
        let mut reports = Vec::with_capacity(self.config.sources.len());
        for source in &self.config.sources {
            match SourceCollector::new(source, &self.discovery, ctx).collect() {
                Ok(collected) => {
                    sessions.extend(collected.sessions);
                    reports.push(collected.report);
                }
                Err(e) => {
                    warn!(source = %source.name, error = %e, "Skipping source");
                    reports.push(SourceReport {
                        source: source.name.clone(),
                        ..SourceReport::default()
                    });
                }
            }
        }
        (sessions, reports)
    }

    pub fn scan(&self, options: ScanOptions) -> Result<ScanOutcome> {
        let span = run_span("scan");
        let _enter = span.enter();

        let (fresh, reports) = self.collect();
        info!(fresh = fresh.len(), sources = reports.len(), "Collection finished");

        let LoadedLedger {
            sessions: cached_sessions,
            dropped,
        } = if options.use_cache {
            self.cache().load()
        } else {
            LoadedLedger::default()
        };
        let cached = cached_sessions.len();

        let sessions = merge(fresh, cached_sessions);
        self.cache().save(&sessions)?;

        let summary = build_summary(&sessions, &self.clock);
        let dashboard = DashboardData::new(summary, &sessions, &self.config.dashboard.primary_sources);

        let path = &self.config.paths.dashboard_data;
        let dashboard_path = match dashboard.write(path) {
            Ok(()) => Some(path.clone()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write dashboard data");
                None
            }
        };

        Ok(ScanOutcome {
            reports,
            cached,
            dropped,
            sessions,
            dashboard,
            dashboard_path,
        })
    }

    /// Summary of the persisted ledger without scanning.
    pub fn ledger_summary(&self) -> Summary {
        let span = run_span("summary");
        let _enter = span.enter();

        let loaded = self.cache().load();
        build_summary(&loaded.sessions, &self.clock)
    }

    pub fn run_scan(&self, options: ScanOptions) -> Result<()> {
        let outcome = self.scan(options)?;

        if options.json_output {
            return self.display_manager.display_json(&outcome.dashboard);
        }

        self.display_manager.display_collection_header();
        for report in &outcome.reports {
            self.display_manager.display_source_progress(report);
        }
        self.display_manager
            .display_cache_status(outcome.cached, outcome.dropped, outcome.sessions.len());
        if let Some(path) = &outcome.dashboard_path {
            self.display_manager.display_dashboard_written(&outcome.dashboard, path);
        }
        self.display_manager.display_summary(&outcome.dashboard.summary);
        Ok(())
    }

    pub fn run_summary(&self, json_output: bool) -> Result<()> {
        let summary = self.ledger_summary();
        if json_output {
            return self.display_manager.display_json(&summary);
        }
        self.display_manager.display_summary(&summary);
        Ok(())
    }

    pub fn run_sources(&self) {
        self.display_manager.display_sources(&self.config.sources);
    }
}
