use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process;
use usage_ledger::logging::init_logging;
use usage_ledger::{Config, LedgerAnalyzer, ScanOptions};

#[derive(Parser)]
#[command(name = "usage-ledger")]
#[command(about = "Aggregate local AI tool usage logs into a cost ledger")]
#[command(version)]
struct Cli {
    /// Config file (default: usage-ledger.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file to read and write
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Dashboard data script to write
    #[arg(long, global = true)]
    dashboard: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan all sources, merge into the ledger and write dashboard data
    Scan {
        /// Print the dashboard data as JSON
        #[arg(long)]
        json: bool,
        /// Ignore the existing ledger and keep only fresh sessions
        #[arg(long)]
        no_cache: bool,
    },
    /// Summarize the existing ledger without scanning
    Summary {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show the discovery table and which directories exist
    Sources,
}

fn main() {
    let cli = Cli::parse();
    let json = matches!(
        cli.command,
        Some(Commands::Scan { json: true, .. }) | Some(Commands::Summary { json: true })
    );

    if let Err(e) = run(cli) {
        handle_error(e, json);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(ledger) = cli.ledger {
        config.paths.ledger_file = ledger;
    }
    if let Some(dashboard) = cli.dashboard {
        config.paths.dashboard_data = dashboard;
    }

    if config.logging.output != "console" {
        fs::create_dir_all(&config.paths.log_directory)
            .context("Failed to create log directory")?;
    }
    let _guard = init_logging(&config.logging, &config.paths.log_directory);

    let analyzer = LedgerAnalyzer::new(config)?;

    match cli.command.unwrap_or(Commands::Scan {
        json: false,
        no_cache: false,
    }) {
        Commands::Scan { json, no_cache } => analyzer.run_scan(ScanOptions {
            json_output: json,
            use_cache: !no_cache,
        }),
        Commands::Summary { json } => analyzer.run_summary(json),
        Commands::Sources => {
            analyzer.run_sources();
            Ok(())
        }
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
