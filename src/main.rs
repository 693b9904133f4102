//! News-Harvest main entry point
//!
//! This is the command-line interface for the News-Harvest archive collector.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use news_harvest::config::{load_config_with_hash, parse_date, validate, Config};
use news_harvest::report::print_report;
use news_harvest::{Orchestrator, Registry};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// News-Harvest: an incremental news-archive collector
///
/// Collects the articles listed in the daily archives of French news sites
/// between two dates, scores them with an embedding service and stores them
/// in SQLite. Re-running a window only fetches what is not stored yet.
#[derive(Parser, Debug)]
#[command(name = "news-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental news-archive collector", long_about = None)]
struct Cli {
    /// Archives to collect (repeatable or comma-separated); all when omitted
    #[arg(long, value_delimiter = ',')]
    archives: Vec<String>,

    /// First day to collect, dd-mm-yyyy or yyyy-mm-dd (default: today)
    #[arg(long = "begin_date", alias = "begin-date", value_parser = parse_cli_date)]
    begin_date: Option<NaiveDate>,

    /// Last day to collect, dd-mm-yyyy or yyyy-mm-dd (default: today)
    #[arg(long = "end_date", alias = "end-date", value_parser = parse_cli_date)]
    end_date: Option<NaiveDate>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Configuration file holding defaults (TOML, or JSON by extension)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of concurrent workers (default: twice the archive count)
    #[arg(long)]
    workers: Option<usize>,

    /// Skip dates that already have stored articles
    #[arg(long)]
    skip_done_dates: bool,

    /// Run Chromium without its sandbox (root inside a container)
    #[arg(long)]
    no_sandbox: bool,

    /// List the known archives and exit
    #[arg(long)]
    list_archives: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let registry = Registry::with_builtin_sites();
    if cli.list_archives {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = build_config(&cli)?;

    let orchestrator = Orchestrator::from_config(&config, &registry)
        .context("Failed to set up the collection")?;

    let stop = orchestrator.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight pages");
            stop.stop();
        }
    });

    let window = orchestrator.window();
    tracing::info!(
        "Collecting from {} to {} with {} workers",
        window.begin,
        window.end,
        orchestrator.worker_count()
    );

    let report = orchestrator.run().await.context("Collection failed")?;
    if !cli.quiet {
        print_report(&report);
    }

    Ok(())
}

/// Loads the defaults file, if any, and layers the command-line flags on top
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if !cli.archives.is_empty() {
        config.crawl.archives = cli.archives.clone();
    }
    if let Some(begin) = cli.begin_date {
        config.crawl.begin_date = Some(begin);
    }
    if let Some(end) = cli.end_date {
        config.crawl.end_date = Some(end);
    }
    if let Some(timeout) = cli.timeout {
        config.crawl.timeout = timeout;
    }
    if let Some(workers) = cli.workers {
        config.crawl.workers = Some(workers);
    }
    if cli.skip_done_dates {
        config.crawl.skip_done_dates = true;
    }
    if cli.no_sandbox {
        config.fetch.no_sandbox = true;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_harvest=info,warn"),
            1 => EnvFilter::new("news_harvest=debug,info"),
            2 => EnvFilter::new("news_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
