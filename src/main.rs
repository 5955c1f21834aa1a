//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror offline crawler.

use anyhow::{bail, Context};
use clap::Parser;
use site_mirror::config::{read_config, validate, Config};
use site_mirror::output::{load_statistics, print_statistics, print_summary};
use site_mirror::storage::SqliteStorage;
use site_mirror::url::Scope;
use site_mirror::Crawler;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: an offline mirroring crawler
///
/// Site-Mirror downloads every page, stylesheet and script reachable from a
/// root URL within its domain into a local directory. An interrupted crawl
/// can be resumed from the progress database.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version)]
#[command(about = "Mirror a web site for offline use", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root URL to mirror
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Archive output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Workers for both page and asset fetching
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Page fetch workers
    #[arg(long, value_name = "N")]
    page_workers: Option<usize>,

    /// Asset fetch workers
    #[arg(long, value_name = "N")]
    asset_workers: Option<usize>,

    /// Archive save workers
    #[arg(long, value_name = "N")]
    save_workers: Option<usize>,

    /// Continue from recorded progress
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Discard recorded progress and start over
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Follow links to subdomains of the root host
    #[arg(short, long)]
    subdomains: bool,

    /// Write files uncompressed
    #[arg(long)]
    no_gzip: bool,

    /// Progress database file
    #[arg(short, long, value_name = "PATH", conflicts_with = "no_database")]
    database: Option<PathBuf>,

    /// Keep progress in memory only
    #[arg(long)]
    no_database: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and print it without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
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

/// Reads the optional config file and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            read_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(url) = &cli.url {
        config.crawl.root_url = url.clone();
    }
    if cli.resume {
        config.crawl.resume = true;
    }
    if cli.fresh {
        config.crawl.resume = false;
    }
    if cli.subdomains {
        config.crawl.include_subdomains = true;
    }

    if let Some(workers) = cli.workers {
        config.workers.set_fetch_workers(workers);
    }
    if let Some(workers) = cli.page_workers {
        config.workers.page_workers = workers;
    }
    if let Some(workers) = cli.asset_workers {
        config.workers.asset_workers = workers;
    }
    if let Some(workers) = cli.save_workers {
        config.workers.save_workers = workers;
    }

    if let Some(output) = &cli.output {
        config.output.archive_root = output.clone();
    }
    if cli.no_gzip {
        config.output.gzip = false;
    }

    if let Some(database) = &cli.database {
        config.storage.database_path = Some(database.clone());
    }
    if cli.no_database {
        config.storage.database_path = None;
    }

    if config.crawl.root_url.is_empty() {
        bail!("No root URL given; pass --url or set root-url in the [crawl] section");
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Crawl:");
    println!("  Root URL: {}", config.crawl.root_url);
    println!("  Include subdomains: {}", config.crawl.include_subdomains);
    println!("  Resume: {}", config.crawl.resume);

    println!("\nWorkers:");
    println!("  Page: {}", config.workers.page_workers);
    println!("  Asset: {}", config.workers.asset_workers);
    println!("  Save: {}", config.workers.save_workers);
    println!("  Save queue capacity: {}", config.workers.save_queue_capacity);

    println!("\nOutput:");
    println!("  Archive root: {}", config.output.archive_root.display());
    println!("  Gzip: {}", config.output.gzip);

    println!("\nStorage:");
    match &config.storage.database_path {
        Some(path) => println!("  Database: {}", path.display()),
        None => println!("  Database: none (in memory, not resumable)"),
    }

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Connect timeout: {}s", config.http.connect_timeout_secs);
    println!("  Request timeout: {}s", config.http.request_timeout_secs);
    println!("  Keepalive: {}s", config.http.keepalive_secs);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = &config.storage.database_path else {
        bail!("--stats needs a database; pass --database or set database-path");
    };

    let scope = Scope::new(&config.crawl.root_url, config.crawl.include_subdomains)
        .context("Invalid root URL")?;

    println!("Database: {}\n", path.display());
    let storage = SqliteStorage::new(path, scope.authority())
        .with_context(|| format!("Failed to open database {}", path.display()))?;

    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Mirroring {} into {}",
        config.crawl.root_url,
        config.output.archive_root.display()
    );

    let crawler = Crawler::new(config).context("Failed to start crawl")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            on_interrupt.cancel();
        }
    });

    let summary = crawler.run_with_cancellation(cancel).await;
    print_summary(&summary);

    if summary.cancelled {
        tracing::info!("Crawl stopped, progress can be resumed with --resume");
    } else {
        tracing::info!("Crawl completed successfully");
    }

    Ok(())
}
