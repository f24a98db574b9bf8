//! Trawline main entry point
//!
//! This is the command-line interface for the Trawline crawl engine.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trawline::config::load_config_with_hash;
use trawline::Orchestrator;

/// Trawline: a checkpointed, politeness-aware scraping engine
///
/// Trawline crawls the configured seeds with per-host rate limiting,
/// extracts structured records from each page, deduplicates them, and
/// checkpoints its frontier so an interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "trawline")]
#[command(version)]
#[command(about = "A checkpointed, politeness-aware scraping engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start fresh, discarding any checkpoint from a previous run
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "export")]
    dry_run: bool,

    /// Dump stored records as JSON lines and exit
    #[arg(long, conflicts_with = "dry_run")]
    export: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.export {
        handle_export(&config)?;
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("trawline=info,warn"),
            1 => EnvFilter::new("trawline=debug,info"),
            2 => EnvFilter::new("trawline=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &trawline::Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Trawline Dry Run ===\n");

    println!("Engine:");
    println!("  Workers: {}", config.engine.max_concurrency);
    println!("  Max attempts: {}", config.engine.max_attempts);
    println!("  Fetch timeout: {}ms", config.engine.fetch_timeout_ms);
    println!(
        "  Checkpoint interval: {}s",
        config.engine.checkpoint_interval_secs
    );
    println!("  Max depth: {}", config.engine.max_depth);

    println!("\nPoliteness:");
    println!("  Per-host rate: {} req/s", config.politeness.per_host_rate);
    println!("  Per-host burst: {}", config.politeness.per_host_burst);

    println!("\nRetry:");
    println!("  Backoff base: {}ms", config.retry.backoff_base_ms);
    println!("  Backoff cap: {}ms", config.retry.backoff_cap_ms);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.storage_path);

    if config.scope.allow.is_empty() {
        println!("\nScope: restricted to seed hosts");
    } else {
        println!("\nScope allow ({}):", config.scope.allow.len());
        for pattern in &config.scope.allow {
            println!("  - {}", pattern);
        }
    }
    for pattern in &config.scope.deny {
        println!("  deny: {}", pattern);
    }

    println!("\nExtract fields ({}):", config.extract.fields.len());
    for rule in &config.extract.fields {
        println!("  - {} <- {}", rule.name, rule.selector);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --export mode: dumps stored records as JSON lines on stdout
fn handle_export(config: &trawline::Config) -> Result<(), Box<dyn std::error::Error>> {
    use std::path::Path;
    use trawline::store::{open_store, Store};

    let store = open_store(Path::new(&config.output.storage_path))?;
    for record in store.export_records()? {
        println!("{}", record);
    }
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: trawline::Config,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (discarding previous checkpoint)");
    } else {
        tracing::info!("Starting crawl (will resume from checkpoint if one exists)");
    }

    let orchestrator = match Orchestrator::new(config, config_hash, fresh) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    // First Ctrl-C drains gracefully; a second one kills the process.
    let shutdown = orchestrator.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, finishing in-flight tasks");
            shutdown.request();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Second interrupt, exiting immediately");
            std::process::exit(130);
        }
    });

    match orchestrator.run().await {
        Ok(stats) => {
            tracing::info!(
                "Crawl finished: {} completed, {} failed, {} records ({} duplicates dropped)",
                stats.completed,
                stats.failed,
                stats.records_appended,
                stats.records_deduped
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
