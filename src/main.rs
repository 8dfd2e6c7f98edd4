//! Listing-Sweep main entry point
//!
//! This is the command-line interface for the Listing-Sweep crawler.

use clap::Parser;
use listing_sweep::config::{load_config_with_hash, Config};
use listing_sweep::crawler::crawl;
use listing_sweep::output::{generate_markdown_summary, open_sink, CrawlSummary};
use listing_sweep::url::ListingTemplate;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Listing-Sweep: a paced crawler for paginated listing sites
///
/// Listing-Sweep walks each configured partition page by page, extracts one
/// record per listing, drops duplicates and writes records in batches to
/// XML files or a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "listing-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A paced crawler for paginated listing sites", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Seed for delay jitter and user-agent rotation (overrides the config)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(seed) = cli.seed {
        config.crawler.seed = Some(seed);
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_sweep=info,warn"),
            1 => EnvFilter::new("listing_sweep=debug,info"),
            2 => EnvFilter::new("listing_sweep=trace,debug"),
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
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Listing-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Record cap: {}", config.crawler.record_cap);
    println!("  Detail concurrency: {}", config.crawler.detail_concurrency);
    match config.crawler.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: random"),
    }

    println!("\nFetcher:");
    println!("  Max attempts: {}", config.fetcher.max_attempts);
    println!("  Request timeout: {}ms", config.fetcher.request_timeout_ms);
    println!("  429 cooldown: {}ms", config.fetcher.throttle_cooldown_ms);
    println!(
        "  Backoff: {}-{}ms",
        config.fetcher.backoff_min_ms, config.fetcher.backoff_max_ms
    );
    println!("  User agents: {}", config.fetcher.user_agents.len());

    println!("\nGovernor:");
    println!(
        "  Page delay: {}-{}ms",
        config.governor.page_delay_min_ms, config.governor.page_delay_max_ms
    );
    println!("  Request spacing: {}ms", config.governor.request_spacing_ms);

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Directory: {}", config.output.directory);
    println!("  File prefix: {}", config.output.file_prefix);
    println!("  Database: {}", config.output.database_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    let template = ListingTemplate::parse(&config.crawler.listing_url_template)?;
    println!("\nPartitions ({}):", config.crawler.partitions.len());
    for partition in &config.crawler.partitions {
        println!("  - {}: {}", partition, template.render(partition, 1)?);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use listing_sweep::output::{load_statistics, print_statistics};
    use listing_sweep::storage::SqliteStorage;

    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    // Load statistics
    let stats = load_statistics(&storage)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Partitions: {}, cap: {}, batch size: {}",
        config.crawler.partitions.len(),
        config.crawler.record_cap,
        config.crawler.batch_size
    );

    let sink = open_sink(&config.output, config_hash)?;
    let summary_path = config.output.summary_path.clone();

    // Ctrl-C stops the crawl; accepted records are still flushed
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current batch");
            on_signal.cancel();
        }
    });

    let summary = match crawl(config, sink, cancel).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    report(&summary);

    if let Some(path) = summary_path {
        generate_markdown_summary(&summary, Path::new(&path))?;
        tracing::info!("Summary written to {}", path);
    }

    Ok(())
}

fn report(summary: &CrawlSummary) {
    let reason = summary
        .stop_reason
        .map(|r| r.as_str())
        .unwrap_or("unknown");
    tracing::info!(
        "Crawl finished ({}): {} records in {} batches, {} duplicates, {} links skipped",
        reason,
        summary.accepted,
        summary.batches_flushed,
        summary.duplicates,
        summary.skipped_links()
    );
}
