//! news-wave main entry point
//!
//! This is the command-line interface for the news-wave crawler.

use anyhow::Context;
use clap::Parser;
use news_wave::config::{load_config_with_hash, Config, StorageTarget};
use news_wave::crawler::Coordinator;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// news-wave: a bounded news crawler
///
/// news-wave crawls a news site from a seed URL, follows article links up to
/// a fixed depth with a fixed number of concurrent tasks, offloads article
/// images, and stores each wave's articles in one bulk write.
#[derive(Parser, Debug)]
#[command(name = "news-wave")]
#[command(version)]
#[command(about = "A bounded news crawler", long_about = None)]
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

    /// Number of waves to run
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    waves: u32,

    /// Seconds to wait between waves
    #[arg(long, default_value_t = 0)]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
        Ok(ExitCode::SUCCESS)
    } else if cli.stats {
        handle_stats(&config)?;
        Ok(ExitCode::SUCCESS)
    } else {
        handle_crawl(
            config,
            &config_hash,
            cli.waves,
            Duration::from_secs(cli.interval_secs),
        )
        .await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_wave=info,warn"),
            1 => EnvFilter::new("news_wave=debug,info"),
            2 => EnvFilter::new("news_wave=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== news-wave Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!("  Source: {}", config.crawler.source);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Max concurrent tasks: {}",
        config.crawler.max_concurrent_tasks
    );
    println!("  Wave deadline: {}s", config.crawler.wave_deadline_secs);
    println!("  Dedup key: {:?}", config.crawler.dedup_key);
    println!(
        "  Query failure policy: {:?}",
        config.crawler.query_failure_policy
    );
    println!("  Link marker: {}", config.crawler.link_marker);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nExtractor:");
    println!("  Headline: {}", config.extractor.headline_selector);
    println!("  Time: {}", config.extractor.time_selector);
    println!("  Body: {}", config.extractor.body_selector);
    println!("  Caption: {}", config.extractor.caption_selector);
    println!("  Noise: {}", config.extractor.noise_selector);

    println!("\nImage Storage:");
    match &config.storage {
        StorageTarget::Local { root } => {
            println!("  Mode: local");
            println!("  Root: {}", root);
        }
        StorageTarget::Remote(remote) => {
            println!("  Mode: remote");
            println!("  Bucket: {} ({})", remote.bucket, remote.region);
            println!("  Key prefix: {}", remote.key_prefix);
            if let Some(endpoint) = &remote.endpoint {
                println!("  Endpoint: {}", endpoint);
            }
        }
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(summary_path) = &config.output.summary_path {
        println!("  Report: {}", summary_path);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use news_wave::output::{load_statistics, print_statistics};
    use news_wave::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    waves: u32,
    interval: Duration,
) -> anyhow::Result<ExitCode> {
    tracing::info!(
        "Crawling {} ({} wave(s), source {})",
        config.crawler.seed_url,
        waves,
        config.crawler.source
    );

    let coordinator = Coordinator::new(config, config_hash).context("Failed to initialize crawler")?;
    let summaries = coordinator.run_waves(waves, interval).await?;

    let failed = summaries.iter().filter(|s| s.is_failed()).count();
    if failed > 0 {
        tracing::error!("{} of {} wave(s) failed", failed, summaries.len());
        return Ok(ExitCode::FAILURE);
    }

    tracing::info!("Crawl completed successfully");
    Ok(ExitCode::SUCCESS)
}
