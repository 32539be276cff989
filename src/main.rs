//! Rental-Harvest main entry point
//!
//! This is the command-line interface for the Rental-Harvest listing crawler.

use clap::{Parser, ValueEnum};
use rental_harvest::config::{load_config_with_hash, Config};
use rental_harvest::crawler::{run_detail_fetch, run_listing_crawl, CrawlOutcome, ShutdownFlag};
use rental_harvest::flatten::run_flatten;
use rental_harvest::progress::{ProgressStore, Stage};
use rental_harvest::storage::{CsvDetailTable, UrlList};
use rental_harvest::HarvestError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Rental-Harvest: a resumable listing crawler
///
/// Rental-Harvest collects rental listing URLs from paginated search
/// results, fetches each listing's embedded data, and flattens it into a
/// CSV table. Interrupted runs resume from their last checkpoint.
#[derive(Parser, Debug)]
#[command(name = "rental-harvest")]
#[command(version)]
#[command(about = "A resumable rental listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Pipeline stage to run
    #[arg(value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard the selected stages' outputs and progress before running
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be run without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show progress statistics from the output files and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Discover listing URLs from search-result pages
    Crawl,
    /// Fetch listing data for every discovered URL
    Details,
    /// Rebuild the flattened table from the raw table
    Flatten,
    /// Run all three stages in order
    All,
}

impl Mode {
    fn includes_crawl(self) -> bool {
        matches!(self, Self::Crawl | Self::All)
    }

    fn includes_details(self) -> bool {
        matches!(self, Self::Details | Self::All)
    }

    fn includes_flatten(self) -> bool {
        matches!(self, Self::Flatten | Self::All)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, cli.mode);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_run(&config, cli.mode, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("rental_harvest=info,warn"),
            1 => EnvFilter::new("rental_harvest=debug,info"),
            2 => EnvFilter::new("rental_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config, mode: Mode) {
    println!("=== Rental-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Search URL: {}", config.crawler.base_url);
    println!("  Origin: {}", config.crawler.origin);
    println!("  Page parameter: {}", config.crawler.page_param);
    println!("  Max page: {}", config.crawler.max_page);
    println!("  Card selector: {}", config.crawler.card_selector);
    println!("  Link selector: {}", config.crawler.link_selector);

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max attempts: {}", config.fetcher.max_retries);
    println!("  Retry delay: {}s", config.fetcher.retry_delay_secs);

    println!("\nDelays:");
    println!(
        "  Between pages: {}-{}ms",
        config.delays.courtesy_min_ms, config.delays.courtesy_max_ms
    );
    println!("  Between listings: {}ms", config.delays.detail_pause_ms);

    println!("\nOutput:");
    println!("  URL list: {}", config.output.url_list_path);
    println!("  Raw table: {}", config.output.raw_table_path);
    println!("  Flattened table: {}", config.output.flattened_path);
    println!("  Crawl progress: {}", config.output.crawl_progress_path);
    println!("  Detail progress: {}", config.output.detail_progress_path);

    let crawl_record =
        ProgressStore::new(&config.output.crawl_progress_path, Stage::ListingCrawl).load();
    let detail_record =
        ProgressStore::new(&config.output.detail_progress_path, Stage::DetailFetch).load();

    println!("\n✓ Configuration is valid");
    if mode.includes_crawl() {
        println!(
            "✓ Would crawl pages {}..={}",
            crawl_record.next_unit().max(1),
            config.crawler.max_page
        );
    }
    if mode.includes_details() {
        println!(
            "✓ Would fetch details from queue index {}",
            detail_record.next_unit()
        );
    }
    if mode.includes_flatten() {
        println!("✓ Would rebuild {}", config.output.flattened_path);
    }
}

/// Handles the --stats mode: shows statistics from the output files
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use rental_harvest::output::{load_statistics, print_statistics};

    let stats = load_statistics(config)?;
    print_statistics(&stats);

    Ok(())
}

/// Removes the outputs and progress of the selected stages
fn reset_stages(config: &Config, mode: Mode) -> Result<(), HarvestError> {
    if mode.includes_crawl() {
        tracing::info!("Discarding URL list and crawl progress");
        UrlList::new(&config.output.url_list_path).truncate()?;
        ProgressStore::new(&config.output.crawl_progress_path, Stage::ListingCrawl).reset()?;
    }
    if mode.includes_details() {
        tracing::info!("Discarding raw table and detail progress");
        CsvDetailTable::new(&config.output.raw_table_path).clear()?;
        ProgressStore::new(&config.output.detail_progress_path, Stage::DetailFetch).reset()?;
    }
    Ok(())
}

/// Handles the pipeline run for the selected mode
async fn handle_run(
    config: &Config,
    mode: Mode,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh run (ignoring previous state)");
        reset_stages(config, mode)?;
    } else {
        tracing::info!("Starting run (will resume from saved progress)");
    }

    let shutdown = ShutdownFlag::new();
    shutdown.listen_for_ctrl_c();

    if mode.includes_crawl() {
        let outcome = run_listing_crawl(config, &shutdown).await;
        if !report_stage(config, Stage::ListingCrawl, outcome)? {
            return Ok(());
        }
    }

    if mode.includes_details() {
        let outcome = run_detail_fetch(config, &shutdown).await;
        if !report_stage(config, Stage::DetailFetch, outcome)? {
            return Ok(());
        }
    }

    if mode.includes_flatten() {
        match run_flatten(config) {
            Ok(summary) => println!(
                "Flattened {} rows ({} without data) into {}",
                summary.rows, summary.empty, config.output.flattened_path
            ),
            Err(e) => {
                tracing::error!("Flatten failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

/// Logs and prints a stage result
///
/// Returns whether later stages should run.
fn report_stage(
    config: &Config,
    stage: Stage,
    outcome: Result<CrawlOutcome, HarvestError>,
) -> Result<bool, Box<dyn std::error::Error>> {
    match outcome {
        Ok(outcome) if outcome.is_interrupted() => {
            tracing::warn!("Run interrupted: {}", outcome);
            println!("Interrupted. {}", outcome);
            Ok(false)
        }
        Ok(outcome) => {
            tracing::info!("Stage finished successfully: {}", outcome);
            println!("{}", outcome);
            Ok(true)
        }
        Err(e) => {
            tracing::error!("{} failed: {}", stage, e);
            print_last_known(config, stage);
            Err(e.into())
        }
    }
}

/// Prints the stored checkpoint of a stage
fn print_last_known(config: &Config, stage: Stage) {
    let path = match stage {
        Stage::ListingCrawl => &config.output.crawl_progress_path,
        Stage::DetailFetch => &config.output.detail_progress_path,
    };
    let record = ProgressStore::new(path, stage).load();
    println!(
        "Last saved {} progress: cursor {}, {} completed",
        stage, record.cursor, record.total_completed
    );
}
