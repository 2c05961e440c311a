//! Bookmark Harvest main entry point
//!
//! This is the command-line interface for crawling and summarizing bookmarks.

use anyhow::{anyhow, Context};
use bookmark_harvest::bookmarks::{apply_limit, source_from_config, CandidateFilter};
use bookmark_harvest::config::{compute_config_hash, load_layered_config, validate, Config};
use bookmark_harvest::crawler::{DrainSignal, Orchestrator, RunOptions, RunSummary};
use bookmark_harvest::fetcher::build_fetcher;
use bookmark_harvest::output::{
    export_all, load_statistics, print_failures, print_run_summary, print_statistics,
    write_json_array,
};
use bookmark_harvest::storage::{open_store, CheckpointStore, SqliteStore};
use bookmark_harvest::{BookmarkRecord, Summarizer};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Bookmark Harvest: crawl and summarize your bookmarks
///
/// Every bookmark is fetched (over plain HTTP first, through headless Chrome
/// when needed), summarized by the configured text-generation backend and
/// checkpointed, so an interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "bookmark-harvest")]
#[command(version)]
#[command(about = "Crawl and summarize browser bookmarks", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Path to the bookmark export (overrides the configuration)
    #[arg(short, long, value_name = "PATH")]
    bookmarks: Option<PathBuf>,

    /// Only process the first N bookmarks (0 = no limit)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Only fetch content, skip summary generation
    #[arg(long, conflicts_with = "from_json")]
    no_summary: bool,

    /// Generate summaries for previously fetched content instead of crawling
    #[arg(long)]
    from_json: bool,

    /// Re-attempt URLs that failed in earlier runs
    #[arg(long)]
    retry_failed: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Export the dataset and failure ledger from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    let config = build_config(&cli)?;
    let config_hash = compute_config_hash(&config);
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export {
        handle_export(&config)
    } else if cli.from_json {
        handle_summarize_existing(&config, config_hash).await
    } else {
        handle_crawl(&config, config_hash, cli.retry_failed).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bookmark_harvest=info,warn"),
            1 => EnvFilter::new("bookmark_harvest=debug,info"),
            2 => EnvFilter::new("bookmark_harvest=trace,debug"),
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

/// Applies file, environment and CLI layers, then validates the result
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let mut config =
        load_layered_config(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(path) = &cli.bookmarks {
        config.input.bookmarks_path = path.display().to_string();
    }
    if let Some(limit) = cli.limit {
        config.input.limit = limit;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = config.crawler.clamp_workers(workers);
    }
    if cli.no_summary || cli.stats || cli.export {
        config.crawler.generate_summary = false;
    }
    if cli.from_json {
        config.crawler.generate_summary = true;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Reads, filters and limits the bookmark export
fn load_candidates(config: &Config) -> anyhow::Result<Vec<BookmarkRecord>> {
    let source = source_from_config(&config.input);
    let records = source
        .list_candidates()
        .context("Failed to read bookmarks")?;
    let total = records.len();

    let filtered = CandidateFilter::new(&config.input).apply(records);
    let accepted = filtered.len();
    let candidates = apply_limit(filtered, config.input.limit);

    tracing::info!(
        "Read {} bookmarks, {} eligible, {} selected",
        total,
        accepted,
        candidates.len()
    );
    Ok(candidates)
}

/// Builds the summarizer when summaries are enabled, probing the backend if asked
async fn build_summarizer(config: &Config) -> anyhow::Result<Option<Arc<Summarizer>>> {
    if !config.crawler.generate_summary {
        tracing::info!("Summary generation disabled");
        return Ok(None);
    }

    let summarizer = Summarizer::from_config(&config.summary)?;
    if config.summary.probe_on_start {
        summarizer
            .probe()
            .await
            .context("Summarization backend is not usable")?;
    }
    Ok(Some(Arc::new(summarizer)))
}

/// Builds the orchestrator over the configured database
async fn build_orchestrator(
    config: &Config,
    config_hash: String,
) -> anyhow::Result<Orchestrator<SqliteStore>> {
    let db_path = Path::new(&config.output.database_path);
    let store = open_store(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    tracing::info!(
        "Checkpoint database {} holds {} completed URLs",
        db_path.display(),
        store.completed_count()
    );

    let fetcher = Arc::new(build_fetcher(&config.fetcher)?);
    let summarizer = build_summarizer(config).await?;

    Ok(Orchestrator::new(store, fetcher, summarizer, &config.crawler).with_config_hash(config_hash))
}

/// Stops workers from taking new URLs on the first Ctrl+C; exits on the second
fn spawn_interrupt_handler(drain: DrainSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, finishing in-flight URLs (Ctrl+C again to abort)");
        drain.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt received, aborting");
            std::process::exit(130);
        }
    });
}

/// Exports the store and prints the run report
fn finish_run(
    orchestrator: &Orchestrator<SqliteStore>,
    config: &Config,
    result: bookmark_harvest::Result<RunSummary>,
) -> anyhow::Result<()> {
    let store = orchestrator.store();
    let store = store
        .lock()
        .map_err(|_| anyhow!("Checkpoint store lock poisoned"))?;
    let exports = export_all(&*store, &config.output).context("Failed to export results")?;

    let summary = result.context("Run failed")?;
    print_run_summary(&summary, &exports, &config.output);
    print_failures(&store.failures()?);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: String, retry_failed: bool) -> anyhow::Result<()> {
    let candidates = load_candidates(config)?;
    write_json_array(Path::new(&config.output.bookmarks_json), &candidates)
        .context("Failed to write bookmark list")?;

    let orchestrator = build_orchestrator(config, config_hash).await?;
    spawn_interrupt_handler(orchestrator.drain_signal());

    let options = RunOptions {
        workers: config.crawler.workers,
        generate_summary: config.crawler.generate_summary,
        retry_failed,
    };
    let result = orchestrator.run(candidates, options).await;
    finish_run(&orchestrator, config, result)
}

/// Handles the --from-json mode: summarizes stored content that has none yet
async fn handle_summarize_existing(config: &Config, config_hash: String) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(config, config_hash).await?;
    if config.input.limit > 0 {
        tracing::info!("Only summarizing the first {} stored entries", config.input.limit);
    }

    spawn_interrupt_handler(orchestrator.drain_signal());
    let result = orchestrator
        .summarize_stored(config.input.limit, config.crawler.workers)
        .await;
    finish_run(&orchestrator, config, result)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Bookmark Harvest Dry Run ===\n");

    println!("Input:");
    println!("  Bookmarks: {}", config.input.bookmarks_path);
    println!("  Format: {:?}", config.input.format);
    println!(
        "  Limit: {}",
        match config.input.limit {
            0 => "none".to_string(),
            n => n.to_string(),
        }
    );

    println!("\nCrawler:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max workers: {}", config.crawler.max_workers);
    println!("  Generate summaries: {}", config.crawler.generate_summary);

    println!("\nFetcher:");
    println!("  Static timeout: {}s", config.fetcher.static_timeout_secs);
    println!("  Min content length: {}", config.fetcher.min_content_length);
    println!("  Rendering enabled: {}", config.fetcher.render_enabled);
    println!("  Dynamic domains: {}", config.fetcher.dynamic_domains.join(", "));

    if config.crawler.generate_summary {
        println!("\nSummary:");
        println!("  Backend: {}", config.summary.model_type);
        println!("  Endpoint: {}", config.summary.endpoint());
        println!("  Model: {}", config.summary.model_name);
        println!("  Max input length: {}", config.summary.max_input_length);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Dataset: {}", config.output.dataset_json);
    println!("  Failures: {}", config.output.failures_json);

    let candidates = load_candidates(config)?;
    let db_path = Path::new(&config.output.database_path);
    let completed = if db_path.exists() {
        let store = open_store(db_path)?;
        candidates
            .iter()
            .filter(|b| store.is_completed(&b.url))
            .count()
    } else {
        0
    };

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would process {} of {} candidate bookmarks ({} already completed)",
        candidates.len() - completed,
        candidates.len(),
        completed
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: writes the JSON exports from the database
fn handle_export(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Results ===\n");
    println!("Database: {}", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let counts = export_all(&store, &config.output)?;

    println!(
        "✓ {} results exported to: {}",
        counts.dataset, config.output.dataset_json
    );
    println!(
        "✓ {} failures exported to: {}",
        counts.failures, config.output.failures_json
    );

    Ok(())
}
