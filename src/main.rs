//! Post-Harvest main entry point
//!
//! This is the command-line interface for the Post-Harvest feed harvester.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use post_harvest::config::{load_config_with_hash, validate, Config};
use post_harvest::dates::parse_date_arg;
use post_harvest::harvest::{
    build_http_client, ApiSource, HarvestRun, HtmlStateSource, PageSource, PaginationEngine,
    RunOptions,
};
use post_harvest::output::{append_metrics, assess_health, print_run_summary, MetricsRecord};
use post_harvest::storage::{FileStore, PostStore};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Post-Harvest: an incremental post feed harvester
///
/// Walks a paginated list API page by page under a strict rate limit,
/// skips posts it has already stored, and keeps a checkpoint so that an
/// interrupted run resumes where it left off.
#[derive(Parser, Debug)]
#[command(name = "post-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental, resumable post feed harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Harvest mode
    #[arg(long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,

    /// Where list pages come from
    #[arg(long, value_enum, default_value_t = SourceKind::Api)]
    source: SourceKind,

    /// Maximum pages to request (overrides scrape.max-pages)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Stop once this many posts have been harvested across all runs
    #[arg(long)]
    max_posts: Option<u64>,

    /// Stop at the first post published before this date
    #[arg(long, value_name = "YYYY-MM-DD")]
    stop_date: Option<String>,

    /// Only store posts published on or after this date
    #[arg(long, value_name = "YYYY-MM-DD")]
    start_date: Option<String>,

    /// First page to request instead of resuming from the checkpoint
    #[arg(long)]
    start_page: Option<u32>,

    /// Requests per second (overrides rate-limit.qps)
    #[arg(long)]
    qps: Option<f64>,

    /// Burst size (overrides rate-limit.burst)
    #[arg(long)]
    burst: Option<u32>,

    /// Skip the dataset export after harvesting
    #[arg(long, conflicts_with = "export_only")]
    no_export: bool,

    /// Export stored posts as a dataset and exit
    #[arg(long)]
    export_only: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Walk pages until a stop condition
    Full,
    /// Fetch the first page and keep posts newer than the checkpoint
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// JSON list endpoint
    Api,
    /// State embedded in the rendered list page
    Html,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.export_only {
        return handle_export(&config);
    }

    handle_harvest(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("post_harvest=info,warn"),
            1 => EnvFilter::new("post_harvest=debug,info"),
            2 => EnvFilter::new("post_harvest=trace,debug"),
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

/// Folds command-line settings into the configuration and re-validates it
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(qps) = cli.qps {
        config.rate_limit.qps = qps;
    }
    if let Some(burst) = cli.burst {
        config.rate_limit.burst = burst;
    }
    if let Some(max_pages) = cli.max_pages {
        config.scrape.max_pages = max_pages;
    }
    validate(config).context("invalid command-line override")?;
    Ok(())
}

/// Handles --export-only: writes the dataset from stored posts
fn handle_export(config: &Config) -> Result<()> {
    let store = FileStore::open(Path::new(&config.storage.data_dir), config.storage.include_raw)?;
    let summary = store.export_dataset(&config.storage.export_file)?;

    println!(
        "✓ Exported {} posts to {} ({} skipped)",
        summary.records,
        summary.path.display(),
        summary.skipped
    );
    log_storage_stats(&store);
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, cli: &Cli) -> Result<()> {
    let stop_date = cli.stop_date.as_deref().map(parse_date_arg).transpose()?;
    let start_date = cli.start_date.as_deref().map(parse_date_arg).transpose()?;

    let file_store =
        FileStore::open(Path::new(&config.storage.data_dir), config.storage.include_raw)?;
    let engine_store: Box<dyn PostStore + Send> = Box::new(file_store.clone());

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let client = build_http_client(&config.http)?;
    let mut options = RunOptions::from_config(&config.scrape);
    options.start_page = cli.start_page;
    options.max_posts = cli.max_posts;
    options.stop_date = stop_date;
    options.start_date = start_date;

    let run = match cli.source {
        SourceKind::Api => {
            let source = ApiSource::new(client, config.api.clone());
            run_engine(source, &config, engine_store, cancel, cli.mode, &options).await?
        }
        SourceKind::Html => {
            let page_url = config
                .api
                .page_url
                .clone()
                .context("--source html requires api.page-url in the configuration")?;
            let source = HtmlStateSource::new(client, page_url, config.api.success_code.clone());
            run_engine(source, &config, engine_store, cancel, cli.mode, &options).await?
        }
    };

    let stored = run.posts.len();
    tracing::info!("Final posts count: {}", stored);

    print_run_summary(&run.stats, &run.stop_reason);
    assess_health(&run.stats);
    append_metrics(
        Path::new(&config.storage.metrics_file),
        &MetricsRecord::from_stats(&run.stats, &run.stop_reason),
    )?;

    if !cli.no_export && stored > 0 {
        let summary = file_store.export_dataset(&config.storage.export_file)?;
        tracing::info!("Dataset exported to {}", summary.path.display());
    }
    log_storage_stats(&file_store);

    if run.stop_reason.is_upstream_failure() {
        tracing::error!("Harvest ended early: {}", run.stop_reason);
    }

    Ok(())
}

async fn run_engine<S: PageSource>(
    source: S,
    config: &Config,
    store: Box<dyn PostStore + Send>,
    cancel: CancellationToken,
    mode: Mode,
    options: &RunOptions,
) -> Result<HarvestRun> {
    let mut engine = PaginationEngine::new(source, config, store)?.with_cancellation(cancel);

    let run = match mode {
        Mode::Full => engine.run(options).await?,
        Mode::Incremental => engine.run_incremental(options.page_size).await?,
    };
    Ok(run)
}

/// Cancels the run between pages on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });
}

fn log_storage_stats(store: &FileStore) {
    match store.stats() {
        Ok(stats) => tracing::info!(
            "Storage: {} post files, {} bytes in {}",
            stats.post_files,
            stats.total_bytes,
            stats.posts_dir.display()
        ),
        Err(e) => tracing::warn!("Could not read storage stats: {}", e),
    }
}
