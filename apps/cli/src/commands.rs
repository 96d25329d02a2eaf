//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use sitesift_core::{BatchCoordinator, PagePipeline};
use sitesift_plugins::PluginRegistry;
use sitesift_shared::{
    AppConfig, BatchResult, ScrapeConfig, init_config, load_config, load_config_from,
    validate_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Sitesift — agentic web scraping with AI-assisted analysis.
#[derive(Parser)]
#[command(
    name = "sitesift",
    version,
    about = "Fetch pages, extract structured content, score it, and enrich it with AI analysis and plugins.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file path (defaults to ~/.sitesift/sitesift.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape a batch of URLs and write the results as JSON.
    Scrape {
        /// URLs to process.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output directory for the results file.
        #[arg(short, long, default_value = "scraped_data")]
        output: PathBuf,

        /// Force-enable AI analysis for this run.
        #[arg(long, conflicts_with = "no_ai")]
        ai: bool,

        /// Force-disable AI analysis for this run.
        #[arg(long)]
        no_ai: bool,
    },

    /// Analyze a single URL and print (or write) its result.
    Analyze {
        /// URL to analyze.
        url: String,

        /// Output file path; prints to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List registered plugins.
    Plugins,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitesift=info",
        1 => "sitesift=debug",
        _ => "sitesift=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    match cli.command {
        Command::Scrape {
            urls,
            output,
            ai,
            no_ai,
        } => {
            let ai_override = if ai {
                Some(true)
            } else if no_ai {
                Some(false)
            } else {
                None
            };
            cmd_scrape(&urls, &output, ai_override, config_path.as_deref()).await
        }
        Command::Analyze { url, output } => {
            cmd_analyze(&url, output.as_deref(), config_path.as_deref()).await
        }
        Command::Plugins => cmd_plugins(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

/// Load config from the given path or the default location.
fn resolve_config(path: Option<&Path>, ai_override: Option<bool>) -> Result<AppConfig> {
    let mut config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    if let Some(enable) = ai_override {
        config.ai.enable_ai_analysis = enable;
    }
    validate_api_key(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scrape(
    urls: &[String],
    output: &Path,
    ai_override: Option<bool>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path, ai_override)?;
    let scrape_config = Arc::new(ScrapeConfig::from(&config));

    info!(
        urls = urls.len(),
        ai = config.ai.enable_ai_analysis,
        concurrency = scrape_config.max_concurrency,
        "starting scrape"
    );

    let coordinator = BatchCoordinator::from_config(scrape_config)?;

    let spinner = make_spinner();
    spinner.set_message(format!("Scraping {} URLs", urls.len()));

    let batch = coordinator.process_many(urls).await?;
    spinner.finish_and_clear();

    let path = write_batch_results(&batch, output)?;
    print_batch_summary(&batch);
    println!("  Results written to {}", path.display());
    println!();

    Ok(())
}

async fn cmd_analyze(
    url: &str,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path, None)?;
    let scrape_config = Arc::new(ScrapeConfig::from(&config));

    info!(url, "analyzing single URL");

    let pipeline = PagePipeline::from_config(scrape_config)?;

    let spinner = make_spinner();
    spinner.set_message(format!("Analyzing {url}"));

    let result = pipeline.process_url(url).await;
    spinner.finish_and_clear();

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Analysis written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn cmd_plugins() -> Result<()> {
    let registry = PluginRegistry::with_builtins();

    println!();
    println!("  Registered plugins:");
    for meta in registry.metadata() {
        println!("  {:<14} {:<8} {}", meta.name, meta.version, meta.description);
    }
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Write the batch result as pretty JSON into the output directory.
fn write_batch_results(batch: &BatchResult, output: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output)
        .map_err(|e| eyre!("cannot create output directory '{}': {e}", output.display()))?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = output.join(format!("scraping_results_{timestamp}.json"));

    let json = serde_json::to_string_pretty(batch)?;
    std::fs::write(&path, json)
        .map_err(|e| eyre!("cannot write results to '{}': {e}", path.display()))?;

    Ok(path)
}

/// Print a human-readable batch summary.
fn print_batch_summary(batch: &BatchResult) {
    println!();
    println!("  Scrape complete");
    println!("  URLs processed:  {}", batch.processed_count);
    println!("  Succeeded:       {}", batch.success_count);
    println!("  Failed:          {}", batch.failure_count);
    println!("  Images found:    {}", batch.summary.total_images);
    println!("  Videos found:    {}", batch.summary.total_videos);
    println!("  Links found:     {}", batch.summary.total_links);
    println!(
        "  Avg quality:     {:.2}/10",
        batch.summary.average_quality_score
    );
    println!("  AI decisions:    {}", batch.summary.ai_decisions);

    if !batch.errors.is_empty() {
        println!();
        println!("  Failures:");
        for (url, reason) in &batch.errors {
            println!("    {url}: {reason}");
        }
    }
}

/// Spinner used while a scrape is in flight.
fn make_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}
