//! Sitesift CLI — agentic web scraping with AI-assisted analysis.
//!
//! Fetches pages, extracts structured content, scores its quality, runs
//! optional AI analysis, and applies post-processing plugins — for single
//! URLs or concurrent batches.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
