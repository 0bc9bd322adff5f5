mod options;
mod pipeline;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ssdc")]
#[command(about = "Select accounts out of a source list and harvest their posts")]
struct Cli {
    /// Source list file (`name`, `version`, `references`).
    #[arg(long)]
    source: PathBuf,

    /// Sieve JSON mapping platform to the label or labels to keep.
    #[arg(long)]
    select: String,

    #[arg(long, value_enum)]
    action: Action,

    /// Filter JSON applied to the references before the sieve.
    #[arg(long)]
    filter: Option<String>,

    /// Action option as `key=value`. Repeatable.
    #[arg(long = "option", value_name = "KEY[=VALUE]")]
    options: Vec<String>,

    /// Write collected posts here as pretty-printed JSON.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the selected accounts and stop before harvesting.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Collect the recent posts of every selected Twitter account.
    Timeline,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ssdc_core::load_app_config().context("failed to load configuration")?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log level '{}'", config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    pipeline::run(&cli, &config).await
}
