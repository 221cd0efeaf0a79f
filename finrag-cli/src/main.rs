//! finrag CLI: answer financial questions from filings and evaluate the pipeline.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// finrag: retrieval-augmented question answering over financial reports
#[derive(Parser, Debug)]
#[command(name = "finrag", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds `.finrag/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Use retrieval output directly instead of scored reranking
    #[arg(long)]
    ground_truth: bool,

    /// Skip answer generation and extraction
    #[arg(long)]
    no_generation: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Answer a single financial question
    Ask {
        /// Financial question to answer
        #[arg(long)]
        question: String,
    },
    /// Run the pipeline over a labeled dataset and score the answers
    Eval {
        /// Maximum number of examples (0 evaluates every row)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Where to write the result table
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Dataset CSV with id, question and answer columns
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Examples evaluated concurrently
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file to the workspace
    Init,
    /// Print the merged configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "finrag", "finrag")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "finrag.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if !finrag_core::config::config_exists(Some(&workspace)) && cli.config.is_none() {
        tracing::debug!("No configuration file found, using defaults");
    }

    let mut config = finrag_core::config::load_config(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Apply CLI overrides
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if cli.ground_truth {
        config.use_ground_truth_retrieval = true;
    }
    if cli.no_generation {
        config.disable_llm_generation = true;
    }
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    commands::handle_command(cli.command, config, &workspace).await
}
