//! Subcommand handlers.

use crate::{Commands, ConfigAction};
use anyhow::Context;
use finrag_core::config::FinragConfig;
use finrag_rag::eval::{EvaluationHarness, load_dataset};
use finrag_rag::{PipelineServices, RagPipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn handle_command(
    command: Commands,
    config: FinragConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Ask { question } => handle_ask(&question, &config).await,
        Commands::Eval {
            limit,
            output,
            data,
            concurrency,
        } => {
            let options = EvalOptions::resolve(&config, limit, output, data, concurrency);
            handle_eval(options, &config).await
        }
        Commands::Config { action } => handle_config(action, &config, workspace),
    }
}

async fn build_pipeline(config: &FinragConfig) -> anyhow::Result<RagPipeline> {
    let services = PipelineServices::from_config(config)
        .await
        .context("Failed to initialize pipeline services")?;
    Ok(RagPipeline::new(&services, config)?)
}

async fn handle_ask(question: &str, config: &FinragConfig) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config).await?;

    println!("\nRunning pipeline for:\n{}\n", question);
    let state = pipeline.run(question).await?;

    println!("\nFinal Answer:");
    println!("{}", state.answer);
    println!("\nReasoning:");
    println!("{}", state.generation);
    Ok(())
}

/// Evaluation settings after applying command-line overrides to the config.
#[derive(Debug, Clone, PartialEq)]
struct EvalOptions {
    limit: Option<usize>,
    output: PathBuf,
    data: PathBuf,
    concurrency: usize,
}

impl EvalOptions {
    fn resolve(
        config: &FinragConfig,
        limit: Option<usize>,
        output: Option<PathBuf>,
        data: Option<PathBuf>,
        concurrency: Option<usize>,
    ) -> Self {
        // A limit of 0 means every row.
        let limit = Some(limit.unwrap_or(config.evaluation_sample_limit)).filter(|n| *n > 0);
        Self {
            limit,
            output: output.unwrap_or_else(|| config.evaluation.output_path.clone()),
            data: data.unwrap_or_else(|| config.evaluation.data_path.clone()),
            concurrency: concurrency.unwrap_or(config.evaluation.concurrency).max(1),
        }
    }
}

async fn handle_eval(options: EvalOptions, config: &FinragConfig) -> anyhow::Result<()> {
    let examples = load_dataset(&options.data, options.limit)
        .await
        .with_context(|| format!("Failed to load dataset {}", options.data.display()))?;
    println!("Evaluating {} examples...", examples.len());

    let pipeline = build_pipeline(config).await?;
    let harness = EvaluationHarness::new(Arc::new(pipeline), options.concurrency);
    let report = harness
        .run_and_save(&examples, &options.output)
        .await
        .with_context(|| format!("Failed to write results to {}", options.output.display()))?;

    println!("\nResults summary:");
    println!("{}", report.summary);
    println!("Results saved to {}", options.output.display());
    Ok(())
}

fn handle_config(action: ConfigAction, config: &FinragConfig, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".finrag");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&FinragConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
