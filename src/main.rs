//! QuestForge - Planner-validated interactive story generation
//!
//! The pipeline:
//! - Phase 1 compiles a Lore premise into a PDDL domain/problem pair via an
//!   OpenAI-compatible model and refines it against a classical planner
//!   until a plan exists
//! - Phase 2 turns the validated quest into a branching StoryGraph and a
//!   standalone HTML player

mod application;
mod domain;
mod infrastructure;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::ports::outbound::{ArtifactStorePort, PlannerPort};
use crate::application::services::{
    GenerativeService, PipelineConfig, QuestPipeline, RetryPolicy,
};
use crate::infrastructure::artifacts::FileArtifactStore;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::fast_downward::FastDownwardPlanner;
use crate::infrastructure::openai::OpenAiClient;

/// QuestForge - turn a narrative premise into a planner-validated interactive story
#[derive(Parser, Debug)]
#[command(name = "questforge")]
#[command(about = "Planner-validated interactive story generation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Phase 1: generate the PDDL pair and validate it with the planner
    Phase1 {
        /// Path to the lore file (JSON or plain text)
        #[arg(long)]
        lore_path: Option<PathBuf>,
    },
    /// Phase 2: generate the story graph and the HTML player
    Phase2 {
        /// Path to the lore file (JSON or plain text)
        #[arg(long)]
        lore_path: Option<PathBuf>,
    },
    /// Run the complete pipeline (phase 1 + phase 2)
    Run {
        /// Path to the lore file (JSON or plain text)
        #[arg(long)]
        lore_path: Option<PathBuf>,
    },
    /// Check the environment and configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "questforge=debug"
    } else {
        "questforge=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting QuestForge");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Completion endpoint: {}", config.openai_base_url);
    tracing::info!("  Model: {}", config.openai_model);
    tracing::info!("  Planner: {}", config.planner_path.display());

    // One set of services per run; everything is passed in explicitly
    let llm = OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.openai_model,
        Duration::from_secs(config.llm_timeout_secs),
    );
    let generative = Arc::new(GenerativeService::new(llm).with_policy(RetryPolicy {
        max_attempts: config.llm_max_retries,
        ..RetryPolicy::default()
    }));
    let planner: Arc<dyn PlannerPort> =
        Arc::new(FastDownwardPlanner::new(&config.planner_path, &config.work_dir));
    let artifacts: Arc<dyn ArtifactStorePort> =
        Arc::new(FileArtifactStore::new(&config.data_dir, &config.resources_dir));

    let pipeline = QuestPipeline::new(
        generative,
        planner,
        artifacts.clone(),
        PipelineConfig {
            max_iterations: config.max_reflection_iterations,
            search_strategy: config.planner_search.clone(),
            planner_timeout: Duration::from_secs(config.planner_timeout_secs),
        },
    );

    match cli.command {
        Commands::Phase1 { lore_path } => {
            ensure_requirements(&pipeline).await?;
            let lore = artifacts.load_lore(lore_path.as_deref()).await?;
            let outcome = pipeline.run_phase1(&lore).await?;
            tracing::info!(
                elapsed_ms = outcome.validation.elapsed.as_millis() as u64,
                plan_steps = outcome.validation.plan.as_ref().map(|p| p.len()).unwrap_or(0),
                reflections = outcome.reflections,
                "phase 1 completed successfully"
            );
        }
        Commands::Phase2 { lore_path } => {
            let lore = artifacts.load_lore(lore_path.as_deref()).await?;
            let path = pipeline.run_phase2(&lore).await?;
            tracing::info!(frontend = %path.display(), "phase 2 completed successfully");
        }
        Commands::Run { lore_path } => {
            ensure_requirements(&pipeline).await?;
            let lore = artifacts.load_lore(lore_path.as_deref()).await?;
            let path = pipeline.run_full(&lore).await?;
            tracing::info!(frontend = %path.display(), "pipeline completed successfully");
        }
        Commands::Check => {
            let issues = pipeline.check_requirements().await;
            if issues.is_empty() {
                tracing::info!("all requirements satisfied");
            } else {
                for issue in &issues {
                    tracing::error!("  - {issue}");
                }
                anyhow::bail!("{} requirement(s) not met", issues.len());
            }
        }
    }

    Ok(())
}

async fn ensure_requirements<L: crate::application::ports::outbound::LlmPort>(
    pipeline: &QuestPipeline<L>,
) -> anyhow::Result<()> {
    let issues = pipeline.check_requirements().await;
    if issues.is_empty() {
        return Ok(());
    }
    for issue in &issues {
        tracing::error!("  - {issue}");
    }
    anyhow::bail!("requirements not met; run `questforge check` for details")
}
