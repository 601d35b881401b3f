//! Application configuration

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API key for the OpenAI-compatible completion endpoint
    pub openai_api_key: String,
    /// Base URL of the completion endpoint
    pub openai_base_url: String,
    /// Default model for completion requests
    pub openai_model: String,
    /// Per-request timeout for completion calls, seconds
    pub llm_timeout_secs: u64,
    /// Attempts per completion call (transient failures only)
    pub llm_max_retries: u32,

    /// Path to the planner executable
    pub planner_path: PathBuf,
    /// Wall-clock budget per planner invocation, seconds
    pub planner_timeout_secs: u64,
    /// Search strategy handed to the planner
    pub planner_search: String,
    /// Working directory for planner invocations (the plan side-channel
    /// file lands here)
    pub work_dir: PathBuf,

    /// Ceiling on reflection cycles
    pub max_reflection_iterations: u32,

    /// Directory for generated artifacts
    pub data_dir: PathBuf,
    /// Directory with example domain/problem/story resources
    pub resources_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY environment variable is required")?,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            llm_timeout_secs: env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("LLM_TIMEOUT_SECS must be a number of seconds")?,
            llm_max_retries: env::var("LLM_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("LLM_MAX_RETRIES must be a number")?,

            planner_path: env::var("FAST_DOWNWARD_PATH")
                .unwrap_or_else(|_| "fast-downward-24.06.1/fast-downward.py".to_string())
                .into(),
            planner_timeout_secs: env::var("PLANNER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("PLANNER_TIMEOUT_SECS must be a number of seconds")?,
            planner_search: env::var("PLANNER_SEARCH")
                .unwrap_or_else(|_| "astar(blind())".to_string()),
            work_dir: env::var("WORK_DIR").unwrap_or_else(|_| ".".to_string()).into(),

            max_reflection_iterations: env::var("MAX_REFLECTION_ITERATIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("MAX_REFLECTION_ITERATIONS must be a number")?,

            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()).into(),
            resources_dir: env::var("RESOURCES_DIR")
                .unwrap_or_else(|_| "resources".to_string())
                .into(),
        })
    }
}
