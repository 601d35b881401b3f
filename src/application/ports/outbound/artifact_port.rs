//! Artifact store port - Interface for pipeline artifact persistence
//!
//! One artifact per logical file, overwritten wholesale on regeneration.
//! Save operations return the written path so callers can hand
//! planner-visible locations to the planner adapter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::entities::{Lore, PddlDomain, PddlProblem, StoryGraph};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("artifact io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed artifact {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Port for persisting and reloading pipeline artifacts
#[async_trait]
pub trait ArtifactStorePort: Send + Sync {
    /// Load lore from the default location, or from `path` when given
    async fn load_lore(&self, path: Option<&Path>) -> Result<Lore, ArtifactError>;
    async fn save_lore(&self, lore: &Lore) -> Result<PathBuf, ArtifactError>;

    async fn save_domain(&self, domain: &PddlDomain) -> Result<PathBuf, ArtifactError>;
    async fn load_domain(&self) -> Result<PddlDomain, ArtifactError>;

    async fn save_problem(&self, problem: &PddlProblem) -> Result<PathBuf, ArtifactError>;
    async fn load_problem(&self) -> Result<PddlProblem, ArtifactError>;

    async fn save_story(&self, story: &StoryGraph) -> Result<PathBuf, ArtifactError>;
    async fn load_story(&self) -> Result<StoryGraph, ArtifactError>;

    async fn save_plan(&self, steps: &[String]) -> Result<PathBuf, ArtifactError>;
    async fn load_plan(&self) -> Result<Vec<String>, ArtifactError>;

    async fn save_frontend(&self, code: &str) -> Result<PathBuf, ArtifactError>;

    /// Known-good reference artifacts embedded in generation prompts
    async fn load_example_domain(&self) -> Result<String, ArtifactError>;
    async fn load_example_problem(&self) -> Result<String, ArtifactError>;
    async fn load_example_story(&self) -> Result<String, ArtifactError>;
}
