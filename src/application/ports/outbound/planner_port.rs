//! Planner port - Interface to the external classical planner

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::value_objects::ValidationResult;

/// Fatal planner failures.
///
/// A pair the planner rejects, an unsolvable problem, or a timeout are all
/// *expected* outcomes and come back as `ValidationResult` values; this
/// error type is reserved for a broken or missing installation.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("planner not found at {0}")]
    NotInstalled(PathBuf),
    #[error("failed to run planner: {0}")]
    Io(#[from] std::io::Error),
}

/// Port for the external planner process
#[async_trait]
pub trait PlannerPort: Send + Sync {
    /// Run the planner over an already-persisted domain/problem pair with a
    /// hard wall-clock timeout.
    async fn validate(
        &self,
        domain_path: &Path,
        problem_path: &Path,
        search_strategy: &str,
        timeout: Duration,
    ) -> Result<ValidationResult, PlannerError>;

    /// Whether the planner executable is present and answers `--help`
    async fn check_installation(&self) -> bool;
}
