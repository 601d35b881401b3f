//! Outbound ports - Interfaces that the application requires from external systems

mod artifact_port;
mod llm_port;
mod planner_port;

pub use artifact_port::{ArtifactError, ArtifactStorePort};
pub use llm_port::{CompletionRequest, CompletionResponse, LlmError, LlmPort};
pub use planner_port::{PlannerError, PlannerPort};
