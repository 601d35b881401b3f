//! Application services - prompt agents and the orchestration loop

pub mod extraction;
mod frontend_service;
mod generative_service;
mod pddl_generation_service;
mod pipeline_service;
mod reflection_service;
mod story_service;

pub use frontend_service::{FrontendError, FrontendService};
pub use generative_service::{GenerativeError, GenerativeService, RetryPolicy};
pub use pddl_generation_service::{PddlError, PddlGenerationService};
pub use pipeline_service::{PhaseOneOutcome, PipelineConfig, PipelineError, QuestPipeline};
pub use reflection_service::ReflectionService;
pub use story_service::{StoryError, StoryService};
