//! PDDL generation service - compiles Lore into an initial domain/problem pair

use std::sync::Arc;

use crate::application::ports::outbound::{ArtifactError, ArtifactStorePort, LlmPort};
use crate::application::services::extraction;
use crate::application::services::generative_service::{GenerativeError, GenerativeService};
use crate::domain::entities::{Lore, PddlDomain, PddlProblem};
use crate::domain::DomainError;

/// Failures while turning model output into a usable PDDL pair
#[derive(Debug, thiserror::Error)]
pub enum PddlError {
    /// The response carried no extractable DOMAIN_PDDL/PROBLEM_PDDL pair
    #[error("failed to extract PDDL blocks from model response")]
    MissingBlocks,
    /// Extracted text failed the structural checks
    #[error("generated PDDL is ill-formed: {0}")]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Generative(#[from] GenerativeError),
    /// Reference artifacts for the prompt could not be loaded
    #[error("failed to load example artifacts: {0}")]
    Examples(#[from] ArtifactError),
}

/// Generates the initial PDDL pair for a quest
pub struct PddlGenerationService<L: LlmPort> {
    generative: Arc<GenerativeService<L>>,
    artifacts: Arc<dyn ArtifactStorePort>,
}

impl<L: LlmPort> PddlGenerationService<L> {
    pub fn new(generative: Arc<GenerativeService<L>>, artifacts: Arc<dyn ArtifactStorePort>) -> Self {
        Self {
            generative,
            artifacts,
        }
    }

    /// Produce a domain/problem pair from the lore.
    ///
    /// Names are derived from the lore title; the problem references the
    /// freshly named domain.
    pub async fn generate(&self, lore: &Lore) -> Result<(PddlDomain, PddlProblem), PddlError> {
        tracing::info!(title = %lore.title, "generating PDDL from lore");

        let example_domain = self.artifacts.load_example_domain().await?;
        let example_problem = self.artifacts.load_example_problem().await?;

        let prompt = build_generation_prompt(lore, &example_domain, &example_problem);
        let response = self.generative.complete(&prompt, 0.7, None).await?;

        let (domain_text, problem_text) = extraction::extract_pddl_blocks(&response);
        let (domain_text, problem_text) = match (domain_text, problem_text) {
            (Some(d), Some(p)) => (d, p),
            _ => return Err(PddlError::MissingBlocks),
        };

        let stem = slugify(&lore.title);
        let domain = PddlDomain::new(format!("{stem}_domain"), domain_text)?;
        let problem = PddlProblem::new(format!("{stem}_problem"), &domain.name, problem_text)?;

        tracing::info!(domain = %domain.name, problem = %problem.name, "PDDL pair generated");
        Ok((domain, problem))
    }
}

fn slugify(title: &str) -> String {
    title.to_lowercase().replace(' ', "_")
}

fn build_generation_prompt(lore: &Lore, example_domain: &str, example_problem: &str) -> String {
    format!(
        r#"You are a PDDL modeler expert. Given the following quest description, generate:
1. A DOMAIN.PDDL file with predicates and actions, each with comments.
2. A PROBLEM.PDDL file with an initial state and goal consistent with the domain.

Quest Information:
Title: {title}
Description: {description}
Initial State: {initial_state}
Goal: {goal}
World Context: {world_context}

Additional Details:
- Characters: {characters}
- Locations: {locations}
- Items: {items}
- Obstacles: {obstacles}

Constraints:
- Branching factor: {bf_min}-{bf_max} choices per state
- Quest depth: {depth_min}-{depth_max} steps

Return your response in plain text with ASCII characters inside:
<DOMAIN_PDDL>
[domain content here]
</DOMAIN_PDDL>

<PROBLEM_PDDL>
[problem content here]
</PROBLEM_PDDL>

Pay attention to PDDL syntax. Each PDDL block is encapsulated in ( and ).
Example: (define (predicate-name ?param) ; Comment describing the predicate)

Here are examples of valid PDDL files:

EXAMPLE DOMAIN:
{example_domain}

EXAMPLE PROBLEM:
{example_problem}

Ensure your generated PDDL:
1. Is syntactically correct
2. Has clear, descriptive comments for each predicate and action
3. Models the quest narrative accurately
4. Includes all necessary objects, predicates, and actions
5. Has a solvable path from initial state to goal
"#,
        title = lore.title,
        description = lore.description,
        initial_state = lore.initial_state,
        goal = lore.goal,
        world_context = lore.world_context,
        characters = lore.characters.join(", "),
        locations = lore.locations.join(", "),
        items = lore.items.join(", "),
        obstacles = lore.obstacles.join(", "),
        bf_min = lore.branching_factor.min,
        bf_max = lore.branching_factor.max,
        depth_min = lore.depth_constraints.min,
        depth_max = lore.depth_constraints.max,
    )
}
