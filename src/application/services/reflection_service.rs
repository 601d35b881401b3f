//! Reflection service - repairs a rejected PDDL pair from the planner's error

use std::sync::Arc;

use crate::application::ports::outbound::{ArtifactStorePort, LlmPort};
use crate::application::services::extraction;
use crate::application::services::generative_service::GenerativeService;
use crate::application::services::pddl_generation_service::PddlError;
use crate::domain::entities::{Lore, PddlDomain, PddlProblem};
use crate::domain::value_objects::ValidationResult;

/// Builds the reflection prompt from the prior artifacts plus the observed
/// validation failure and extracts a corrected pair from the response.
pub struct ReflectionService<L: LlmPort> {
    generative: Arc<GenerativeService<L>>,
    artifacts: Arc<dyn ArtifactStorePort>,
}

impl<L: LlmPort> ReflectionService<L> {
    pub fn new(generative: Arc<GenerativeService<L>>, artifacts: Arc<dyn ArtifactStorePort>) -> Self {
        Self {
            generative,
            artifacts,
        }
    }

    /// Produce a corrected pair. Names carry over from the current pair so
    /// the problem keeps referencing the same domain.
    pub async fn reflect(
        &self,
        lore: &Lore,
        domain: &PddlDomain,
        problem: &PddlProblem,
        validation: &ValidationResult,
    ) -> Result<(PddlDomain, PddlProblem), PddlError> {
        tracing::info!(error = %validation.error_message, "reflecting on PDDL validation errors");

        let example_domain = self.artifacts.load_example_domain().await?;
        let example_problem = self.artifacts.load_example_problem().await?;

        let prompt = build_reflection_prompt(
            lore,
            domain,
            problem,
            validation,
            &example_domain,
            &example_problem,
        );
        let response = self.generative.complete(&prompt, 0.7, None).await?;

        let (domain_text, problem_text) = extraction::extract_pddl_blocks(&response);
        let (domain_text, problem_text) = match (domain_text, problem_text) {
            (Some(d), Some(p)) => (d, p),
            _ => return Err(PddlError::MissingBlocks),
        };

        let fixed_domain = PddlDomain::new(&domain.name, domain_text)?;
        let fixed_problem = PddlProblem::new(&problem.name, &problem.domain_name, problem_text)?;

        tracing::info!("PDDL reflection produced a corrected pair");
        Ok((fixed_domain, fixed_problem))
    }
}

fn build_reflection_prompt(
    lore: &Lore,
    domain: &PddlDomain,
    problem: &PddlProblem,
    validation: &ValidationResult,
    example_domain: &str,
    example_problem: &str,
) -> String {
    format!(
        r#"You are a PDDL expert that helps correct PDDL model files. The following domain and problem were generated, but validation failed with the planner.

Analyze the PDDL files and the validation error, then provide corrected and consistent versions according to the original quest requirements.

ORIGINAL QUEST REQUIREMENTS:
Title: {title}
Description: {description}
Initial State: {initial_state}
Goal: {goal}
World Context: {world_context}
Characters: {characters}
Locations: {locations}
Items: {items}
Obstacles: {obstacles}

CURRENT DOMAIN.PDDL:
{domain_content}

CURRENT PROBLEM.PDDL:
{problem_content}

VALIDATION ERROR:
{error}

ANALYSIS INSTRUCTIONS:
1. Identify the specific issues causing the validation failure
2. Check for syntax errors, missing predicates, inconsistent object names
3. Ensure the initial state is properly defined
4. Verify that the goal is achievable with the available actions
5. Make sure all predicates used in actions are defined in the domain
6. Ensure object types are consistent between domain and problem

Return the corrected PDDL files in plain text with ASCII characters inside:
<DOMAIN_PDDL>
[corrected domain content here]
</DOMAIN_PDDL>

<PROBLEM_PDDL>
[corrected problem content here]
</PROBLEM_PDDL>

Pay attention to PDDL syntax. Each PDDL block is encapsulated in ( and ).
Example: (define (predicate-name ?param) ; Comment describing the predicate)

Here are examples of valid PDDL files for reference:

EXAMPLE DOMAIN:
{example_domain}

EXAMPLE PROBLEM:
{example_problem}

Ensure your corrected PDDL:
1. Fixes the specific validation errors
2. Maintains the original quest narrative
3. Is syntactically correct
4. Has a solvable path from initial state to goal
5. Includes clear comments explaining the fixes made
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
        domain_content = domain.content,
        problem_content = problem.content,
        error = validation.error_message,
    )
}
