//! Story service - turns the validated quest into a branching StoryGraph
//!
//! The generative model answers in whatever shape it fancies: a tagged
//! STORY_JSON block, a fenced code block, bare JSON, states as a map or as
//! a list, or the legacy flat format. All of that is normalized right here;
//! downstream code only ever sees a validated [`StoryGraph`].

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::ports::outbound::{ArtifactError, ArtifactStorePort, LlmPort};
use crate::application::services::extraction;
use crate::application::services::generative_service::{GenerativeError, GenerativeService};
use crate::domain::entities::{Lore, PddlDomain, PddlProblem, StoryGraph, StoryState};
use crate::domain::DomainError;

/// Upper bound on diagnostic previews of model output
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error(transparent)]
    Generative(#[from] GenerativeError),
    /// The model answered with nothing usable at all
    #[error("empty narrative response from model")]
    EmptyNarrative,
    /// The selected text did not parse into a story document
    #[error("failed to parse story document: {reason} (preview: {preview})")]
    MalformedJson { reason: String, preview: String },
    /// Parsed fine but violates the graph invariants
    #[error("generated story violates graph invariants: {0}")]
    Invalid(#[from] DomainError),
    #[error("failed to load example artifacts: {0}")]
    Examples(#[from] ArtifactError),
}

/// Builds the StoryGraph from the lore, the final PDDL pair, and the plan
pub struct StoryService<L: LlmPort> {
    generative: Arc<GenerativeService<L>>,
    artifacts: Arc<dyn ArtifactStorePort>,
}

impl<L: LlmPort> StoryService<L> {
    pub fn new(generative: Arc<GenerativeService<L>>, artifacts: Arc<dyn ArtifactStorePort>) -> Self {
        Self {
            generative,
            artifacts,
        }
    }

    pub async fn build(
        &self,
        lore: &Lore,
        domain: &PddlDomain,
        problem: &PddlProblem,
        plan: &[String],
    ) -> Result<StoryGraph, StoryError> {
        tracing::info!(title = %lore.title, plan_steps = plan.len(), "generating interactive story");

        let example_story = self.artifacts.load_example_story().await?;
        let prompt = build_story_prompt(lore, domain, problem, plan, &example_story);
        let response = self.generative.complete(&prompt, 0.7, None).await?;

        let mut story = parse_story_document(&response)?;

        // The lore values are canonical; whatever the model invented for
        // title/description is replaced wholesale.
        story.title = lore.title.clone();
        story.description = lore.description.clone();
        story
            .metadata
            .insert("generated_from_lore".to_string(), serde_json::json!(true));
        story.metadata.insert(
            "original_goal".to_string(),
            serde_json::json!(lore.goal.clone()),
        );
        story.metadata.insert(
            "world_context".to_string(),
            serde_json::json!(lore.world_context.clone()),
        );
        story.metadata.insert(
            "story_id".to_string(),
            serde_json::json!(uuid::Uuid::new_v4().to_string()),
        );
        story.metadata.insert(
            "generated_at".to_string(),
            serde_json::json!(chrono::Utc::now().to_rfc3339()),
        );

        tracing::info!(states = story.states.len(), "story generation completed");
        Ok(story)
    }
}

/// Select the narrative payload from a raw model response and normalize it
/// into a validated graph.
///
/// Selection priority: `<STORY_JSON>` block, fenced JSON block, then the
/// entire response as a last resort.
fn parse_story_document(response: &str) -> Result<StoryGraph, StoryError> {
    let candidate = extraction::extract_block(response, "STORY_JSON")
        .or_else(|| extraction::extract_fenced_json(response).into_iter().next())
        .unwrap_or_else(|| response.trim().to_string());

    if candidate.is_empty() {
        return Err(StoryError::EmptyNarrative);
    }

    let mut doc: serde_json::Value =
        serde_json::from_str(&candidate).map_err(|e| StoryError::MalformedJson {
            reason: e.to_string(),
            preview: preview(&candidate),
        })?;

    let Some(root) = doc.as_object_mut() else {
        return Err(StoryError::MalformedJson {
            reason: "story document is not a JSON object".to_string(),
            preview: preview(&candidate),
        });
    };

    // Some responses ship states as a list; key them by id before dispatch
    if let Some(states) = root.get_mut("states") {
        if let Some(list) = states.as_array() {
            let mut keyed = serde_json::Map::new();
            for (i, state) in list.iter().enumerate() {
                let key = state
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .unwrap_or_else(|| format!("state_{i}"));
                keyed.insert(key, state.clone());
            }
            *states = serde_json::Value::Object(keyed);
        }
    }

    if root.contains_key("states") && root.contains_key("initial_state") {
        let title = str_field(root, "title");
        let description = str_field(root, "description");
        let initial_state = str_field(root, "initial_state");
        let metadata = root
            .get("metadata")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let mut states = BTreeMap::new();
        if let Some(raw_states) = root.get("states").and_then(|v| v.as_object()) {
            for (id, value) in raw_states {
                let state: StoryState = serde_json::from_value(value.clone()).map_err(|e| {
                    StoryError::MalformedJson {
                        reason: format!("state '{id}': {e}"),
                        preview: preview(&candidate),
                    }
                })?;
                states.insert(id.clone(), state);
            }
        }

        Ok(StoryGraph::new(
            title,
            description,
            initial_state,
            states,
            metadata,
        )?)
    } else {
        // Legacy flat shape: {state_id: {text, actions: {label: target}}}
        Ok(StoryGraph::from_legacy_format(root)?)
    }
}

fn str_field(map: &serde_json::Map<String, serde_json::Value>, key: &str) -> String {
    map.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Bounded, char-boundary-safe preview for diagnostics; never the full payload
fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

fn build_story_prompt(
    lore: &Lore,
    domain: &PddlDomain,
    problem: &PddlProblem,
    plan: &[String],
    example_story: &str,
) -> String {
    let plan_str = if plan.is_empty() {
        "No plan available".to_string()
    } else {
        plan.join("\n")
    };

    format!(
        r#"You are an expert interactive storyteller. Given the following quest information, PDDL files, and generated plan, create an engaging interactive story as a finite state machine.

QUEST INFORMATION:
Title: {title}
Description: {description}
Initial State: {initial_state}
Goal: {goal}
World Context: {world_context}
Characters: {characters}
Locations: {locations}
Items: {items}

PDDL DOMAIN:
{domain_content}

PDDL PROBLEM:
{problem_content}

GENERATED PLAN:
{plan_str}

REQUIREMENTS:
1. Create an engaging narrative that follows the quest progression
2. Each state should have rich, descriptive text
3. Provide meaningful choices that advance the story
4. Include both successful and failure paths
5. Make the story feel immersive and interactive
6. Respect the branching factor: {bf_min}-{bf_max} choices per state
7. Target depth: {depth_min}-{depth_max} story steps

Generate a story.json with the following structure:

<STORY_JSON>
{{
  "title": "{title}",
  "description": "{description}",
  "initial_state": "start",
  "states": {{
    "start": {{
      "id": "start",
      "text": "Engaging opening narrative...",
      "actions": [
        {{
          "id": "choice1",
          "text": "Choice 1 description",
          "target_state": "state1",
          "description": "Additional context"
        }}
      ],
      "is_terminal": false,
      "image_url": null,
      "metadata": {{}}
    }},
    "state1": {{
      "id": "state1",
      "text": "Continuation of the story...",
      "actions": [],
      "is_terminal": true,
      "image_url": null,
      "metadata": {{}}
    }}
  }},
  "metadata": {{
    "theme": "fantasy",
    "difficulty": "medium"
  }}
}}
</STORY_JSON>

Use this example structure as inspiration, but make it more original and dynamic:

EXAMPLE STRUCTURE:
{example_story}

Make the story captivating, with rich descriptions and meaningful choices that matter to the outcome. Ensure there are multiple paths and endings based on player choices.
"#,
        title = lore.title,
        description = lore.description,
        initial_state = lore.initial_state,
        goal = lore.goal,
        world_context = lore.world_context,
        characters = lore.characters.join(", "),
        locations = lore.locations.join(", "),
        items = lore.items.join(", "),
        domain_content = domain.content,
        problem_content = problem.content,
        bf_min = lore.branching_factor.min,
        bf_max = lore.branching_factor.max,
        depth_min = lore.depth_constraints.min,
        depth_max = lore.depth_constraints.max,
    )
}
