//! Frontend service - generates the standalone HTML player for a story

use std::sync::Arc;

use crate::application::ports::outbound::LlmPort;
use crate::application::services::extraction;
use crate::application::services::generative_service::{GenerativeError, GenerativeService};
use crate::domain::entities::StoryGraph;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error(transparent)]
    Generative(#[from] GenerativeError),
    /// No usable FRONTEND_CODE block after every allowed attempt
    #[error("failed to generate a usable frontend after {attempts} attempts")]
    NoUsableOutput { attempts: u32 },
    #[error("failed to serialize story for the frontend prompt: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Generates a self-contained HTML/JS page that plays the story graph
pub struct FrontendService<L: LlmPort> {
    generative: Arc<GenerativeService<L>>,
}

impl<L: LlmPort> FrontendService<L> {
    pub fn new(generative: Arc<GenerativeService<L>>) -> Self {
        Self { generative }
    }

    /// Ask the model for a player page, retrying when the response carries
    /// no plausible HTML document.
    pub async fn generate(&self, story: &StoryGraph) -> Result<String, FrontendError> {
        tracing::info!(title = %story.title, "generating story frontend");

        let story_json = serde_json::to_string_pretty(story)?;
        let prompt = build_frontend_prompt(&story_json);

        for attempt in 1..=MAX_ATTEMPTS {
            let response = self.generative.complete(&prompt, 0.7, None).await?;

            match extraction::extract_block(&response, "FRONTEND_CODE") {
                Some(code) if looks_like_html(&code) => {
                    tracing::info!("frontend generation completed");
                    return Ok(code);
                }
                Some(_) => tracing::warn!(
                    attempt,
                    max_attempts = MAX_ATTEMPTS,
                    "frontend block did not look like an HTML document"
                ),
                None => tracing::warn!(
                    attempt,
                    max_attempts = MAX_ATTEMPTS,
                    "no FRONTEND_CODE block in response"
                ),
            }
        }

        Err(FrontendError::NoUsableOutput {
            attempts: MAX_ATTEMPTS,
        })
    }
}

fn looks_like_html(code: &str) -> bool {
    let lower = code.to_lowercase();
    lower.contains("<html") || lower.contains("<!doctype html")
}

fn build_frontend_prompt(story_json: &str) -> String {
    format!(
        r#"You are a senior frontend engineer. Given the following story.json, generate a single self-contained HTML file (inline CSS and JavaScript, no external dependencies) that lets a player play the interactive story. Render the current state's text, offer its choices as buttons, and follow the chosen action's target state. The player can make only one choice at a time. Terminal states show an ending screen with a restart button.

story.json:
{story_json}

Return your response as plain text with ASCII characters inside:
<FRONTEND_CODE>
[complete HTML document here]
</FRONTEND_CODE>
"#
    )
}
