//! LLM port - Interface for text-completion backends

use async_trait::async_trait;

/// A single-shot completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Overrides the adapter's configured model when set
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Completion returned by the backend
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    /// Model that actually served the request
    pub model: String,
    pub tokens_used: u32,
}

/// Errors a completion backend can report.
///
/// Transient failures are eligible for retry with backoff; everything else
/// propagates immediately.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Network failure, rate limit, or server-side error
    #[error("transient completion failure: {0}")]
    Transient(String),
    /// Request rejected by the API (bad credentials, malformed request)
    #[error("completion API error: {0}")]
    Api(String),
    /// The backend answered but the completion content was empty
    #[error("empty response content from completion endpoint")]
    EmptyResponse,
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Port for text-completion backends (OpenAI-compatible or otherwise)
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Perform one completion round-trip. No retry at this level.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
