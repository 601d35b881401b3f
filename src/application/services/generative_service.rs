//! Generative service - completion calls with bounded retry and backoff

use std::time::Duration;

use rand::Rng;

use crate::application::ports::outbound::{CompletionRequest, LlmError, LlmPort};

/// Retry schedule for transient completion failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Exponentially growing delay for the given 1-based attempt, capped at
    /// `max_delay`, with a little jitter so parallel runs don't sync up
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.max_delay);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
        capped + jitter
    }
}

/// Failures surfaced by [`GenerativeService::complete`]
#[derive(Debug, thiserror::Error)]
pub enum GenerativeError {
    /// Transient failures persisted through every allowed attempt
    #[error("completion failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: LlmError,
    },
    /// Non-retryable failure from the backend
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Wraps an [`LlmPort`] with retry/backoff. Holds no other state; one
/// instance is shared by every prompt-issuing service in a pipeline run.
pub struct GenerativeService<L: LlmPort> {
    llm: L,
    policy: RetryPolicy,
}

impl<L: LlmPort> GenerativeService<L> {
    pub fn new(llm: L) -> Self {
        Self {
            llm,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one prompt to completion, retrying transient failures with
    /// exponential backoff. The final attempt's failure propagates typed.
    pub async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, GenerativeError> {
        let mut request = CompletionRequest::new(prompt).with_temperature(temperature);
        if let Some(limit) = max_tokens {
            request = request.with_max_tokens(limit);
        }

        let mut attempt = 1;
        loop {
            match self.llm.complete(request.clone()).await {
                Ok(response) => {
                    tracing::debug!(
                        model = %response.model,
                        tokens = response.tokens_used,
                        "completion succeeded"
                    );
                    return Ok(response.content);
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient completion failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(GenerativeError::RetriesExhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => return Err(GenerativeError::Llm(e)),
            }
        }
    }
}
