//! Text-generation backend and the retry/failover wrapper around it.
//!
//! [`TextGenerator`] is the seam to the model API; [`GeminiClient`] is the
//! real implementation and tests substitute scripted ones. [`Generator`]
//! combines the rate limiter and failover controller around a single
//! generation call: wait for quota, attempt, classify, retry with failover,
//! give up after a bounded number of attempts.
//!
//! A quota error switches endpoints because the active one is walled off for
//! up to a minute, while a less-preferred endpoint is usually available
//! immediately. An empty response does not switch: the endpoint answered,
//! the output was just blank.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::error::GenerateError;
use crate::failover::FailoverController;
use crate::limiter::RateLimiter;
use crate::utils::truncate_for_log;

/// A backend that can complete a prompt on a named model.
pub trait TextGenerator {
    /// Send `prompt` to `model` and return the raw completion text.
    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, GenerateError>;
}

/// Request body for the Gemini `generateContent` endpoint.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

impl TextGenerator for GeminiClient {
    #[instrument(level = "debug", skip_all, fields(model = %model))]
    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, GenerateError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(GenerateError::RateLimited {
                    endpoint: model.to_string(),
                    message,
                });
            }
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| GenerateError::Malformed("response carried no candidates".to_string()))?;
        Ok(text)
    }
}

/// Retry/failover wrapper over a [`TextGenerator`].
///
/// One instance per process, sharing the limiter and failover controller so
/// the rpm ceilings are respected globally.
pub struct Generator<'a, G> {
    client: &'a G,
    limiter: &'a RateLimiter,
    failover: &'a FailoverController,
    config: &'a AppConfig,
}

impl<'a, G: TextGenerator> Generator<'a, G> {
    pub fn new(
        client: &'a G,
        limiter: &'a RateLimiter,
        failover: &'a FailoverController,
        config: &'a AppConfig,
    ) -> Self {
        Self {
            client,
            limiter,
            failover,
            config,
        }
    }

    /// Generate text for `prompt`, retrying with failover on failure.
    ///
    /// Each attempt waits for quota on the active endpoint, sends the call,
    /// and classifies the outcome: a quota error switches endpoints and
    /// pauses 5 seconds, any other error switches and pauses 2 seconds, and
    /// an empty response retries on the same endpoint without switching.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The full prompt text to complete
    /// * `max_attempts` - Attempt budget for this call
    ///
    /// # Returns
    ///
    /// The trimmed completion text, or `None` once the budget is exhausted.
    /// Callers must treat `None` as definitive for this call and not retry
    /// at a higher level.
    #[instrument(level = "info", skip_all, fields(max_attempts))]
    pub async fn generate(&self, prompt: &str, max_attempts: u32) -> Option<String> {
        for attempt in 1..=max_attempts {
            self.wait_for_quota().await;

            let endpoint = self.failover.current();
            let model = match self.config.model_for(&endpoint) {
                Some(model) => model.to_string(),
                None => {
                    // Defensive: a stale pointer is repaired by switching.
                    warn!(endpoint = %endpoint, "no model configured for endpoint");
                    self.failover.switch();
                    continue;
                }
            };

            self.limiter.record_request(&endpoint);
            debug!(attempt, endpoint = %endpoint, model = %model, "generation attempt");

            match self.client.generate_content(&model, prompt).await {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        // The endpoint works; keep it and just try again.
                        warn!(attempt, endpoint = %endpoint, "empty response from model");
                        continue;
                    }
                    info!(attempt, endpoint = %endpoint, chars = text.len(), "generation succeeded");
                    return Some(text.to_string());
                }
                Err(e) if e.is_rate_limit() => {
                    let next = self.failover.switch();
                    warn!(
                        attempt,
                        endpoint = %endpoint,
                        next = %next,
                        error = %truncate_for_log(&e.to_string(), 200),
                        "rate limited; switching endpoint"
                    );
                    sleep(Duration::from_secs(
                        self.config.pipeline.rate_limit_switch_delay_secs,
                    ))
                    .await;
                }
                Err(e) => {
                    // A different endpoint may simply behave better.
                    let next = self.failover.switch();
                    warn!(
                        attempt,
                        endpoint = %endpoint,
                        next = %next,
                        error = %truncate_for_log(&e.to_string(), 200),
                        "generation error; switching endpoint"
                    );
                    sleep(Duration::from_secs(
                        self.config.pipeline.error_switch_delay_secs,
                    ))
                    .await;
                }
            }
        }
        error!(max_attempts, "generation attempts exhausted");
        None
    }

    /// Wait until the current endpoint has quota.
    ///
    /// Checks the global-exhaustion tier first: if every endpoint is
    /// saturated the cooldown timestamp is recorded and the remainder of the
    /// hour is slept before anything else is tried.
    async fn wait_for_quota(&self) {
        if self.limiter.all_endpoints_rate_limited() {
            self.limiter.mark_exhausted();
            error!("every endpoint is rate limited; systemic throttling suspected");
        }
        if let Some(remaining) = self.limiter.cooldown_remaining() {
            error!(secs = remaining.as_secs(), "sleeping out global exhaustion cooldown");
            sleep(remaining).await;
            self.limiter.clear_exhausted();
        }

        let endpoint = self.failover.current();
        let wait = self.limiter.wait_time(&endpoint);
        if !wait.is_zero() {
            info!(endpoint = %endpoint, secs = wait.as_secs_f64(), "waiting for endpoint quota");
            sleep(wait).await;
        }
    }
}
