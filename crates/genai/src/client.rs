//! HTTP client for the `generateContent` endpoint.
//!
//! Retry policy: safety rejections, rate limits, and deadline breaches are
//! terminal for the call; only empty responses and transport faults consume
//! the retry budget (default 1 extra attempt).

use std::time::Duration;

use async_trait::async_trait;
use decora_core::error::CoreError;
use decora_core::prompt::BuiltPrompt;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::outcome::{classify_response, GeneratedImage, GenerateOutcome};

/// Errors surfaced by the generation client.
#[derive(Debug, thiserror::Error)]
pub enum GenAiError {
    /// The call exceeded its deadline. Never retried internally.
    #[error("Generation request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider returned HTTP 429. Never retried internally.
    #[error("Generation service is rate limited")]
    RateLimited,

    /// The prompt was rejected before generation.
    #[error("Prompt blocked by the provider: {0}")]
    PromptBlocked(String),

    /// Generated output was withheld on safety grounds.
    #[error("Generated content blocked by safety filters")]
    SafetyBlocked,

    /// Retry budget exhausted on transient faults.
    #[error("Generation failed after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },
}

impl From<GenAiError> for CoreError {
    fn from(err: GenAiError) -> Self {
        match err {
            GenAiError::Timeout(_) => CoreError::GenerationTimeout,
            GenAiError::RateLimited => CoreError::ServiceBusy,
            GenAiError::PromptBlocked(reason) => CoreError::PromptBlocked(reason),
            GenAiError::SafetyBlocked => CoreError::SafetyBlocked,
            GenAiError::Exhausted { .. } => CoreError::GenerationFailed(err.to_string()),
        }
    }
}

/// Connection settings for the provider.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// Base API URL, e.g. `https://generativelanguage.googleapis.com`.
    pub api_url: String,
    pub api_key: String,
    /// Model identifier, e.g. `gemini-2.5-flash-image`.
    pub model: String,
    /// Hard deadline on one generation call.
    pub timeout: Duration,
    /// Extra attempts after the first on transient faults.
    pub max_retries: u32,
    pub temperature: f64,
}

/// Seam for the orchestrator: anything that can turn a prompt (plus an
/// optional inline room photo) into image bytes.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &BuiltPrompt,
        room_image_base64: Option<&str>,
    ) -> Result<GeneratedImage, GenAiError>;

    /// Model identifier recorded on generation records.
    fn model(&self) -> &str;
}

/// Client for a Gemini-style multimodal generation API.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GenAiConfig,
}

impl GeminiClient {
    pub fn new(config: GenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_url, self.config.model
        )
    }

    /// One request/response cycle under the deadline.
    ///
    /// The timeout bounds the whole exchange, body read included: a provider
    /// that returns headers promptly and then stalls mid-body still trips
    /// the deadline.
    async fn attempt_once(&self, body: &Value) -> Result<GenerateOutcome, AttemptError> {
        tokio::time::timeout(self.config.timeout, self.exchange(body))
            .await
            .map_err(|_| AttemptError::Timeout)?
    }

    /// Send one request and classify the fully-read response.
    async fn exchange(&self, body: &Value) -> Result<GenerateOutcome, AttemptError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::RateLimited);
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AttemptError::Transient(format!(
                "provider returned {status}: {text}"
            )));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| AttemptError::Transient(format!("invalid response body: {e}")))?;
        Ok(classify_response(&parsed))
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &BuiltPrompt,
        room_image_base64: Option<&str>,
    ) -> Result<GeneratedImage, GenAiError> {
        let body = build_request_body(prompt, room_image_base64, self.config.temperature);
        let attempts = self.config.max_retries + 1;
        let mut last_fault = String::new();

        for attempt in 1..=attempts {
            match self.attempt_once(&body).await {
                Ok(GenerateOutcome::Success(image)) => {
                    tracing::info!(
                        model = %self.config.model,
                        attempt,
                        "Generation succeeded",
                    );
                    return Ok(image);
                }
                Ok(GenerateOutcome::PromptBlocked(reason)) => {
                    return Err(GenAiError::PromptBlocked(reason));
                }
                Ok(GenerateOutcome::SafetyBlocked) => return Err(GenAiError::SafetyBlocked),
                Ok(GenerateOutcome::Empty) => {
                    tracing::warn!(attempt, "Provider response contained no image part");
                    last_fault = "provider returned no image".to_string();
                }
                Err(AttemptError::Timeout) => {
                    return Err(GenAiError::Timeout(self.config.timeout));
                }
                Err(AttemptError::RateLimited) => return Err(GenAiError::RateLimited),
                Err(AttemptError::Transient(message)) => {
                    tracing::warn!(attempt, error = %message, "Generation attempt failed");
                    last_fault = message;
                }
            }
        }

        Err(GenAiError::Exhausted {
            attempts,
            message: last_fault,
        })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Per-attempt failure, before retry dispatch.
enum AttemptError {
    Timeout,
    RateLimited,
    Transient(String),
}

/// Build the `generateContent` request body.
///
/// With a room image the payload pairs the inline bytes with the text
/// prompt; otherwise it is text-only. Pure, so it can be asserted on.
pub fn build_request_body(
    prompt: &BuiltPrompt,
    room_image_base64: Option<&str>,
    temperature: f64,
) -> Value {
    let parts = match room_image_base64 {
        Some(data) => json!([
            { "inlineData": { "mimeType": "image/jpeg", "data": data } },
            { "text": prompt.generation_prompt },
        ]),
        None => json!([{ "text": prompt.generation_prompt }]),
    };

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "systemInstruction": { "parts": [{ "text": prompt.system_instruction }] },
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "temperature": temperature,
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
