//! Tagged classification of provider responses.
//!
//! Two independent safety signals exist: a prompt-level block
//! (`promptFeedback.blockReason`) and a candidate-level `SAFETY` finish
//! reason. Both are terminal and never retried. A well-formed response with
//! no usable image part is [`GenerateOutcome::Empty`] — the one case treated
//! as plausibly transient.

use serde_json::Value;

/// Successful provider output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Raw image bytes, base64-encoded as returned inline by the provider.
    pub image_base64: String,
    /// Token usage, if the provider reported it.
    pub prompt_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

/// What a single well-formed provider response amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    Success(GeneratedImage),
    /// The prompt itself was rejected before any generation.
    PromptBlocked(String),
    /// Output was generated but withheld on safety grounds.
    SafetyBlocked,
    /// No image part in an otherwise valid response; retryable.
    Empty,
}

/// Classify a parsed `generateContent` response body.
pub fn classify_response(body: &Value) -> GenerateOutcome {
    if let Some(reason) = body
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return GenerateOutcome::PromptBlocked(reason.to_string());
    }

    let candidate = body.pointer("/candidates/0");

    if let Some(finish) = candidate
        .and_then(|c| c.get("finishReason"))
        .and_then(Value::as_str)
    {
        if finish == "SAFETY" {
            return GenerateOutcome::SafetyBlocked;
        }
    }

    let image = candidate
        .and_then(|c| c.pointer("/content/parts"))
        .and_then(Value::as_array)
        .and_then(|parts| {
            parts
                .iter()
                .find_map(|p| p.pointer("/inlineData/data").and_then(Value::as_str))
        });

    match image {
        Some(data) if !data.is_empty() => GenerateOutcome::Success(GeneratedImage {
            image_base64: data.to_string(),
            prompt_tokens: usage(body, "promptTokenCount"),
            total_tokens: usage(body, "totalTokenCount"),
        }),
        _ => GenerateOutcome::Empty,
    }
}

fn usage(body: &Value, field: &str) -> Option<i32> {
    body.pointer("/usageMetadata")
        .and_then(|u| u.get(field))
        .and_then(Value::as_i64)
        .map(|n| n as i32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
