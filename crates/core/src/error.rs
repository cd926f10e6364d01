//! Domain error taxonomy.
//!
//! Every variant carries a stable machine-readable code (see
//! [`CoreError::code`]) so HTTP clients can branch on the failure kind
//! without parsing messages.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Access denied: {entity} with id {id} does not belong to the caller")]
    AccessDenied { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The per-user generation lock is already held.
    #[error("A generation is already in progress for this user")]
    GenerationInProgress,

    /// The ledger rejected the debit.
    #[error("Insufficient credits for this generation")]
    InsufficientCredits,

    /// The provider rejected the prompt before generating anything.
    #[error("The prompt was blocked: {0}")]
    PromptBlocked(String),

    /// The provider generated output but withheld it on safety grounds.
    #[error("The generated content was blocked by safety filters; adjust your input and try again")]
    SafetyBlocked,

    /// The provider call exceeded its deadline.
    #[error("Generation timed out; you may retry")]
    GenerationTimeout,

    /// The provider is rate limiting us.
    #[error("The generation service is busy; try again in a moment")]
    ServiceBusy,

    /// Transient-fault retry budget exhausted.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::AccessDenied { .. } => "FORBIDDEN",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::GenerationInProgress => "GENERATION_IN_PROGRESS",
            CoreError::InsufficientCredits => "INSUFFICIENT_CREDITS",
            CoreError::PromptBlocked(_) => "PROMPT_BLOCKED",
            CoreError::SafetyBlocked => "SAFETY_BLOCKED",
            CoreError::GenerationTimeout => "GENERATION_TIMEOUT",
            CoreError::ServiceBusy => "SERVICE_BUSY",
            CoreError::GenerationFailed(_) => "GENERATION_FAILED",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
