//! Generation record models and DTOs.
//!
//! A `Generation` is one attempt to produce an AI image for a design.
//! Records are created in `PROCESSING` and mutated exactly once, to either
//! `COMPLETED` or `FAILED`. There is no queued state: the flow is
//! synchronous-only.

use decora_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Status / type enums (stored as TEXT)
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationStatus {
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Processing => "PROCESSING",
            GenerationStatus::Completed => "COMPLETED",
            GenerationStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROCESSING" => Some(GenerationStatus::Processing),
            "COMPLETED" => Some(GenerationStatus::Completed),
            "FAILED" => Some(GenerationStatus::Failed),
            _ => None,
        }
    }
}

/// How the image was produced: a studio render from scratch, or the user's
/// room photo reimagined with the piece placed into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationType {
    Scratch,
    Reimagine,
}

impl GenerationType {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationType::Scratch => "SCRATCH",
            GenerationType::Reimagine => "REIMAGINE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCRATCH" => Some(GenerationType::Scratch),
            "REIMAGINE" => Some(GenerationType::Reimagine),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `generations` table.
///
/// Invariant: once the record leaves `PROCESSING`, exactly one of the
/// completion outputs (`image_url` et al.) or `error_message` is populated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Generation {
    pub id: DbId,
    pub user_id: DbId,
    pub design_id: DbId,
    /// Full prompt sent to the provider, retained for audit.
    pub prompt: String,
    pub user_free_text: Option<String>,
    pub model: String,
    pub status: String,
    pub generation_type: String,
    pub room_image_url: Option<String>,
    pub placement_instructions: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error_message: Option<String>,
    pub prompt_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
    pub was_free: bool,
    pub credits_used: i32,
    pub duration_ms: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create / complete DTOs
// ---------------------------------------------------------------------------

/// Input for creating a new generation record (always in `PROCESSING`).
#[derive(Debug, Clone)]
pub struct CreateGeneration {
    pub user_id: DbId,
    pub design_id: DbId,
    pub prompt: String,
    pub user_free_text: Option<String>,
    pub model: String,
    pub generation_type: GenerationType,
    pub room_image_url: Option<String>,
    pub placement_instructions: Option<String>,
    pub was_free: bool,
    pub credits_used: i32,
}

/// Input for completing a generation record.
#[derive(Debug, Clone)]
pub struct CompleteGeneration {
    pub image_url: String,
    pub thumbnail_url: String,
    pub prompt_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
    pub duration_ms: i32,
}

/// Filters and pagination for generation listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationListQuery {
    /// Filter by status string (`PROCESSING`, `COMPLETED`, `FAILED`).
    pub status: Option<String>,
    /// Filter by type string (`SCRATCH`, `REIMAGINE`).
    pub generation_type: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

impl GenerationListQuery {
    pub fn clamped_limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }

    pub fn clamped_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

// ---------------------------------------------------------------------------
// Public representation
// ---------------------------------------------------------------------------

/// Externally-safe representation of a generation.
///
/// Field names are camelCase and timestamps serialize as ISO-8601 strings
/// (chrono's RFC 3339 serde), matching the client contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGeneration {
    pub id: DbId,
    pub user_id: DbId,
    pub design_id: DbId,
    pub prompt: String,
    pub user_free_text: Option<String>,
    pub model: String,
    pub status: String,
    pub generation_type: String,
    pub room_image_url: Option<String>,
    pub placement_instructions: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error_message: Option<String>,
    pub prompt_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
    pub was_free: bool,
    pub credits_used: i32,
    pub duration_ms: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Map a stored record to its public representation.
///
/// Pure: applying it twice to the same record yields identical output.
pub fn to_public(generation: &Generation) -> PublicGeneration {
    PublicGeneration {
        id: generation.id,
        user_id: generation.user_id,
        design_id: generation.design_id,
        prompt: generation.prompt.clone(),
        user_free_text: generation.user_free_text.clone(),
        model: generation.model.clone(),
        status: generation.status.clone(),
        generation_type: generation.generation_type.clone(),
        room_image_url: generation.room_image_url.clone(),
        placement_instructions: generation.placement_instructions.clone(),
        image_url: generation.image_url.clone(),
        thumbnail_url: generation.thumbnail_url.clone(),
        error_message: generation.error_message.clone(),
        prompt_tokens: generation.prompt_tokens,
        total_tokens: generation.total_tokens,
        was_free: generation.was_free,
        credits_used: generation.credits_used,
        duration_ms: generation.duration_ms,
        created_at: generation.created_at,
        updated_at: generation.updated_at,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
