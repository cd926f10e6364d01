//! Design models as seen by the generation subsystem.
//!
//! Designs are owned by the wider application; this subsystem reads them
//! (with their category and selected options) to build prompts, and writes
//! back the generated image fields as a side effect of a successful run.

use decora_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Design status written after a successful generation.
pub const DESIGN_STATUS_GENERATED: &str = "GENERATED";

/// A row from the `designs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Design {
    pub id: DbId,
    pub user_id: DbId,
    pub category_id: DbId,
    pub name: String,
    pub status: String,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One selected option joined through its group, ordered by the group's
/// display order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DesignOptionRow {
    pub group_name: String,
    pub group_slug: String,
    pub group_display_order: i32,
    pub value_label: String,
    pub prompt_hint: Option<String>,
}

/// A design loaded with everything prompt assembly needs.
#[derive(Debug, Clone)]
pub struct DesignForGeneration {
    pub design: Design,
    pub category_name: String,
    pub category_description: Option<String>,
    /// Selected options, pre-sorted by `group_display_order`.
    pub options: Vec<DesignOptionRow>,
}

/// Image fields written back to the parent design on completion.
#[derive(Debug, Clone)]
pub struct UpdateDesignImage {
    pub image_url: String,
    pub thumbnail_url: String,
    pub status: String,
}
