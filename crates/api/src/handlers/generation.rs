//! Handlers for the generation resource.
//!
//! Generation is started from a design:
//! `POST /designs/{design_id}/generations`; listings and the quota snapshot
//! live under `/generations`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use decora_core::types::DbId;
use decora_db::models::generation::{GenerationListQuery, PublicGeneration};
use serde::Deserialize;
use validator::Validate;

use crate::auth::{AuthUser, RequireAdmin};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::services::{GenerateInput, GenerationStatusSummary};
use crate::state::AppState;

/// Request body for starting a generation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Free-form request text appended to the prompt.
    #[validate(length(max = 500, message = "freeText must be at most 500 characters"))]
    pub free_text: Option<String>,
    /// Room photo URL; switches to the reimagine flow when present.
    #[validate(length(max = 2048, message = "roomImageUrl must be at most 2048 characters"))]
    pub room_image_url: Option<String>,
    /// Placement guidance for the reimagine flow.
    #[validate(length(
        max = 500,
        message = "placementInstructions must be at most 500 characters"
    ))]
    pub placement_instructions: Option<String>,
}

/// POST /api/v1/designs/{design_id}/generations
///
/// Runs the full generation flow synchronously; the response carries the
/// completed record with its image URLs.
pub async fn generate(
    State(state): State<AppState>,
    Path(design_id): Path<DbId>,
    user: AuthUser,
    Json(request): Json<GenerateRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<PublicGeneration>>)> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let generation = state
        .generations
        .generate(
            user.user_id,
            GenerateInput {
                design_id,
                free_text: request.free_text,
                room_image_url: request.room_image_url,
                placement_instructions: request.placement_instructions,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: generation })))
}

/// GET /api/v1/generations/status
pub async fn get_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<GenerationStatusSummary>>> {
    let status = state.generations.get_status(user.user_id).await?;
    Ok(Json(DataResponse { data: status }))
}

/// GET /api/v1/generations
pub async fn list_own(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<GenerationListQuery>,
) -> AppResult<Json<DataResponse<Vec<PublicGeneration>>>> {
    let generations = state
        .generations
        .get_user_generations(user.user_id, &query)
        .await?;
    Ok(Json(DataResponse { data: generations }))
}

/// GET /api/v1/generations/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PublicGeneration>>> {
    let generation = state.generations.get_generation(user.user_id, id).await?;
    Ok(Json(DataResponse { data: generation }))
}

/// GET /api/v1/admin/generations
pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<GenerationListQuery>,
) -> AppResult<Json<DataResponse<Vec<PublicGeneration>>>> {
    let generations = state.generations.list_all_generations(&query).await?;
    Ok(Json(DataResponse { data: generations }))
}
