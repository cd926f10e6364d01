//! Repository for the `generations` table.

use decora_core::types::DbId;
use sqlx::PgPool;

use crate::models::generation::{
    CompleteGeneration, CreateGeneration, Generation, GenerationListQuery, GenerationStatus,
};

/// Column list for generations queries.
const COLUMNS: &str = "id, user_id, design_id, prompt, user_free_text, model, \
    status, generation_type, room_image_url, placement_instructions, \
    image_url, thumbnail_url, error_message, prompt_tokens, total_tokens, \
    was_free, credits_used, duration_ms, created_at, updated_at";

/// CRUD operations for generation records.
pub struct GenerationRepo;

impl GenerationRepo {
    /// Insert a new record in `PROCESSING`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGeneration,
    ) -> Result<Generation, sqlx::Error> {
        let query = format!(
            "INSERT INTO generations
                (user_id, design_id, prompt, user_free_text, model, status,
                 generation_type, room_image_url, placement_instructions,
                 was_free, credits_used)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(input.user_id)
            .bind(input.design_id)
            .bind(&input.prompt)
            .bind(&input.user_free_text)
            .bind(&input.model)
            .bind(GenerationStatus::Processing.as_str())
            .bind(input.generation_type.as_str())
            .bind(&input.room_image_url)
            .bind(&input.placement_instructions)
            .bind(input.was_free)
            .bind(input.credits_used)
            .fetch_one(pool)
            .await
    }

    /// Transition a record to `COMPLETED` with its outputs, returning the
    /// updated row.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        done: &CompleteGeneration,
    ) -> Result<Generation, sqlx::Error> {
        let query = format!(
            "UPDATE generations SET
                status = $1,
                image_url = $2,
                thumbnail_url = $3,
                prompt_tokens = $4,
                total_tokens = $5,
                duration_ms = $6,
                updated_at = NOW()
             WHERE id = $7
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(GenerationStatus::Completed.as_str())
            .bind(&done.image_url)
            .bind(&done.thumbnail_url)
            .bind(done.prompt_tokens)
            .bind(done.total_tokens)
            .bind(done.duration_ms)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Transition a record to `FAILED` with the captured error and duration.
    /// Returns `true` if a row was updated.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
        duration_ms: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generations SET
                status = $1,
                error_message = $2,
                duration_ms = $3,
                updated_at = NOW()
             WHERE id = $4",
        )
        .bind(GenerationStatus::Failed.as_str())
        .bind(error_message)
        .bind(duration_ms)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a record by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generations WHERE id = $1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's records, newest first, with optional status/type filters.
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
        q: &GenerationListQuery,
    ) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generations
             WHERE user_id = $1
               AND ($2::text IS NULL OR status = $2)
               AND ($3::text IS NULL OR generation_type = $3)
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(user_id)
            .bind(&q.status)
            .bind(&q.generation_type)
            .bind(q.clamped_limit())
            .bind(q.clamped_offset())
            .fetch_all(pool)
            .await
    }

    /// List all records regardless of owner (admin), newest first.
    pub async fn find_all(
        pool: &PgPool,
        q: &GenerationListQuery,
    ) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generations
             WHERE ($1::text IS NULL OR status = $1)
               AND ($2::text IS NULL OR generation_type = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(&q.status)
            .bind(&q.generation_type)
            .bind(q.clamped_limit())
            .bind(q.clamped_offset())
            .fetch_all(pool)
            .await
    }
}
