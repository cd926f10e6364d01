//! Store traits consumed by the generation orchestrator, plus the Postgres
//! implementation.
//!
//! The traits exist so the orchestrator can be exercised against in-memory
//! fakes; [`PgStore`] delegates to the repositories.

use async_trait::async_trait;
use decora_core::error::CoreError;
use decora_core::types::DbId;

use crate::models::design::{DesignForGeneration, UpdateDesignImage};
use crate::models::generation::{
    CompleteGeneration, CreateGeneration, Generation, GenerationListQuery,
};
use crate::repositories::{DesignRepo, GenerationRepo};
use crate::DbPool;

/// Persistence contract for generation records.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn create(&self, input: &CreateGeneration) -> Result<Generation, CoreError>;
    async fn mark_completed(
        &self,
        id: DbId,
        done: &CompleteGeneration,
    ) -> Result<Generation, CoreError>;
    async fn mark_failed(
        &self,
        id: DbId,
        error_message: &str,
        duration_ms: i32,
    ) -> Result<bool, CoreError>;
    async fn find_by_id(&self, id: DbId) -> Result<Option<Generation>, CoreError>;
    async fn find_by_user(
        &self,
        user_id: DbId,
        q: &GenerationListQuery,
    ) -> Result<Vec<Generation>, CoreError>;
    async fn find_all(&self, q: &GenerationListQuery) -> Result<Vec<Generation>, CoreError>;
}

/// Persistence contract for design lookups and the image write-back.
#[async_trait]
pub trait DesignStore: Send + Sync {
    async fn find_for_generation(
        &self,
        design_id: DbId,
    ) -> Result<Option<DesignForGeneration>, CoreError>;
    async fn update_design_image(
        &self,
        design_id: DbId,
        update: &UpdateDesignImage,
    ) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

/// Postgres-backed [`GenerationStore`] + [`DesignStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn db_err(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Internal(format!("Database error: {err}"))
}

#[async_trait]
impl GenerationStore for PgStore {
    async fn create(&self, input: &CreateGeneration) -> Result<Generation, CoreError> {
        GenerationRepo::create(&self.pool, input).await.map_err(db_err)
    }

    async fn mark_completed(
        &self,
        id: DbId,
        done: &CompleteGeneration,
    ) -> Result<Generation, CoreError> {
        GenerationRepo::mark_completed(&self.pool, id, done)
            .await
            .map_err(db_err)
    }

    async fn mark_failed(
        &self,
        id: DbId,
        error_message: &str,
        duration_ms: i32,
    ) -> Result<bool, CoreError> {
        GenerationRepo::mark_failed(&self.pool, id, error_message, duration_ms)
            .await
            .map_err(db_err)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Generation>, CoreError> {
        GenerationRepo::find_by_id(&self.pool, id).await.map_err(db_err)
    }

    async fn find_by_user(
        &self,
        user_id: DbId,
        q: &GenerationListQuery,
    ) -> Result<Vec<Generation>, CoreError> {
        GenerationRepo::find_by_user(&self.pool, user_id, q)
            .await
            .map_err(db_err)
    }

    async fn find_all(&self, q: &GenerationListQuery) -> Result<Vec<Generation>, CoreError> {
        GenerationRepo::find_all(&self.pool, q).await.map_err(db_err)
    }
}

#[async_trait]
impl DesignStore for PgStore {
    async fn find_for_generation(
        &self,
        design_id: DbId,
    ) -> Result<Option<DesignForGeneration>, CoreError> {
        DesignRepo::find_for_generation(&self.pool, design_id)
            .await
            .map_err(db_err)
    }

    async fn update_design_image(
        &self,
        design_id: DbId,
        update: &UpdateDesignImage,
    ) -> Result<(), CoreError> {
        let updated = DesignRepo::update_design_image(&self.pool, design_id, update)
            .await
            .map_err(db_err)?;
        if !updated {
            return Err(CoreError::NotFound {
                entity: "Design",
                id: design_id,
            });
        }
        Ok(())
    }
}
