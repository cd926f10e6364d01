//! In-memory collaborators for exercising the generation orchestrator
//! without Postgres or a live provider.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use decora_api::services::GenerationService;
use decora_api::storage::{ImageStore, StoredImage};
use decora_core::credits::InMemoryCreditLedger;
use decora_core::error::CoreError;
use decora_core::kv::InMemoryKvStore;
use decora_core::prompt::BuiltPrompt;
use decora_core::types::DbId;
use decora_db::models::design::{
    Design, DesignForGeneration, DesignOptionRow, UpdateDesignImage,
};
use decora_db::models::generation::{
    CompleteGeneration, CreateGeneration, Generation, GenerationListQuery, GenerationStatus,
};
use decora_db::store::{DesignStore, GenerationStore};
use decora_genai::{GenAiError, GeneratedImage, ImageGenerator};

// ---------------------------------------------------------------------------
// Generation store
// ---------------------------------------------------------------------------

/// In-memory [`GenerationStore`] backed by a plain map.
#[derive(Default)]
pub struct MockGenerationStore {
    rows: Mutex<HashMap<DbId, Generation>>,
    next_id: Mutex<DbId>,
}

impl MockGenerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one row for assertions.
    pub fn row(&self, id: DbId) -> Option<Generation> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    /// Number of records ever created.
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationStore for MockGenerationStore {
    async fn create(&self, input: &CreateGeneration) -> Result<Generation, CoreError> {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = *next;
        drop(next);

        let now = Utc::now();
        let row = Generation {
            id,
            user_id: input.user_id,
            design_id: input.design_id,
            prompt: input.prompt.clone(),
            user_free_text: input.user_free_text.clone(),
            model: input.model.clone(),
            status: GenerationStatus::Processing.as_str().to_string(),
            generation_type: input.generation_type.as_str().to_string(),
            room_image_url: input.room_image_url.clone(),
            placement_instructions: input.placement_instructions.clone(),
            image_url: None,
            thumbnail_url: None,
            error_message: None,
            prompt_tokens: None,
            total_tokens: None,
            was_free: input.was_free,
            credits_used: input.credits_used,
            duration_ms: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().insert(id, row.clone());
        Ok(row)
    }

    async fn mark_completed(
        &self,
        id: DbId,
        done: &CompleteGeneration,
    ) -> Result<Generation, CoreError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "Generation",
            id,
        })?;
        row.status = GenerationStatus::Completed.as_str().to_string();
        row.image_url = Some(done.image_url.clone());
        row.thumbnail_url = Some(done.thumbnail_url.clone());
        row.prompt_tokens = done.prompt_tokens;
        row.total_tokens = done.total_tokens;
        row.duration_ms = Some(done.duration_ms);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn mark_failed(
        &self,
        id: DbId,
        error_message: &str,
        duration_ms: i32,
    ) -> Result<bool, CoreError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&id) else {
            return Ok(false);
        };
        row.status = GenerationStatus::Failed.as_str().to_string();
        row.error_message = Some(error_message.to_string());
        row.duration_ms = Some(duration_ms);
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Generation>, CoreError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: DbId,
        q: &GenerationListQuery,
    ) -> Result<Vec<Generation>, CoreError> {
        Ok(self.filtered(q, Some(user_id)))
    }

    async fn find_all(&self, q: &GenerationListQuery) -> Result<Vec<Generation>, CoreError> {
        Ok(self.filtered(q, None))
    }
}

impl MockGenerationStore {
    fn filtered(&self, q: &GenerationListQuery, user_id: Option<DbId>) -> Vec<Generation> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<Generation> = rows
            .values()
            .filter(|r| user_id.is_none_or(|u| r.user_id == u))
            .filter(|r| q.status.as_deref().is_none_or(|s| r.status == s))
            .filter(|r| {
                q.generation_type
                    .as_deref()
                    .is_none_or(|t| r.generation_type == t)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.id.cmp(&a.id));
        matched
            .into_iter()
            .skip(q.clamped_offset() as usize)
            .take(q.clamped_limit() as usize)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Design store
// ---------------------------------------------------------------------------

/// In-memory [`DesignStore`] that records image write-backs.
#[derive(Default)]
pub struct MockDesignStore {
    designs: Mutex<HashMap<DbId, DesignForGeneration>>,
    updates: Mutex<Vec<(DbId, UpdateDesignImage)>>,
}

impl MockDesignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, design: DesignForGeneration) {
        self.designs
            .lock()
            .unwrap()
            .insert(design.design.id, design);
    }

    /// Image write-backs applied so far, in order.
    pub fn updates(&self) -> Vec<(DbId, UpdateDesignImage)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl DesignStore for MockDesignStore {
    async fn find_for_generation(
        &self,
        design_id: DbId,
    ) -> Result<Option<DesignForGeneration>, CoreError> {
        Ok(self.designs.lock().unwrap().get(&design_id).cloned())
    }

    async fn update_design_image(
        &self,
        design_id: DbId,
        update: &UpdateDesignImage,
    ) -> Result<(), CoreError> {
        if !self.designs.lock().unwrap().contains_key(&design_id) {
            return Err(CoreError::NotFound {
                entity: "Design",
                id: design_id,
            });
        }
        self.updates
            .lock()
            .unwrap()
            .push((design_id, update.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Arguments of one recorded provider call.
#[derive(Debug, Clone)]
pub struct GeneratorCall {
    pub prompt: BuiltPrompt,
    pub had_room_image: bool,
}

/// Scripted [`ImageGenerator`]: pops pre-loaded results in order and records
/// every call. An empty script yields a default success.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<GeneratedImage, GenAiError>>>,
    calls: Mutex<Vec<GeneratorCall>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&self, err: GenAiError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn default_image() -> GeneratedImage {
    GeneratedImage {
        image_base64: "aW1hZ2UtYnl0ZXM=".to_string(),
        prompt_tokens: Some(12),
        total_tokens: Some(480),
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &BuiltPrompt,
        room_image_base64: Option<&str>,
    ) -> Result<GeneratedImage, GenAiError> {
        self.calls.lock().unwrap().push(GeneratorCall {
            prompt: prompt.clone(),
            had_room_image: room_image_base64.is_some(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(default_image()))
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

// ---------------------------------------------------------------------------
// Image store
// ---------------------------------------------------------------------------

/// In-memory [`ImageStore`]: registered room images resolve, saves are
/// recorded and answered with deterministic URLs.
#[derive(Default)]
pub struct FakeImageStore {
    room_images: Mutex<HashMap<String, String>>,
    saves: Mutex<Vec<(DbId, DbId)>>,
}

impl FakeImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_room_image(&self, url: &str, base64: &str) {
        self.room_images
            .lock()
            .unwrap()
            .insert(url.to_string(), base64.to_string());
    }

    /// `(user_id, generation_id)` pairs saved so far.
    pub fn saves(&self) -> Vec<(DbId, DbId)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn save_generated_image(
        &self,
        user_id: DbId,
        generation_id: DbId,
        _image_base64: &str,
    ) -> Result<StoredImage, CoreError> {
        self.saves.lock().unwrap().push((user_id, generation_id));
        Ok(StoredImage {
            image_url: format!("http://cdn.test/generations/{user_id}/{generation_id}.png"),
            thumbnail_url: format!(
                "http://cdn.test/generations/{user_id}/{generation_id}_thumb.png"
            ),
        })
    }

    async fn load_room_image(&self, room_image_url: &str) -> Result<String, CoreError> {
        self.room_images
            .lock()
            .unwrap()
            .get(room_image_url)
            .cloned()
            .ok_or_else(|| {
                CoreError::Validation(format!("Room image not found: {room_image_url}"))
            })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A [`GenerationService`] wired entirely to in-memory collaborators, with
/// handles kept for assertions.
pub struct TestHarness {
    pub service: GenerationService,
    pub generations: Arc<MockGenerationStore>,
    pub designs: Arc<MockDesignStore>,
    pub kv: Arc<InMemoryKvStore>,
    pub ledger: Arc<InMemoryCreditLedger>,
    pub generator: Arc<ScriptedGenerator>,
    pub images: Arc<FakeImageStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        let generations = Arc::new(MockGenerationStore::new());
        let designs = Arc::new(MockDesignStore::new());
        let kv = Arc::new(InMemoryKvStore::new());
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let generator = Arc::new(ScriptedGenerator::new());
        let images = Arc::new(FakeImageStore::new());

        let service = GenerationService::new(
            generations.clone(),
            designs.clone(),
            kv.clone(),
            ledger.clone(),
            generator.clone(),
            images.clone(),
        );

        Self {
            service,
            generations,
            designs,
            kv,
            ledger,
            generator,
            images,
        }
    }
}

/// A sofa design owned by `user_id`, with two selected options.
pub fn sofa_design(design_id: DbId, user_id: DbId) -> DesignForGeneration {
    let now = Utc::now();
    DesignForGeneration {
        design: Design {
            id: design_id,
            user_id,
            category_id: 1,
            name: "Living room sofa".to_string(),
            status: "DRAFT".to_string(),
            image_url: None,
            thumbnail_url: None,
            created_at: now,
            updated_at: now,
        },
        category_name: "three-seat sofa".to_string(),
        category_description: Some("A low, modern silhouette.".to_string()),
        options: vec![
            DesignOptionRow {
                group_name: "Upholstery".to_string(),
                group_slug: "upholstery".to_string(),
                group_display_order: 1,
                value_label: "Bouclé, cream".to_string(),
                prompt_hint: Some("soft looped wool texture".to_string()),
            },
            DesignOptionRow {
                group_name: "Legs".to_string(),
                group_slug: "legs".to_string(),
                group_display_order: 2,
                value_label: "Walnut, tapered".to_string(),
                prompt_hint: None,
            },
        ],
    }
}
