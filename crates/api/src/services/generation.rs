//! Generation orchestrator.
//!
//! One entry point, [`GenerationService::generate`], runs the full flow:
//! acquire the per-user lock, settle billing, load and authorize the design,
//! assemble the prompt, call the provider, persist the image, and write the
//! result back to the design. On any failure after billing, the record is
//! marked `FAILED` and a paid debit is refunded; the lock is released on
//! every path and the original error is what the caller sees.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use decora_core::billing::{
    billing_path, daily_counter_key, free_remaining, generation_lock_key, BillingPath,
    DAILY_COUNTER_TTL, DAILY_FREE_LIMIT, GENERATION_COST_CREDITS, GENERATION_LOCK_TTL,
};
use decora_core::credits::CreditLedger;
use decora_core::error::CoreError;
use decora_core::kv::KeyValueStore;
use decora_core::prompt::{
    build_prompt, build_reimagine_prompt, BuiltPrompt, PromptBuilderInput, PromptOption,
};
use decora_core::types::DbId;
use decora_db::models::design::{DesignForGeneration, UpdateDesignImage, DESIGN_STATUS_GENERATED};
use decora_db::models::generation::{
    to_public, CompleteGeneration, CreateGeneration, GenerationListQuery, GenerationType,
    PublicGeneration,
};
use decora_db::store::{DesignStore, GenerationStore};
use decora_genai::ImageGenerator;
use serde::Serialize;

use crate::storage::ImageStore;

/// Caller-supplied parameters for one generation attempt.
#[derive(Debug, Clone, Default)]
pub struct GenerateInput {
    pub design_id: DbId,
    /// Free-form request text appended to the prompt.
    pub free_text: Option<String>,
    /// When set, switches to the reimagine flow with this room photo.
    pub room_image_url: Option<String>,
    /// Placement guidance for the reimagine flow.
    pub placement_instructions: Option<String>,
}

/// Quota and balance snapshot shown before the user starts a generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatusSummary {
    pub free_limit: i64,
    pub free_used_today: i64,
    pub free_remaining: i64,
    pub credit_balance: i64,
}

/// Orchestrates generation attempts against its collaborator contracts.
pub struct GenerationService {
    generations: Arc<dyn GenerationStore>,
    designs: Arc<dyn DesignStore>,
    kv: Arc<dyn KeyValueStore>,
    ledger: Arc<dyn CreditLedger>,
    generator: Arc<dyn ImageGenerator>,
    images: Arc<dyn ImageStore>,
}

impl GenerationService {
    pub fn new(
        generations: Arc<dyn GenerationStore>,
        designs: Arc<dyn DesignStore>,
        kv: Arc<dyn KeyValueStore>,
        ledger: Arc<dyn CreditLedger>,
        generator: Arc<dyn ImageGenerator>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            generations,
            designs,
            kv,
            ledger,
            generator,
            images,
        }
    }

    /// Run one generation attempt for `user_id`.
    ///
    /// At most one attempt per user runs at a time; a concurrent call fails
    /// fast with [`CoreError::GenerationInProgress`] and touches nothing.
    pub async fn generate(
        &self,
        user_id: DbId,
        input: GenerateInput,
    ) -> Result<PublicGeneration, CoreError> {
        let lock_key = generation_lock_key(user_id);
        if !self.kv.set_nx(&lock_key, "1", GENERATION_LOCK_TTL).await? {
            return Err(CoreError::GenerationInProgress);
        }

        let result = self.generate_locked(user_id, &input).await;

        // Release on every path. A failed release only delays the next
        // attempt until the TTL backstop clears it.
        if let Err(err) = self.kv.delete(&lock_key).await {
            tracing::warn!(user_id, error = %err, "Failed to release generation lock");
        }

        result
    }

    /// The billed flow, running under the per-user lock.
    async fn generate_locked(
        &self,
        user_id: DbId,
        input: &GenerateInput,
    ) -> Result<PublicGeneration, CoreError> {
        let today = Utc::now().date_naive();
        let counter_key = daily_counter_key(user_id, today);
        let free_used = self.free_used(&counter_key).await?;
        let path = billing_path(free_used);

        tracing::info!(
            user_id,
            design_id = input.design_id,
            billing_path = ?path,
            free_used,
            "Starting generation",
        );

        // Paid attempts are debited up front; failure below compensates.
        if path == BillingPath::Paid {
            self.ledger
                .deduct_credits(user_id, GENERATION_COST_CREDITS, input.design_id)
                .await?;
        }

        let started = Instant::now();
        let mut record_id: Option<DbId> = None;

        match self.run_attempt(user_id, input, path, started, &mut record_id).await {
            Ok(generation) => {
                if path == BillingPath::Free {
                    self.bump_free_counter(&counter_key).await;
                }
                tracing::info!(
                    user_id,
                    generation_id = generation.id,
                    duration_ms = generation.duration_ms,
                    "Generation completed",
                );
                Ok(generation)
            }
            Err(err) => {
                self.compensate(user_id, input.design_id, path, started, record_id, &err)
                    .await;
                Err(err)
            }
        }
    }

    /// The happy path: load, authorize, prompt, record, generate, persist.
    async fn run_attempt(
        &self,
        user_id: DbId,
        input: &GenerateInput,
        path: BillingPath,
        started: Instant,
        record_id: &mut Option<DbId>,
    ) -> Result<PublicGeneration, CoreError> {
        let loaded = self
            .designs
            .find_for_generation(input.design_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Design",
                id: input.design_id,
            })?;
        if loaded.design.user_id != user_id {
            return Err(CoreError::AccessDenied {
                entity: "Design",
                id: input.design_id,
            });
        }

        let room_image = match non_empty(&input.room_image_url) {
            Some(url) => Some(self.images.load_room_image(url).await?),
            None => None,
        };
        let (prompt, generation_type) = assemble_prompt(&loaded, input, room_image.is_some());

        let record = self
            .generations
            .create(&CreateGeneration {
                user_id,
                design_id: input.design_id,
                prompt: prompt.full_prompt_for_log.clone(),
                user_free_text: non_empty(&input.free_text).map(str::to_string),
                model: self.generator.model().to_string(),
                generation_type,
                room_image_url: non_empty(&input.room_image_url).map(str::to_string),
                placement_instructions: non_empty(&input.placement_instructions)
                    .map(str::to_string),
                was_free: path == BillingPath::Free,
                credits_used: match path {
                    BillingPath::Free => 0,
                    BillingPath::Paid => GENERATION_COST_CREDITS as i32,
                },
            })
            .await?;
        *record_id = Some(record.id);

        let image = self
            .generator
            .generate(&prompt, room_image.as_deref())
            .await
            .map_err(CoreError::from)?;

        let stored = self
            .images
            .save_generated_image(user_id, record.id, &image.image_base64)
            .await?;

        let completed = self
            .generations
            .mark_completed(
                record.id,
                &CompleteGeneration {
                    image_url: stored.image_url.clone(),
                    thumbnail_url: stored.thumbnail_url.clone(),
                    prompt_tokens: image.prompt_tokens,
                    total_tokens: image.total_tokens,
                    duration_ms: elapsed_ms(started),
                },
            )
            .await?;

        self.designs
            .update_design_image(
                input.design_id,
                &UpdateDesignImage {
                    image_url: stored.image_url,
                    thumbnail_url: stored.thumbnail_url,
                    status: DESIGN_STATUS_GENERATED.to_string(),
                },
            )
            .await?;

        Ok(to_public(&completed))
    }

    /// Undo the side effects of a failed attempt. Compensation failures are
    /// logged, never allowed to mask the original error.
    async fn compensate(
        &self,
        user_id: DbId,
        design_id: DbId,
        path: BillingPath,
        started: Instant,
        record_id: Option<DbId>,
        original: &CoreError,
    ) {
        tracing::warn!(
            user_id,
            design_id,
            error = %original,
            "Generation failed, compensating",
        );

        if let Some(id) = record_id {
            if let Err(err) = self
                .generations
                .mark_failed(id, &original.to_string(), elapsed_ms(started))
                .await
            {
                tracing::error!(generation_id = id, error = %err, "Failed to mark generation failed");
            }
        }

        if path == BillingPath::Paid {
            if let Err(err) = self
                .ledger
                .refund_credits(user_id, GENERATION_COST_CREDITS, design_id)
                .await
            {
                tracing::error!(user_id, error = %err, "Failed to refund generation credit");
            }
        }
    }

    /// Today's free-use count. An absent counter reads as zero; a counter
    /// holding a non-integer value also reads as zero, but loudly, since it
    /// means something else wrote to the key.
    async fn free_used(&self, counter_key: &str) -> Result<i64, CoreError> {
        let Some(raw) = self.kv.get(counter_key).await? else {
            return Ok(0);
        };
        match raw.parse() {
            Ok(n) => Ok(n),
            Err(_) => {
                tracing::warn!(
                    key = counter_key,
                    value = %raw,
                    "Free-use counter holds a non-integer value; treating as 0",
                );
                Ok(0)
            }
        }
    }

    /// Bump the daily counter after a successful free generation. The first
    /// increment of the day arms its expiry. Counter faults are logged only:
    /// the image was already delivered.
    async fn bump_free_counter(&self, counter_key: &str) {
        match self.kv.incr(counter_key).await {
            Ok(1) => {
                if let Err(err) = self.kv.expire(counter_key, DAILY_COUNTER_TTL).await {
                    tracing::warn!(error = %err, "Failed to set free-counter expiry");
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Failed to bump free-use counter");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Read operations
    // -----------------------------------------------------------------------

    /// Quota and balance snapshot for the authenticated user.
    pub async fn get_status(&self, user_id: DbId) -> Result<GenerationStatusSummary, CoreError> {
        let today = Utc::now().date_naive();
        let free_used = self.free_used(&daily_counter_key(user_id, today)).await?;
        let balance = self.ledger.get_balance(user_id).await?;
        Ok(GenerationStatusSummary {
            free_limit: DAILY_FREE_LIMIT,
            free_used_today: free_used,
            free_remaining: free_remaining(free_used),
            credit_balance: balance.balance,
        })
    }

    /// Fetch one generation, enforcing ownership.
    pub async fn get_generation(
        &self,
        user_id: DbId,
        id: DbId,
    ) -> Result<PublicGeneration, CoreError> {
        let generation = self
            .generations
            .find_by_id(id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Generation",
                id,
            })?;
        if generation.user_id != user_id {
            return Err(CoreError::AccessDenied {
                entity: "Generation",
                id,
            });
        }
        Ok(to_public(&generation))
    }

    /// The authenticated user's generation history.
    pub async fn get_user_generations(
        &self,
        user_id: DbId,
        query: &GenerationListQuery,
    ) -> Result<Vec<PublicGeneration>, CoreError> {
        let rows = self.generations.find_by_user(user_id, query).await?;
        Ok(rows.iter().map(to_public).collect())
    }

    /// All generations across users. Admin only; the route enforces the role.
    pub async fn list_all_generations(
        &self,
        query: &GenerationListQuery,
    ) -> Result<Vec<PublicGeneration>, CoreError> {
        let rows = self.generations.find_all(query).await?;
        Ok(rows.iter().map(to_public).collect())
    }
}

/// Pick the prompt shape from the loaded design and caller input.
fn assemble_prompt(
    loaded: &DesignForGeneration,
    input: &GenerateInput,
    has_room_image: bool,
) -> (BuiltPrompt, GenerationType) {
    let builder_input = PromptBuilderInput {
        category_name: loaded.category_name.clone(),
        category_description: loaded.category_description.clone(),
        options: loaded
            .options
            .iter()
            .map(|o| PromptOption {
                group_name: o.group_name.clone(),
                group_slug: o.group_slug.clone(),
                value_label: o.value_label.clone(),
                prompt_hint: o.prompt_hint.clone(),
            })
            .collect(),
        free_text: non_empty(&input.free_text).map(str::to_string),
    };

    if has_room_image {
        (
            build_reimagine_prompt(&builder_input, input.placement_instructions.as_deref()),
            GenerationType::Reimagine,
        )
    } else {
        (build_prompt(&builder_input), GenerationType::Scratch)
    }
}

fn elapsed_ms(started: Instant) -> i32 {
    started.elapsed().as_millis().min(i32::MAX as u128) as i32
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
