//! End-to-end orchestrator scenarios against in-memory collaborators:
//! billing exactness, mutual exclusion, and failure compensation.

mod common;

use assert_matches::assert_matches;
use decora_api::services::GenerateInput;
use chrono::Utc;
use decora_core::billing::{
    daily_counter_key, generation_lock_key, DAILY_COUNTER_TTL, DAILY_FREE_LIMIT,
    GENERATION_LOCK_TTL,
};
use decora_core::credits::{CreditLedger, TransactionKind};
use decora_core::error::CoreError;
use decora_core::kv::KeyValueStore;
use decora_genai::GenAiError;

use common::{sofa_design, TestHarness};

const USER: i64 = 7;
const DESIGN: i64 = 42;

fn input() -> GenerateInput {
    GenerateInput {
        design_id: DESIGN,
        ..Default::default()
    }
}

/// Exhaust the user's free quota with successful generations.
async fn use_free_quota(h: &TestHarness) {
    for _ in 0..DAILY_FREE_LIMIT {
        h.service.generate(USER, input()).await.unwrap();
    }
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn free_generation_completes_and_bumps_quota() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));

    let generation = h.service.generate(USER, input()).await.unwrap();

    assert_eq!(generation.status, "COMPLETED");
    assert!(generation.was_free);
    assert_eq!(generation.credits_used, 0);
    assert!(generation.image_url.as_deref().unwrap().ends_with(".png"));
    assert_eq!(generation.prompt_tokens, Some(12));

    // Quota consumed, ledger untouched.
    let status = h.service.get_status(USER).await.unwrap();
    assert_eq!(status.free_used_today, 1);
    assert_eq!(status.free_remaining, DAILY_FREE_LIMIT - 1);
    assert!(h.ledger.transactions(USER).await.is_empty());

    // The parent design received the image.
    let updates = h.designs.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, DESIGN);
    assert_eq!(updates[0].1.status, "GENERATED");
    assert_eq!(h.images.saves(), vec![(USER, generation.id)]);
}

#[tokio::test]
async fn paid_generation_debits_exactly_one_credit() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.ledger.grant(USER, 5).await;
    use_free_quota(&h).await;

    let generation = h.service.generate(USER, input()).await.unwrap();

    assert!(!generation.was_free);
    assert_eq!(generation.credits_used, 1);
    assert_eq!(h.ledger.get_balance(USER).await.unwrap().balance, 4);

    let log = h.ledger.transactions(USER).await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, TransactionKind::Generation);
    assert_eq!(log[0].amount, -1);
    assert_eq!(log[0].ref_id, DESIGN);
}

#[tokio::test]
async fn quota_exhaustion_switches_to_paid() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.ledger.grant(USER, 1).await;

    for _ in 0..DAILY_FREE_LIMIT {
        let generation = h.service.generate(USER, input()).await.unwrap();
        assert!(generation.was_free);
    }
    let paid = h.service.generate(USER, input()).await.unwrap();
    assert!(!paid.was_free);
}

#[tokio::test]
async fn reimagine_flow_attaches_room_photo() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.images
        .register_room_image("http://cdn.test/rooms/7/living.jpg", "cm9vbQ==");

    let generation = h
        .service
        .generate(
            USER,
            GenerateInput {
                design_id: DESIGN,
                room_image_url: Some("http://cdn.test/rooms/7/living.jpg".to_string()),
                placement_instructions: Some("against the far wall".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(generation.generation_type, "REIMAGINE");
    assert_eq!(
        generation.room_image_url.as_deref(),
        Some("http://cdn.test/rooms/7/living.jpg")
    );

    let calls = h.generator.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].had_room_image);
    assert!(calls[0]
        .prompt
        .generation_prompt
        .contains("Placement: against the far wall"));
}

#[tokio::test]
async fn scratch_flow_sends_text_only() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));

    let generation = h.service.generate(USER, input()).await.unwrap();

    assert_eq!(generation.generation_type, "SCRATCH");
    let calls = h.generator.calls();
    assert!(!calls[0].had_room_image);
    assert!(calls[0].prompt.generation_prompt.contains("Upholstery"));
    // The audit prompt on the record matches what was sent.
    assert!(generation.prompt.ends_with(&calls[0].prompt.generation_prompt));
}

// ---------------------------------------------------------------------------
// Billing edges
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broke_user_past_quota_is_rejected_before_any_work() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.ledger.grant(USER, DAILY_FREE_LIMIT).await;
    use_free_quota(&h).await;
    // Drain the balance with paid runs.
    for _ in 0..DAILY_FREE_LIMIT {
        h.service.generate(USER, input()).await.unwrap();
    }
    let records_before = h.generations.count();

    let err = h.service.generate(USER, input()).await.unwrap_err();

    assert_matches!(err, CoreError::InsufficientCredits);
    assert_eq!(h.generations.count(), records_before);
    assert_eq!(h.ledger.get_balance(USER).await.unwrap().balance, 0);
}

#[tokio::test]
async fn failed_paid_generation_is_refunded() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.ledger.grant(USER, 2).await;
    use_free_quota(&h).await;
    h.generator.push_error(GenAiError::Exhausted {
        attempts: 2,
        message: "provider returned no image".to_string(),
    });

    let err = h.service.generate(USER, input()).await.unwrap_err();

    assert_matches!(err, CoreError::GenerationFailed(_));
    assert_eq!(h.ledger.get_balance(USER).await.unwrap().balance, 2);
    let log = h.ledger.transactions(USER).await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].kind, TransactionKind::Refund);
    assert_eq!(log[1].amount, 1);
}

#[tokio::test]
async fn failed_free_generation_does_not_consume_quota() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.generator.push_error(GenAiError::SafetyBlocked);

    let err = h.service.generate(USER, input()).await.unwrap_err();

    assert_matches!(err, CoreError::SafetyBlocked);
    let status = h.service.get_status(USER).await.unwrap();
    assert_eq!(status.free_used_today, 0);
    assert_eq!(status.free_remaining, DAILY_FREE_LIMIT);
}

#[tokio::test]
async fn corrupt_free_counter_reads_as_zero() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    let counter = daily_counter_key(USER, Utc::now().date_naive());
    h.kv
        .set_nx(&counter, "garbage", DAILY_COUNTER_TTL)
        .await
        .unwrap();

    // Status stays readable instead of erroring on the bad value.
    let status = h.service.get_status(USER).await.unwrap();
    assert_eq!(status.free_used_today, 0);

    // The next generation still runs on the free path.
    let generation = h.service.generate(USER, input()).await.unwrap();
    assert!(generation.was_free);
    assert!(h.ledger.transactions(USER).await.is_empty());
}

// ---------------------------------------------------------------------------
// Failure compensation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provider_failure_marks_record_failed() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.generator
        .push_error(GenAiError::Timeout(std::time::Duration::from_secs(60)));

    let err = h.service.generate(USER, input()).await.unwrap_err();

    assert_matches!(err, CoreError::GenerationTimeout);
    assert_eq!(h.generations.count(), 1);
    let row = h.generations.row(1).unwrap();
    assert_eq!(row.status, "FAILED");
    assert!(row.error_message.is_some());
    assert!(row.duration_ms.is_some());
    // No image reached the design.
    assert!(h.designs.updates().is_empty());
    assert!(h.images.saves().is_empty());
}

#[tokio::test]
async fn prompt_block_propagates_with_reason() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.generator
        .push_error(GenAiError::PromptBlocked("PROHIBITED_CONTENT".to_string()));

    let err = h.service.generate(USER, input()).await.unwrap_err();
    assert_matches!(err, CoreError::PromptBlocked(reason) if reason.contains("PROHIBITED_CONTENT"));
}

#[tokio::test]
async fn missing_design_fails_before_a_record_exists() {
    let h = TestHarness::new();

    let err = h.service.generate(USER, input()).await.unwrap_err();

    assert_matches!(err, CoreError::NotFound { entity: "Design", .. });
    assert_eq!(h.generations.count(), 0);
}

#[tokio::test]
async fn foreign_design_is_denied() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, 99));

    let err = h.service.generate(USER, input()).await.unwrap_err();

    assert_matches!(err, CoreError::AccessDenied { entity: "Design", .. });
    assert_eq!(h.generations.count(), 0);
    assert!(h.generator.calls().is_empty());
}

#[tokio::test]
async fn missing_room_image_fails_the_reimagine_flow() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));

    let err = h
        .service
        .generate(
            USER,
            GenerateInput {
                design_id: DESIGN,
                room_image_url: Some("http://cdn.test/rooms/7/gone.jpg".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::Validation(_));
    assert!(h.generator.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Mutual exclusion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_attempt_is_rejected_without_side_effects() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    // Another in-flight attempt holds the lock.
    assert!(h
        .kv
        .set_nx(&generation_lock_key(USER), "1", GENERATION_LOCK_TTL)
        .await
        .unwrap());

    let err = h.service.generate(USER, input()).await.unwrap_err();

    assert_matches!(err, CoreError::GenerationInProgress);
    assert_eq!(h.generations.count(), 0);
    assert!(h.ledger.transactions(USER).await.is_empty());
    assert!(h.generator.calls().is_empty());
}

#[tokio::test]
async fn lock_is_released_after_success_and_failure() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));

    h.service.generate(USER, input()).await.unwrap();
    h.generator.push_error(GenAiError::SafetyBlocked);
    let err = h.service.generate(USER, input()).await.unwrap_err();
    assert_matches!(err, CoreError::SafetyBlocked);

    // A third attempt acquires the lock normally.
    assert!(h.service.generate(USER, input()).await.is_ok());
}

#[tokio::test]
async fn locks_are_per_user() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.designs.insert(sofa_design(43, 8));
    assert!(h
        .kv
        .set_nx(&generation_lock_key(USER), "1", GENERATION_LOCK_TTL)
        .await
        .unwrap());

    // Another user generates while user 7 is locked.
    let generation = h
        .service
        .generate(
            8,
            GenerateInput {
                design_id: 43,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(generation.user_id, 8);
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_generation_enforces_ownership() {
    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    let generation = h.service.generate(USER, input()).await.unwrap();

    assert!(h.service.get_generation(USER, generation.id).await.is_ok());
    let err = h
        .service
        .get_generation(8, generation.id)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::AccessDenied { entity: "Generation", .. });

    let err = h.service.get_generation(USER, 9999).await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "Generation", .. });
}

#[tokio::test]
async fn listings_are_scoped_and_filtered() {
    use decora_db::models::generation::GenerationListQuery;

    let h = TestHarness::new();
    h.designs.insert(sofa_design(DESIGN, USER));
    h.designs.insert(sofa_design(43, 8));

    h.service.generate(USER, input()).await.unwrap();
    h.generator.push_error(GenAiError::SafetyBlocked);
    let _ = h.service.generate(USER, input()).await;
    h.service
        .generate(8, GenerateInput { design_id: 43, ..Default::default() })
        .await
        .unwrap();

    let own = h
        .service
        .get_user_generations(USER, &GenerationListQuery::default())
        .await
        .unwrap();
    assert_eq!(own.len(), 2);
    assert!(own.iter().all(|g| g.user_id == USER));

    let failed = h
        .service
        .get_user_generations(
            USER,
            &GenerationListQuery {
                status: Some("FAILED".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);

    let all = h
        .service
        .list_all_generations(&GenerationListQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}
