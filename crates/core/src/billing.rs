//! Billing policy: free daily quota, credit cost, lock/counter cache keys.
//!
//! The decision functions here are pure; the orchestrator in `decora-api`
//! reads the counter and ledger, then dispatches on [`BillingPath`].

use std::time::Duration;

use chrono::NaiveDate;

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Policy constants
// ---------------------------------------------------------------------------

/// Free generations allowed per user per calendar day.
pub const DAILY_FREE_LIMIT: i64 = 3;

/// Credits charged for one generation past the free quota.
pub const GENERATION_COST_CREDITS: i64 = 1;

/// TTL backstop on the per-user generation lock. The lock is released
/// explicitly on every code path; the TTL only covers process crashes.
pub const GENERATION_LOCK_TTL: Duration = Duration::from_secs(120);

/// Expiry on the daily free-use counter, set on its first increment of the day.
pub const DAILY_COUNTER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Hard deadline on a single provider generation call.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Billing path decision
// ---------------------------------------------------------------------------

/// Which way a generation attempt is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingPath {
    /// Within the daily free quota; the counter is bumped only on success.
    Free,
    /// Past the quota; one credit is deducted up front, refunded on failure.
    Paid,
}

/// Decide the billing path from today's free-use count.
pub fn billing_path(free_used_today: i64) -> BillingPath {
    if free_used_today < DAILY_FREE_LIMIT {
        BillingPath::Free
    } else {
        BillingPath::Paid
    }
}

/// Free generations the user has left today. Never negative.
pub fn free_remaining(free_used_today: i64) -> i64 {
    (DAILY_FREE_LIMIT - free_used_today).max(0)
}

// ---------------------------------------------------------------------------
// Cache keys
// ---------------------------------------------------------------------------

/// Per-user mutual-exclusion lock key.
pub fn generation_lock_key(user_id: DbId) -> String {
    format!("generation:lock:{user_id}")
}

/// Per-user, per-calendar-day free-use counter key.
///
/// The date is passed in rather than read from the clock so the key builder
/// stays deterministic and testable.
pub fn daily_counter_key(user_id: DbId, date: NaiveDate) -> String {
    format!("generation:free:{user_id}:{}", date.format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
