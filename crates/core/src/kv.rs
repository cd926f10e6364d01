//! Key-value store capability used for the per-user generation lock and the
//! daily free-quota counter.
//!
//! The orchestrator only depends on the [`KeyValueStore`] trait, so the
//! backing store can be any cache with atomic set-if-not-exists and
//! increment primitives. [`InMemoryKvStore`] is the single-process
//! implementation used in tests and local development.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::CoreError;

/// Minimal atomic key-value contract: get, set-if-not-exists with TTL,
/// delete, increment, expire.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Set `key` to `value` with a TTL only if it does not already exist.
    /// Returns `true` if the key was set (i.e. the caller owns it).
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CoreError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CoreError>;

    /// Atomically increment an integer key, treating an absent key as 0.
    /// Returns the new value.
    async fn incr(&self, key: &str) -> Result<i64, CoreError>;

    /// Set or replace the TTL on an existing key. No-op if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Single-process [`KeyValueStore`] with real TTL handling.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.get(key) {
            if !existing.is_expired(now) {
                return Ok(false);
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, CoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let current = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.value.parse::<i64>().map_err(|_| {
                    CoreError::Internal(format!("Key '{key}' holds a non-integer value"))
                })?
            }
            _ => 0,
        };
        let next = current + 1;
        // Preserve any existing expiry; a fresh counter has none until the
        // caller sets one via `expire`.
        let expires_at = entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .and_then(|e| e.expires_at);
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired(now) {
                entries.remove(key);
            } else {
                entry.expires_at = Some(now + ttl);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
