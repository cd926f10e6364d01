//! Credit ledger contract.
//!
//! The ledger's storage is an external collaborator; this subsystem only
//! consumes the contract: atomic balance reads, debits that fail cleanly on
//! insufficient funds, and compensating refunds. The invariant the backing
//! store must uphold: a user's balance always equals the sum of their
//! transaction log, and never goes negative.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// A user's current credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub user_id: DbId,
    pub balance: i64,
}

/// Ledger transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Debit for a generation attempt.
    Generation,
    /// Compensating credit after a failed attempt.
    Refund,
}

/// One entry in the append-only transaction log.
#[derive(Debug, Clone)]
pub struct CreditTransaction {
    pub user_id: DbId,
    /// Negative for debits, positive for refunds.
    pub amount: i64,
    pub kind: TransactionKind,
    /// The design the generation attempt was for.
    pub ref_id: DbId,
    pub at: Timestamp,
}

/// Atomic balance + transaction-log operations.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn get_balance(&self, user_id: DbId) -> Result<Balance, CoreError>;

    /// Debit `amount` credits. Fails with [`CoreError::InsufficientCredits`]
    /// without writing anything if the balance would go negative.
    async fn deduct_credits(
        &self,
        user_id: DbId,
        amount: i64,
        ref_id: DbId,
    ) -> Result<Balance, CoreError>;

    /// Credit `amount` back, offsetting an earlier debit for `ref_id`.
    async fn refund_credits(
        &self,
        user_id: DbId,
        amount: i64,
        ref_id: DbId,
    ) -> Result<Balance, CoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LedgerInner {
    balances: HashMap<DbId, i64>,
    log: Vec<CreditTransaction>,
}

/// Single-process [`CreditLedger`] for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryCreditLedger {
    inner: Mutex<LedgerInner>,
}

impl InMemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's balance (outside the generation debit/refund flow).
    pub async fn grant(&self, user_id: DbId, amount: i64) {
        let mut inner = self.inner.lock().await;
        *inner.balances.entry(user_id).or_insert(0) += amount;
    }

    /// Snapshot of the transaction log for a user, oldest first.
    pub async fn transactions(&self, user_id: DbId) -> Vec<CreditTransaction> {
        let inner = self.inner.lock().await;
        inner
            .log
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn get_balance(&self, user_id: DbId) -> Result<Balance, CoreError> {
        let inner = self.inner.lock().await;
        Ok(Balance {
            user_id,
            balance: inner.balances.get(&user_id).copied().unwrap_or(0),
        })
    }

    async fn deduct_credits(
        &self,
        user_id: DbId,
        amount: i64,
        ref_id: DbId,
    ) -> Result<Balance, CoreError> {
        let mut inner = self.inner.lock().await;
        let balance = inner.balances.entry(user_id).or_insert(0);
        if *balance < amount {
            return Err(CoreError::InsufficientCredits);
        }
        *balance -= amount;
        let balance = *balance;
        inner.log.push(CreditTransaction {
            user_id,
            amount: -amount,
            kind: TransactionKind::Generation,
            ref_id,
            at: Utc::now(),
        });
        Ok(Balance { user_id, balance })
    }

    async fn refund_credits(
        &self,
        user_id: DbId,
        amount: i64,
        ref_id: DbId,
    ) -> Result<Balance, CoreError> {
        let mut inner = self.inner.lock().await;
        let balance = inner.balances.entry(user_id).or_insert(0);
        *balance += amount;
        let balance = *balance;
        inner.log.push(CreditTransaction {
            user_id,
            amount,
            kind: TransactionKind::Refund,
            ref_id,
            at: Utc::now(),
        });
        Ok(Balance { user_id, balance })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
