//! Order store contract and in-memory implementation.
//!
//! The contract is designed for backends with atomic conditional writes
//! (the production deployment sits on a transactional key-value store).
//! `create_order` is the single correctness-critical operation in the
//! system: it is the only thing standing between two concurrent requests
//! and a token collision.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use labtoken_core::token::{CtaToken, PollingToken};

use crate::error::{Result, VirologyError};
use crate::order::TestOrder;
use crate::result::{TestResultRecord, TestResultState};

/// Result of an order-creation attempt.
///
/// A collision is a normal result, never an error: it is driven entirely by
/// token-space collision probability and the caller retries with a fresh
/// token triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOrderOutcome {
    /// The order was durably written.
    Created,
    /// The CTA token or polling token already exists; nothing was written.
    TokenCollision,
}

/// Durable, keyed persistence for orders and results.
///
/// # Contract
///
/// `create_order` must persist the order record, the polling-token index
/// entry, and the pending result stub as one atomic unit, and must report
/// [`CreateOrderOutcome::TokenCollision`] without writing anything if either
/// the CTA token or the polling token already exists. Infrastructure faults
/// surface as [`VirologyError::Storage`] and are never retried here.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Atomically persists a new order (with its pending result stub).
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::Storage`] on infrastructure faults.
    /// Collisions are reported in the outcome, not as errors.
    async fn create_order(&self, order: &TestOrder) -> Result<CreateOrderOutcome>;

    /// Looks up an order by its CTA token.
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::Storage`] on infrastructure faults.
    async fn order_by_cta_token(&self, token: &CtaToken) -> Result<Option<TestOrder>>;

    /// Looks up an order by its polling token.
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::Storage`] on infrastructure faults.
    async fn order_by_polling_token(&self, token: &PollingToken) -> Result<Option<TestOrder>>;

    /// Looks up a test result by polling token.
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::Storage`] on infrastructure faults.
    async fn result_by_polling_token(&self, token: &PollingToken)
    -> Result<Option<TestResultRecord>>;
}

/// In-memory order store for testing and debug deployments.
///
/// Thread-safe via `RwLock`; all writes for one order happen under a single
/// write lock, which gives the atomic check-then-insert the contract
/// requires. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    orders_by_cta: HashMap<CtaToken, TestOrder>,
    cta_by_polling: HashMap<PollingToken, CtaToken>,
    results: HashMap<PollingToken, TestResultRecord>,
}

impl MemoryOrderStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes or overwrites the result for a polling token.
    ///
    /// This is the stand-in for the external result-upload process; it is an
    /// inherent method rather than part of [`OrderStore`] because the
    /// workflow itself never writes results.
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::Internal`] if the lock is poisoned.
    pub fn upsert_result(
        &self,
        polling_token: PollingToken,
        state: TestResultState,
    ) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| VirologyError::Internal {
            message: "lock poisoned".into(),
        })?;
        inner.results.insert(
            polling_token,
            TestResultRecord {
                polling_token,
                state,
            },
        );
        Ok(())
    }

    /// Returns the number of stored orders.
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::Internal`] if the lock is poisoned.
    pub fn order_count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| VirologyError::Internal {
            message: "lock poisoned".into(),
        })?;
        Ok(inner.orders_by_cta.len())
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_order(&self, order: &TestOrder) -> Result<CreateOrderOutcome> {
        let mut inner = self.inner.write().map_err(|_| VirologyError::Internal {
            message: "lock poisoned".into(),
        })?;

        if inner.orders_by_cta.contains_key(&order.cta_token)
            || inner.cta_by_polling.contains_key(&order.polling_token)
        {
            return Ok(CreateOrderOutcome::TokenCollision);
        }

        inner
            .orders_by_cta
            .insert(order.cta_token.clone(), order.clone());
        inner
            .cta_by_polling
            .insert(order.polling_token, order.cta_token.clone());
        inner.results.insert(
            order.polling_token,
            TestResultRecord::pending(order.polling_token),
        );
        drop(inner);

        Ok(CreateOrderOutcome::Created)
    }

    async fn order_by_cta_token(&self, token: &CtaToken) -> Result<Option<TestOrder>> {
        let inner = self.inner.read().map_err(|_| VirologyError::Internal {
            message: "lock poisoned".into(),
        })?;
        Ok(inner.orders_by_cta.get(token).cloned())
    }

    async fn order_by_polling_token(&self, token: &PollingToken) -> Result<Option<TestOrder>> {
        let inner = self.inner.read().map_err(|_| VirologyError::Internal {
            message: "lock poisoned".into(),
        })?;
        Ok(inner
            .cta_by_polling
            .get(token)
            .and_then(|cta| inner.orders_by_cta.get(cta))
            .cloned())
    }

    async fn result_by_polling_token(
        &self,
        token: &PollingToken,
    ) -> Result<Option<TestResultRecord>> {
        let inner = self.inner.read().map_err(|_| VirologyError::Internal {
            message: "lock poisoned".into(),
        })?;
        Ok(inner.results.get(token).copied())
    }
}
