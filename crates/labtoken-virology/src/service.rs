//! The virology workflow.
//!
//! [`VirologyService`] orchestrates the four request intents: order and
//! register (token issuance with bounded collision retry), result lookup,
//! and CTA exchange (floor-bounded against timing side-channels). It holds
//! no persistent state of its own; all durability lives behind
//! [`OrderStore`].

use chrono::{DateTime, Utc};
use std::sync::Arc;

use labtoken_core::token::{CtaToken, PollingToken, SubmissionToken, TokensGenerator};

use crate::config::{VirologyConfig, WebsiteConfig};
use crate::error::{Result, VirologyError};
use crate::metrics;
use crate::order::{TestKitRequestType, TestOrder};
use crate::persistence::{CreateOrderOutcome, OrderStore};
use crate::result::{TestResult, TestResultState};
use crate::throttle::run_with_minimum_duration;

/// Response to a successful order or register request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirologyOrderResponse {
    /// Destination URL with the CTA token embedded as a query parameter.
    pub website_url_with_query: String,
    /// The CTA token (also embedded in the URL, returned separately for
    /// display to the user).
    pub cta_token: CtaToken,
    /// Token the client polls results with.
    pub polling_token: PollingToken,
    /// Token for downstream diagnosis-key submission.
    pub submission_token: SubmissionToken,
}

/// Outcome of a result lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirologyLookupResult {
    /// The result has been uploaded and is readable.
    Ready {
        /// When the test was completed.
        test_end_date: DateTime<Utc>,
        /// The test outcome.
        test_result: TestResult,
    },
    /// The order exists but no outcome has been uploaded yet.
    Pending,
    /// The polling token was never issued.
    NotFound,
}

/// Outcome of a CTA exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtaExchangeResult {
    /// The result is available; the submission token is released.
    Available {
        /// Token for downstream diagnosis-key submission.
        submission_token: SubmissionToken,
        /// When the test was completed.
        test_end_date: DateTime<Utc>,
        /// The test outcome.
        test_result: TestResult,
    },
    /// The CTA token is valid but the result has not been uploaded yet.
    Pending,
    /// The CTA token was never issued.
    NotFound,
}

impl CtaExchangeResult {
    const fn outcome_label(&self) -> &'static str {
        match self {
            Self::Available { .. } => "available",
            Self::Pending => "pending",
            Self::NotFound => "not_found",
        }
    }
}

/// Orchestrates the virology test token workflow.
pub struct VirologyService {
    store: Arc<dyn OrderStore>,
    tokens: TokensGenerator,
    config: VirologyConfig,
}

impl std::fmt::Debug for VirologyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirologyService")
            .field("store", &"<OrderStore>")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VirologyService {
    /// Creates a new workflow over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, tokens: TokensGenerator, config: VirologyConfig) -> Self {
        Self {
            store,
            tokens,
            config,
        }
    }

    /// Handles an order or register request.
    ///
    /// Generates a candidate token triple and attempts the atomic create.
    /// On collision the whole triple is regenerated and the create retried,
    /// up to the configured attempt budget. Exactly one durable order exists
    /// on success; zero on exhaustion.
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::TokenPersistenceExhausted`] when the attempt
    /// budget is spent (an operational anomaly, not a user error), or
    /// [`VirologyError::Storage`] on infrastructure faults.
    pub async fn handle_test_order_request(
        &self,
        request_type: TestKitRequestType,
        websites: &WebsiteConfig,
    ) -> Result<VirologyOrderResponse> {
        let max_attempts = self.config.max_token_persistence_attempts;

        for attempt in 1..=max_attempts {
            let order = TestOrder::new(self.tokens.generate(), request_type, Utc::now());

            match self.store.create_order(&order).await? {
                CreateOrderOutcome::Created => {
                    tracing::info!(
                        request_type = request_type.as_str(),
                        cta_token = %order.cta_token,
                        polling_token = %order.polling_token,
                        "Virology order created"
                    );
                    metrics::record_order_created(request_type.as_str());

                    return Ok(VirologyOrderResponse {
                        website_url_with_query: websites
                            .url_with_query(request_type, &order.cta_token),
                        cta_token: order.cta_token,
                        polling_token: order.polling_token,
                        submission_token: order.submission_token,
                    });
                }
                CreateOrderOutcome::TokenCollision => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        "Token collision on order creation, regenerating triple"
                    );
                    metrics::record_token_collision_retry();
                }
            }
        }

        tracing::error!(
            attempts = max_attempts,
            "Order creation exhausted its token persistence budget"
        );
        metrics::record_issuance_exhausted();

        Err(VirologyError::TokenPersistenceExhausted {
            attempts: max_attempts,
        })
    }

    /// Looks up the result for a polling token.
    ///
    /// No side effects; repeated calls against unchanged backing data return
    /// identical outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::Storage`] on infrastructure faults.
    pub async fn virology_lookup_for(
        &self,
        polling_token: &PollingToken,
    ) -> Result<VirologyLookupResult> {
        let record = self.store.result_by_polling_token(polling_token).await?;

        Ok(match record.map(|r| r.state) {
            None => VirologyLookupResult::NotFound,
            Some(TestResultState::Pending) => VirologyLookupResult::Pending,
            Some(TestResultState::Available {
                test_end_date,
                test_result,
            }) => VirologyLookupResult::Ready {
                test_end_date,
                test_result,
            },
        })
    }

    /// Exchanges a CTA token for the submission token and result payload.
    ///
    /// The whole operation runs behind the configured latency floor, so an
    /// unknown token, a valid-but-pending token, and a ready token are
    /// indistinguishable by response time. Exchange is idempotent: a
    /// successful exchange does not invalidate the CTA token.
    ///
    /// # Errors
    ///
    /// Returns [`VirologyError::Storage`] on infrastructure faults (also
    /// floor-bounded).
    pub async fn exchange_cta_token(&self, cta_token: &CtaToken) -> Result<CtaExchangeResult> {
        let result = run_with_minimum_duration(
            self.config.cta_exchange_delay(),
            self.exchange_inner(cta_token),
        )
        .await;

        if let Ok(outcome) = &result {
            metrics::record_cta_exchange(outcome.outcome_label());
        }
        result
    }

    async fn exchange_inner(&self, cta_token: &CtaToken) -> Result<CtaExchangeResult> {
        let Some(order) = self.store.order_by_cta_token(cta_token).await? else {
            return Ok(CtaExchangeResult::NotFound);
        };

        let record = self
            .store
            .result_by_polling_token(&order.polling_token)
            .await?;

        Ok(match record.map(|r| r.state) {
            Some(TestResultState::Available {
                test_end_date,
                test_result,
            }) => CtaExchangeResult::Available {
                submission_token: order.submission_token,
                test_end_date,
                test_result,
            },
            // An order whose result row is missing is treated the same as
            // pending: the token is real, the outcome just is not readable.
            Some(TestResultState::Pending) | None => CtaExchangeResult::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryOrderStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn websites() -> WebsiteConfig {
        WebsiteConfig {
            order_website: "https://example.test/cta-start".to_string(),
            register_website: "https://example.test/cta-register".to_string(),
        }
    }

    fn fast_config() -> VirologyConfig {
        VirologyConfig {
            cta_exchange_delay_millis: 0,
            ..VirologyConfig::default()
        }
    }

    fn service_over(store: Arc<MemoryOrderStore>, config: VirologyConfig) -> VirologyService {
        VirologyService::new(store, TokensGenerator::new(), config)
    }

    /// Store double that reports a fixed number of collisions before
    /// delegating to a real in-memory store.
    struct CollidingStore {
        delegate: MemoryOrderStore,
        collisions_left: AtomicU32,
        create_calls: AtomicU32,
    }

    impl CollidingStore {
        fn new(collisions: u32) -> Self {
            Self {
                delegate: MemoryOrderStore::new(),
                collisions_left: AtomicU32::new(collisions),
                create_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl OrderStore for CollidingStore {
        async fn create_order(&self, order: &TestOrder) -> Result<CreateOrderOutcome> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let left = self.collisions_left.load(Ordering::SeqCst);
            if left > 0 {
                self.collisions_left.store(left - 1, Ordering::SeqCst);
                return Ok(CreateOrderOutcome::TokenCollision);
            }
            self.delegate.create_order(order).await
        }

        async fn order_by_cta_token(&self, token: &CtaToken) -> Result<Option<TestOrder>> {
            self.delegate.order_by_cta_token(token).await
        }

        async fn order_by_polling_token(
            &self,
            token: &PollingToken,
        ) -> Result<Option<TestOrder>> {
            self.delegate.order_by_polling_token(token).await
        }

        async fn result_by_polling_token(
            &self,
            token: &PollingToken,
        ) -> Result<Option<crate::result::TestResultRecord>> {
            self.delegate.result_by_polling_token(token).await
        }
    }

    /// Store double whose creates always fail with a storage fault.
    struct BrokenStore {
        create_calls: AtomicU32,
    }

    #[async_trait]
    impl OrderStore for BrokenStore {
        async fn create_order(&self, _order: &TestOrder) -> Result<CreateOrderOutcome> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Err(VirologyError::storage("table unreachable"))
        }

        async fn order_by_cta_token(&self, _token: &CtaToken) -> Result<Option<TestOrder>> {
            Err(VirologyError::storage("table unreachable"))
        }

        async fn order_by_polling_token(
            &self,
            _token: &PollingToken,
        ) -> Result<Option<TestOrder>> {
            Err(VirologyError::storage("table unreachable"))
        }

        async fn result_by_polling_token(
            &self,
            _token: &PollingToken,
        ) -> Result<Option<crate::result::TestResultRecord>> {
            Err(VirologyError::storage("table unreachable"))
        }
    }

    #[tokio::test]
    async fn order_returns_tokens_and_destination_url() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_over(Arc::clone(&store), fast_config());

        let response = service
            .handle_test_order_request(TestKitRequestType::Order, &websites())
            .await
            .unwrap();

        assert_eq!(
            response.website_url_with_query,
            format!("https://example.test/cta-start?ctaToken={}", response.cta_token)
        );
        assert_eq!(store.order_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn register_uses_the_register_template() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_over(store, fast_config());

        let response = service
            .handle_test_order_request(TestKitRequestType::Register, &websites())
            .await
            .unwrap();

        assert!(
            response
                .website_url_with_query
                .starts_with("https://example.test/cta-register?ctaToken=")
        );
    }

    #[tokio::test]
    async fn collisions_are_retried_with_fresh_triples() {
        let store = Arc::new(CollidingStore::new(2));
        let service = VirologyService::new(
            Arc::clone(&store) as Arc<dyn OrderStore>,
            TokensGenerator::new(),
            fast_config(),
        );

        let response = service
            .handle_test_order_request(TestKitRequestType::Order, &websites())
            .await
            .unwrap();

        // Two collisions then success: three distinct triples attempted.
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 3);
        assert!(
            service
                .virology_lookup_for(&response.polling_token)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn exhausting_the_attempt_budget_is_fatal() {
        let store = Arc::new(CollidingStore::new(u32::MAX));
        let service = VirologyService::new(
            Arc::clone(&store) as Arc<dyn OrderStore>,
            TokensGenerator::new(),
            fast_config(),
        );

        let err = service
            .handle_test_order_request(TestKitRequestType::Order, &websites())
            .await
            .expect_err("must exhaust");

        assert!(matches!(
            err,
            VirologyError::TokenPersistenceExhausted { attempts: 3 }
        ));
        // Exactly the configured number of attempts, no more.
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn storage_faults_surface_without_retry() {
        let store = Arc::new(BrokenStore {
            create_calls: AtomicU32::new(0),
        });
        let service = VirologyService::new(
            Arc::clone(&store) as Arc<dyn OrderStore>,
            TokensGenerator::new(),
            fast_config(),
        );

        let err = service
            .handle_test_order_request(TestKitRequestType::Order, &websites())
            .await
            .expect_err("must fail");

        assert!(matches!(err, VirologyError::Storage { .. }));
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_progresses_from_pending_to_ready() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_over(Arc::clone(&store), fast_config());

        let response = service
            .handle_test_order_request(TestKitRequestType::Order, &websites())
            .await
            .unwrap();

        // Immediately after ordering the result is pending, not unknown.
        assert_eq!(
            service
                .virology_lookup_for(&response.polling_token)
                .await
                .unwrap(),
            VirologyLookupResult::Pending
        );

        let end_date: DateTime<Utc> = "2020-04-23T18:34:03Z".parse().unwrap();
        store
            .upsert_result(
                response.polling_token,
                TestResultState::Available {
                    test_end_date: end_date,
                    test_result: TestResult::Positive,
                },
            )
            .unwrap();

        let ready = service
            .virology_lookup_for(&response.polling_token)
            .await
            .unwrap();
        assert_eq!(
            ready,
            VirologyLookupResult::Ready {
                test_end_date: end_date,
                test_result: TestResult::Positive,
            }
        );

        // Once available, repeated lookups return identical content.
        assert_eq!(
            service
                .virology_lookup_for(&response.polling_token)
                .await
                .unwrap(),
            ready
        );
    }

    #[tokio::test]
    async fn lookup_of_unissued_token_is_not_found() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_over(store, fast_config());

        let outcome = service
            .virology_lookup_for(&PollingToken::generate())
            .await
            .unwrap();
        assert_eq!(outcome, VirologyLookupResult::NotFound);
    }

    #[tokio::test]
    async fn exchange_releases_submission_token_once_result_is_available() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_over(Arc::clone(&store), fast_config());

        let response = service
            .handle_test_order_request(TestKitRequestType::Order, &websites())
            .await
            .unwrap();

        // Pending before upload.
        assert_eq!(
            service.exchange_cta_token(&response.cta_token).await.unwrap(),
            CtaExchangeResult::Pending
        );

        let end_date: DateTime<Utc> = "2020-04-23T18:34:03Z".parse().unwrap();
        store
            .upsert_result(
                response.polling_token,
                TestResultState::Available {
                    test_end_date: end_date,
                    test_result: TestResult::Positive,
                },
            )
            .unwrap();

        let exchanged = service.exchange_cta_token(&response.cta_token).await.unwrap();
        assert_eq!(
            exchanged,
            CtaExchangeResult::Available {
                submission_token: response.submission_token,
                test_end_date: end_date,
                test_result: TestResult::Positive,
            }
        );
    }

    #[tokio::test]
    async fn exchange_of_unissued_token_is_not_found() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_over(store, fast_config());

        let token: CtaToken = "f3dzcf".parse().unwrap();
        assert_eq!(
            service.exchange_cta_token(&token).await.unwrap(),
            CtaExchangeResult::NotFound
        );
    }

    #[tokio::test]
    async fn exchange_can_be_repeated_with_same_token() {
        // A successful exchange does not invalidate the CTA token; repeated
        // exchanges return identical payloads.
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_over(Arc::clone(&store), fast_config());

        let response = service
            .handle_test_order_request(TestKitRequestType::Order, &websites())
            .await
            .unwrap();
        store
            .upsert_result(
                response.polling_token,
                TestResultState::Available {
                    test_end_date: Utc::now(),
                    test_result: TestResult::Negative,
                },
            )
            .unwrap();

        let first = service.exchange_cta_token(&response.cta_token).await.unwrap();
        let second = service.exchange_cta_token(&response.cta_token).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_duration_is_floored_for_every_branch() {
        let floor = Duration::from_millis(1_000);
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_over(Arc::clone(&store), VirologyConfig::default());

        let response = service
            .handle_test_order_request(TestKitRequestType::Order, &websites())
            .await
            .unwrap();

        // Invalid token.
        let unknown: CtaToken = "f3dzcf".parse().unwrap();
        let started = Instant::now();
        let outcome = service.exchange_cta_token(&unknown).await.unwrap();
        assert_eq!(outcome, CtaExchangeResult::NotFound);
        assert!(started.elapsed() >= floor);

        // Valid but pending.
        let started = Instant::now();
        let outcome = service.exchange_cta_token(&response.cta_token).await.unwrap();
        assert_eq!(outcome, CtaExchangeResult::Pending);
        assert!(started.elapsed() >= floor);

        // Ready.
        store
            .upsert_result(
                response.polling_token,
                TestResultState::Available {
                    test_end_date: Utc::now(),
                    test_result: TestResult::Void,
                },
            )
            .unwrap();
        let started = Instant::now();
        let outcome = service.exchange_cta_token(&response.cta_token).await.unwrap();
        assert!(matches!(outcome, CtaExchangeResult::Available { .. }));
        assert!(started.elapsed() >= floor);
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_storage_fault_is_also_floored() {
        let floor = Duration::from_millis(1_000);
        let store = Arc::new(BrokenStore {
            create_calls: AtomicU32::new(0),
        });
        let service = VirologyService::new(
            store as Arc<dyn OrderStore>,
            TokensGenerator::new(),
            VirologyConfig::default(),
        );

        let token: CtaToken = "f3dzcf".parse().unwrap();
        let started = Instant::now();
        let result = service.exchange_cta_token(&token).await;
        assert!(matches!(result, Err(VirologyError::Storage { .. })));
        assert!(started.elapsed() >= floor);
    }
}
