//! Test-kit order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labtoken_core::token::{CtaToken, OrderTokens, PollingToken, SubmissionToken};

/// The kind of test-kit request an order was created for.
///
/// `Order` requests a home test kit be dispatched; `Register` registers a
/// kit the user already holds. The two kinds differ only in which website
/// template the client is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestKitRequestType {
    /// Order a home test kit.
    Order,
    /// Register an already-held test kit.
    Register,
}

impl TestKitRequestType {
    /// Returns the wire form of the request kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "ORDER",
            Self::Register => "REGISTER",
        }
    }
}

/// One issued test-kit order.
///
/// The three tokens are fixed at creation and never change; orders are never
/// deleted by this subsystem (retention is an external concern).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOrder {
    /// Short human-enterable claim code, unique across live orders.
    pub cta_token: CtaToken,
    /// Result polling token, unique across live orders.
    pub polling_token: PollingToken,
    /// Diagnosis-key submission token, released only on successful exchange.
    pub submission_token: SubmissionToken,
    /// The request kind this order was created for.
    pub request_type: TestKitRequestType,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TestOrder {
    /// Creates an order record from a freshly minted token triple.
    #[must_use]
    pub fn new(
        tokens: OrderTokens,
        request_type: TestKitRequestType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            cta_token: tokens.cta_token,
            polling_token: tokens.polling_token,
            submission_token: tokens.submission_token,
            request_type,
            created_at,
        }
    }
}
