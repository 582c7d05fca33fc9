//! Virology workflow metrics.
//!
//! Counters for token issuance and CTA exchange, complementing the
//! structured logging already in place.

use metrics::{counter, describe_counter};

/// Orders created counter.
pub const ORDERS_CREATED: &str = "virology_orders_created_total";

/// Token collision retry counter.
pub const TOKEN_COLLISION_RETRIES: &str = "virology_token_collision_retries_total";

/// Issuance exhaustion counter.
pub const ISSUANCE_EXHAUSTED: &str = "virology_issuance_exhausted_total";

/// CTA exchange outcome counter.
pub const CTA_EXCHANGES: &str = "virology_cta_exchanges_total";

/// Registers all virology metric descriptions.
///
/// Call this once at application startup after initializing the metrics
/// recorder.
pub fn register_metrics() {
    describe_counter!(ORDERS_CREATED, "Total test-kit orders created");
    describe_counter!(
        TOKEN_COLLISION_RETRIES,
        "Total order-creation attempts retried after a token collision"
    );
    describe_counter!(
        ISSUANCE_EXHAUSTED,
        "Total order requests that exhausted the token persistence retry budget"
    );
    describe_counter!(CTA_EXCHANGES, "Total CTA exchange attempts by outcome");
}

/// Records a created order.
pub fn record_order_created(request_type: &str) {
    counter!(ORDERS_CREATED, "request_type" => request_type.to_string()).increment(1);
}

/// Records a collision retry during order creation.
pub fn record_token_collision_retry() {
    counter!(TOKEN_COLLISION_RETRIES).increment(1);
}

/// Records an order request that exhausted its retry budget.
pub fn record_issuance_exhausted() {
    counter!(ISSUANCE_EXHAUSTED).increment(1);
}

/// Records a CTA exchange outcome.
pub fn record_cta_exchange(outcome: &'static str) {
    counter!(CTA_EXCHANGES, "outcome" => outcome).increment(1);
}
