//! # labtoken-api
//!
//! HTTP composition layer for the labtoken virology testing service.
//!
//! This crate provides the API surface, handling:
//!
//! - **Routing**: the four virology intents plus health and metrics
//! - **Configuration**: environment-driven server configuration
//! - **Error Mapping**: domain outcomes to stable HTTP error codes
//! - **Observability**: request metrics and tracing
//!
//! ## Design Principles
//!
//! This crate is a **thin composition layer** with no domain policy.
//! All workflow logic lives in `labtoken-virology`.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /health                            - Health check
//! GET  /metrics                           - Prometheus metrics
//! POST /virology-test/home-kit/order     - Order a home test kit
//! POST /virology-test/home-kit/register  - Register a test kit
//! POST /virology-test/results            - Poll for a test result
//! POST /virology-test/cta-exchange       - Exchange a CTA token
//! POST /virology-test/health             - Mobile-contract health probe
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::Server;
}
