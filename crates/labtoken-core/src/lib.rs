//! # labtoken-core
//!
//! Core primitives for the labtoken virology testing service.
//!
//! This crate provides the foundational types used across all labtoken
//! components:
//!
//! - **Tokens**: the three opaque token kinds issued for a test-kit order
//!   (CTA, polling, submission) and their generator
//! - **Error Types**: shared error definitions and result types
//! - **Observability**: structured logging initialization and span helpers
//!
//! ## Crate Boundary
//!
//! `labtoken-core` performs no I/O and holds no state beyond the process-wide
//! secure random source. Persistence and workflow live in
//! `labtoken-virology`; HTTP composition lives in `labtoken-api`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod token;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use labtoken_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::token::{
        CtaToken, OrderTokens, PollingToken, SubmissionToken, TokensGenerator,
    };
}

pub use error::{Error, Result};
pub use observability::{LogFormat, init_logging};
pub use token::{CtaToken, OrderTokens, PollingToken, SubmissionToken, TokensGenerator};
