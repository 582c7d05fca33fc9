//! # labtoken-virology
//!
//! Domain logic for the virology test token workflow.
//!
//! This crate owns:
//!
//! - **Records**: test orders and test results
//! - **Persistence Contract**: the [`OrderStore`] trait with its
//!   collision-aware atomic create, plus an in-memory implementation
//! - **Throttle**: the minimum-elapsed-duration combinator guarding the CTA
//!   exchange path against timing side-channels
//! - **Workflow**: [`VirologyService`], orchestrating order issuance, result
//!   lookup, and CTA exchange
//!
//! ## Crate Boundary
//!
//! No transport concerns live here. HTTP routing, request parsing, and
//! response shaping belong to `labtoken-api`; this crate speaks typed
//! tokens and typed outcomes only.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod order;
pub mod persistence;
pub mod result;
pub mod service;
pub mod throttle;

pub use config::{VirologyConfig, WebsiteConfig};
pub use error::{Result, VirologyError};
pub use order::{TestKitRequestType, TestOrder};
pub use persistence::{CreateOrderOutcome, MemoryOrderStore, OrderStore};
pub use result::{TestResult, TestResultRecord, TestResultState};
pub use service::{
    CtaExchangeResult, VirologyLookupResult, VirologyOrderResponse, VirologyService,
};
pub use throttle::run_with_minimum_duration;
