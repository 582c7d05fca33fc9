//! Test result records.
//!
//! Results are written by an external upload process; this crate only reads
//! them. Order creation persists a pending stub so the record exists (and
//! polls report "pending") from the moment an order is issued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labtoken_core::token::PollingToken;

/// Outcome value of a completed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestResult {
    /// Virus detected.
    Positive,
    /// Virus not detected.
    Negative,
    /// Sample could not be processed.
    Void,
}

/// Availability state of a test result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TestResultState {
    /// The test has been ordered but no outcome has been uploaded yet.
    Pending,
    /// The outcome has been uploaded and is readable.
    Available {
        /// When the test was completed.
        test_end_date: DateTime<Utc>,
        /// The test outcome.
        test_result: TestResult,
    },
}

impl TestResultState {
    /// Returns true once the outcome has been uploaded.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// A test result keyed by polling token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultRecord {
    /// The polling token of the order this result belongs to.
    pub polling_token: PollingToken,
    /// Availability state and, once available, the outcome.
    pub state: TestResultState,
}

impl TestResultRecord {
    /// Creates the pending stub written at order creation.
    #[must_use]
    pub const fn pending(polling_token: PollingToken) -> Self {
        Self {
            polling_token,
            state: TestResultState::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_values_serialize_in_wire_form() {
        assert_eq!(
            serde_json::to_string(&TestResult::Positive).unwrap(),
            "\"POSITIVE\""
        );
        assert_eq!(
            serde_json::to_string(&TestResult::Negative).unwrap(),
            "\"NEGATIVE\""
        );
        assert_eq!(serde_json::to_string(&TestResult::Void).unwrap(), "\"VOID\"");
    }

    #[test]
    fn pending_stub_is_not_available() {
        let record = TestResultRecord::pending(PollingToken::generate());
        assert!(!record.state.is_available());
    }
}
