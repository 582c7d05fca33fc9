//! Strongly-typed tokens for the virology test workflow.
//!
//! A test-kit order carries three disjoint token kinds:
//!
//! - **CTA token**: short, human-typeable claim code. Drawn from an alphabet
//!   with the visually confusable characters (`0/1/i/l/o/u`) removed so it
//!   can be read out loud or typed from a letter without ambiguity.
//! - **Polling token**: long random identifier used to poll for a result
//!   without revealing the CTA token.
//! - **Submission token**: long random identifier released only after a
//!   successful CTA exchange, used downstream for diagnosis-key submission.
//!
//! Tokens are distinct types so they cannot be mixed up at compile time.

use rand::Rng;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Alphabet for CTA tokens: digits and lowercase letters minus `0/1/i/l/o/u`.
pub const CTA_TOKEN_ALPHABET: &[u8] = b"23456789abcdefghjkmnpqrstvwxyz";

/// Number of characters in a CTA token.
pub const CTA_TOKEN_LENGTH: usize = 6;

/// A short human-enterable claim code identifying a test-kit order.
///
/// Unique across all live orders at the moment an order is durably written;
/// redeemed via the CTA exchange operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CtaToken(String);

impl CtaToken {
    /// Generates a fresh random CTA token from the OS secure random source.
    #[must_use]
    pub fn generate() -> Self {
        let mut value = String::with_capacity(CTA_TOKEN_LENGTH);
        for _ in 0..CTA_TOKEN_LENGTH {
            let idx = OsRng.gen_range(0..CTA_TOKEN_ALPHABET.len());
            value.push(char::from(CTA_TOKEN_ALPHABET[idx]));
        }
        Self(value)
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CtaToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CtaToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != CTA_TOKEN_LENGTH {
            return Err(Error::invalid_token(format!(
                "CTA token must be exactly {CTA_TOKEN_LENGTH} characters"
            )));
        }
        if !s.bytes().all(|b| CTA_TOKEN_ALPHABET.contains(&b)) {
            return Err(Error::invalid_token(
                "CTA token contains characters outside the token alphabet".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }
}

/// An opaque token used to poll for a test result.
///
/// Effectively unique (122 bits of randomness, rendered as a hyphenated
/// UUID); polling with it never reveals the CTA token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollingToken(Uuid);

impl PollingToken {
    /// Generates a fresh random polling token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PollingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PollingToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::from_str(s).map(Self).map_err(|e| {
            Error::invalid_token(format!("invalid polling token '{s}': {e}"))
        })
    }
}

/// An opaque token released after a successful CTA exchange, used to submit
/// diagnosis keys downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionToken(Uuid);

impl SubmissionToken {
    /// Generates a fresh random submission token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubmissionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubmissionToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::from_str(s).map(Self).map_err(|e| {
            Error::invalid_token(format!("invalid submission token '{s}': {e}"))
        })
    }
}

/// The full token triple minted for one test-kit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTokens {
    /// Short human-enterable claim code.
    pub cta_token: CtaToken,
    /// Token for result polling.
    pub polling_token: PollingToken,
    /// Token for downstream diagnosis-key submission.
    pub submission_token: SubmissionToken,
}

/// Generator for the three token kinds.
///
/// Pure and stateless: every call draws fresh output from the OS secure
/// random source, calls are uncorrelated, and generation never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokensGenerator;

impl TokensGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Mints a fresh CTA token.
    #[must_use]
    pub fn new_cta_token(&self) -> CtaToken {
        CtaToken::generate()
    }

    /// Mints a fresh polling token.
    #[must_use]
    pub fn new_polling_token(&self) -> PollingToken {
        PollingToken::generate()
    }

    /// Mints a fresh submission token.
    #[must_use]
    pub fn new_submission_token(&self) -> SubmissionToken {
        SubmissionToken::generate()
    }

    /// Mints a fresh token triple for one order.
    #[must_use]
    pub fn generate(&self) -> OrderTokens {
        OrderTokens {
            cta_token: self.new_cta_token(),
            polling_token: self.new_polling_token(),
            submission_token: self.new_submission_token(),
        }
    }
}
