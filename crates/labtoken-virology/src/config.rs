//! Workflow and website configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use labtoken_core::error::{Error, Result};
use labtoken_core::token::CtaToken;

use crate::order::TestKitRequestType;

/// Default number of token persistence attempts per order request.
pub const DEFAULT_TOKEN_PERSISTENCE_ATTEMPTS: u32 = 3;

/// Maximum supported token persistence attempts.
pub const MAX_TOKEN_PERSISTENCE_ATTEMPTS: u32 = 10;

/// Default CTA exchange latency floor in milliseconds.
pub const DEFAULT_CTA_EXCHANGE_DELAY_MILLIS: u64 = 1_000;

/// Maximum supported CTA exchange latency floor in milliseconds.
pub const MAX_CTA_EXCHANGE_DELAY_MILLIS: u64 = 10_000;

/// Configuration for the virology workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirologyConfig {
    /// Maximum number of token triples attempted before order creation is
    /// reported as a fatal issuance failure.
    #[serde(default = "default_token_persistence_attempts")]
    pub max_token_persistence_attempts: u32,
    /// CTA exchange latency floor in milliseconds.
    #[serde(default = "default_cta_exchange_delay_millis")]
    pub cta_exchange_delay_millis: u64,
}

const fn default_token_persistence_attempts() -> u32 {
    DEFAULT_TOKEN_PERSISTENCE_ATTEMPTS
}

const fn default_cta_exchange_delay_millis() -> u64 {
    DEFAULT_CTA_EXCHANGE_DELAY_MILLIS
}

impl Default for VirologyConfig {
    fn default() -> Self {
        Self {
            max_token_persistence_attempts: default_token_persistence_attempts(),
            cta_exchange_delay_millis: default_cta_exchange_delay_millis(),
        }
    }
}

impl VirologyConfig {
    /// Returns the exchange latency floor as a duration.
    #[must_use]
    pub const fn cta_exchange_delay(&self) -> Duration {
        Duration::from_millis(self.cta_exchange_delay_millis)
    }

    /// Validates configuration sanity.
    ///
    /// # Errors
    ///
    /// Returns an error when values are missing or out of range.
    pub fn validate(&self) -> Result<()> {
        if self.max_token_persistence_attempts == 0 {
            return Err(Error::InvalidInput(
                "max_token_persistence_attempts must be greater than zero".to_string(),
            ));
        }
        if self.max_token_persistence_attempts > MAX_TOKEN_PERSISTENCE_ATTEMPTS {
            return Err(Error::InvalidInput(format!(
                "max_token_persistence_attempts must be at most {MAX_TOKEN_PERSISTENCE_ATTEMPTS}"
            )));
        }
        if self.cta_exchange_delay_millis > MAX_CTA_EXCHANGE_DELAY_MILLIS {
            return Err(Error::InvalidInput(format!(
                "cta_exchange_delay_millis must be at most {MAX_CTA_EXCHANGE_DELAY_MILLIS}"
            )));
        }
        Ok(())
    }
}

/// Website templates the client is redirected to after ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteConfig {
    /// Destination for home-kit orders.
    pub order_website: String,
    /// Destination for home-kit registrations.
    pub register_website: String,
}

impl WebsiteConfig {
    /// Returns the website template for a request kind.
    #[must_use]
    pub fn website_for(&self, request_type: TestKitRequestType) -> &str {
        match request_type {
            TestKitRequestType::Order => &self.order_website,
            TestKitRequestType::Register => &self.register_website,
        }
    }

    /// Builds the destination URL with the CTA token embedded as a query
    /// parameter.
    #[must_use]
    pub fn url_with_query(&self, request_type: TestKitRequestType, token: &CtaToken) -> String {
        format!("{}?ctaToken={token}", self.website_for(request_type))
    }

    /// Validates that both templates are present.
    ///
    /// # Errors
    ///
    /// Returns an error when a template is empty.
    pub fn validate(&self) -> Result<()> {
        if self.order_website.trim().is_empty() {
            return Err(Error::InvalidInput(
                "order_website is required".to_string(),
            ));
        }
        if self.register_website.trim().is_empty() {
            return Err(Error::InvalidInput(
                "register_website is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn websites() -> WebsiteConfig {
        WebsiteConfig {
            order_website: "https://example.test/cta-start".to_string(),
            register_website: "https://example.test/cta-register".to_string(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        VirologyConfig::default().validate().expect("valid");
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let config = VirologyConfig {
            max_token_persistence_attempts: 0,
            ..VirologyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_delay() {
        let config = VirologyConfig {
            cta_exchange_delay_millis: MAX_CTA_EXCHANGE_DELAY_MILLIS + 1,
            ..VirologyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn url_embeds_token_for_each_request_type() {
        let token: CtaToken = "f3dzcf".parse().unwrap();
        let websites = websites();
        assert_eq!(
            websites.url_with_query(TestKitRequestType::Order, &token),
            "https://example.test/cta-start?ctaToken=f3dzcf"
        );
        assert_eq!(
            websites.url_with_query(TestKitRequestType::Register, &token),
            "https://example.test/cta-register?ctaToken=f3dzcf"
        );
    }

    #[test]
    fn validate_rejects_empty_website() {
        let config = WebsiteConfig {
            order_website: " ".to_string(),
            ..websites()
        };
        assert!(config.validate().is_err());
    }
}
