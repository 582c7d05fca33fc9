//! Server configuration.
//!
//! Configuration is loaded once at startup from `LABTOKEN_*` environment
//! variables into an immutable [`Config`] value and injected into the
//! server; nothing reads the environment after startup.

use serde::{Deserialize, Serialize};

use labtoken_core::error::{Error, Result};
use labtoken_virology::config::{
    MAX_CTA_EXCHANGE_DELAY_MILLIS, MAX_TOKEN_PERSISTENCE_ATTEMPTS, VirologyConfig, WebsiteConfig,
};

/// Configuration for the labtoken API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled:
    /// - logs are pretty-printed instead of JSON
    /// - website templates fall back to placeholder defaults
    /// - the in-memory order store is permitted
    pub debug: bool,

    /// Website templates for order and register destinations.
    #[serde(default = "default_websites")]
    pub websites: WebsiteConfig,

    /// Workflow configuration (retry budget, exchange latency floor).
    #[serde(default)]
    pub virology: VirologyConfig,
}

fn default_websites() -> WebsiteConfig {
    WebsiteConfig {
        order_website: "https://self-referral.example/cta-start".to_string(),
        register_website: "https://self-referral.example/cta-register".to_string(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            debug: false,
            websites: default_websites(),
            virology: VirologyConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `LABTOKEN_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable fails to parse, a value is out of
    /// range, or a required production value is missing.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("LABTOKEN_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("LABTOKEN_DEBUG")? {
            config.debug = debug;
        }

        let order_website = env_string("LABTOKEN_ORDER_WEBSITE");
        let register_website = env_string("LABTOKEN_REGISTER_WEBSITE");
        if !config.debug {
            if order_website.is_none() {
                return Err(Error::InvalidInput(
                    "LABTOKEN_ORDER_WEBSITE is required when LABTOKEN_DEBUG=false".to_string(),
                ));
            }
            if register_website.is_none() {
                return Err(Error::InvalidInput(
                    "LABTOKEN_REGISTER_WEBSITE is required when LABTOKEN_DEBUG=false".to_string(),
                ));
            }
        }
        if let Some(website) = order_website {
            config.websites.order_website = website;
        }
        if let Some(website) = register_website {
            config.websites.register_website = website;
        }

        if let Some(attempts) = env_u32("LABTOKEN_TOKEN_RETRY_MAX")? {
            if attempts == 0 {
                return Err(Error::InvalidInput(
                    "LABTOKEN_TOKEN_RETRY_MAX must be greater than 0".to_string(),
                ));
            }
            if attempts > MAX_TOKEN_PERSISTENCE_ATTEMPTS {
                return Err(Error::InvalidInput(format!(
                    "LABTOKEN_TOKEN_RETRY_MAX must be at most {MAX_TOKEN_PERSISTENCE_ATTEMPTS}"
                )));
            }
            config.virology.max_token_persistence_attempts = attempts;
        }
        if let Some(millis) = env_u64("LABTOKEN_CTA_EXCHANGE_DELAY_MS")? {
            if millis > MAX_CTA_EXCHANGE_DELAY_MILLIS {
                return Err(Error::InvalidInput(format!(
                    "LABTOKEN_CTA_EXCHANGE_DELAY_MS must be at most {MAX_CTA_EXCHANGE_DELAY_MILLIS}"
                )));
            }
            config.virology.cta_exchange_delay_millis = millis;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration sanity.
    ///
    /// # Errors
    ///
    /// Returns an error when values are missing or out of range.
    pub fn validate(&self) -> Result<()> {
        self.websites.validate()?;
        self.virology.validate()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u16(key: &str) -> Result<Option<u16>> {
    env_string(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| Error::InvalidInput(format!("{key} must be a port number")))
        })
        .transpose()
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    env_string(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| Error::InvalidInput(format!("{key} must be a non-negative integer")))
        })
        .transpose()
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    env_string(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| Error::InvalidInput(format!("{key} must be a non-negative integer")))
        })
        .transpose()
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    env_string(key).map(|value| parse_bool(key, &value)).transpose()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::InvalidInput(format!("{key} must be true or false"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().expect("valid");
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("K", "true").unwrap());
        assert!(parse_bool("K", "1").unwrap());
        assert!(!parse_bool("K", "FALSE").unwrap());
        assert!(!parse_bool("K", "0").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_retry_budget() {
        let mut config = Config::default();
        config.virology.max_token_persistence_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_website_template() {
        let mut config = Config::default();
        config.websites.order_website = String::new();
        assert!(config.validate().is_err());
    }
}
