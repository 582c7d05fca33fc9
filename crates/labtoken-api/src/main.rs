//! `labtoken-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use anyhow::Result;

use labtoken_api::config::Config;
use labtoken_api::server::Server;
use labtoken_core::observability::{LogFormat, init_logging};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));

    // This build ships only the in-memory order store; the durable backend
    // is wired in at deployment as an OrderStore adapter.
    if !config.debug {
        anyhow::bail!(
            "a durable order store adapter is required when LABTOKEN_DEBUG=false; \
             this build provides only the in-memory store"
        );
    }
    tracing::warn!("Using in-memory order store (debug only)");

    let server = Server::new(config);
    server.serve().await?;
    Ok(())
}
