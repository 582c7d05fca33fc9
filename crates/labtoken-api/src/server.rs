//! API server implementation.
//!
//! Provides health, metrics, and the virology endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use labtoken_core::error::{Error, Result};
use labtoken_core::token::TokensGenerator;
use labtoken_virology::{MemoryOrderStore, OrderStore, VirologyService};

use crate::config::Config;

// ============================================================================
// Health Response
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The virology workflow.
    pub virology: Arc<VirologyService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("virology", &"<VirologyService>")
            .finish()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check
/// that doesn't verify dependencies.
async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Server
// ============================================================================

/// The labtoken API server.
pub struct Server {
    config: Config,
    store: Arc<dyn OrderStore>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("store", &"<OrderStore>")
            .finish()
    }
}

impl Server {
    /// Creates a new server with the given configuration.
    ///
    /// Defaults to the in-memory order store; use `with_order_store` to
    /// wire a durable backend.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(MemoryOrderStore::new()),
        }
    }

    /// Creates a new server with an explicit order store.
    #[must_use]
    pub fn with_order_store(config: Config, store: Arc<dyn OrderStore>) -> Self {
        Self { config, store }
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let virology = Arc::new(VirologyService::new(
            Arc::clone(&self.store),
            TokensGenerator::new(),
            self.config.virology.clone(),
        ));
        let state = Arc::new(AppState {
            config: self.config.clone(),
            virology,
        });

        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);

        Router::new()
            // Health and metrics endpoints
            .route("/health", get(health))
            .route("/metrics", get(crate::metrics::serve_metrics))
            // Virology endpoints
            .merge(crate::routes::virology_routes())
            // Middleware (order matters): metrics outermost for timing.
            .layer(TraceLayer::new_for_http())
            .layer(metrics_layer)
            .with_state(state)
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the server cannot
    /// bind to the port.
    pub async fn serve(&self) -> Result<()> {
        self.config.validate()?;

        // Initialize metrics before starting the server
        crate::metrics::init_metrics();
        labtoken_virology::metrics::register_metrics();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(
            http_port = self.config.http_port,
            "Starting labtoken API server"
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal {
                message: format!("failed to bind to {addr}: {e}"),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// Useful for integration tests that drive the full request path
    /// without binding a socket.
    #[must_use]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }
}

// ============================================================================
// Server Builder
// ============================================================================

/// Builder for [`Server`].
#[derive(Default)]
pub struct ServerBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn OrderStore>>,
}

impl ServerBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Enables or disables debug mode on the configuration.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        let mut config = self.config.unwrap_or_default();
        config.debug = debug;
        self.config = Some(config);
        self
    }

    /// Sets the order store.
    #[must_use]
    pub fn order_store(mut self, store: Arc<dyn OrderStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        let config = self.config.unwrap_or_default();
        match self.store {
            Some(store) => Server::with_order_store(config, store),
            None => Server::new(config),
        }
    }
}
