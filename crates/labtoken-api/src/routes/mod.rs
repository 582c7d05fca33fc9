//! HTTP route handlers.

pub mod virology;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// Virology test routes.
pub fn virology_routes() -> Router<Arc<AppState>> {
    virology::routes()
}
