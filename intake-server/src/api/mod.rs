//! API route modules
//!
//! - [`health`] - liveness check
//! - [`issues`] - intake and lifecycle endpoints
//! - [`zones`] - zone reference data and coordinate resolution

pub mod health;
pub mod issues;
pub mod zones;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Assemble the full application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(issues::router())
        .merge(zones::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
