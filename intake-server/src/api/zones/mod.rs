//! Zone routes
//!
//! | Path | Method | Action |
//! |------|--------|--------|
//! | /api/zones | GET | list all zones |
//! | /api/zones | POST | register a zone |
//! | /api/zones/resolve | GET | resolve lat/lon to a zone |

pub mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/zones", get(handler::list).post(handler::create))
        .route("/api/zones/resolve", get(handler::resolve))
}
