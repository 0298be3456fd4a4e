//! Issue routes
//!
//! | Path | Method | Action |
//! |------|--------|--------|
//! | /api/issues | POST | submit a report |
//! | /api/issues | GET | filtered listing |
//! | /api/issues/breaches | GET | open issues past SLA target |
//! | /api/issues/{id} | GET | detail with history and SLA flag |
//! | /api/issues/{id} | PATCH | edit description |
//! | /api/issues/{id}/assign | POST | manual assignment |
//! | /api/issues/{id}/auto-assign | POST | load-balanced assignment |
//! | /api/issues/{id}/accept | POST | assignee starts work |
//! | /api/issues/{id}/unassign | POST | back to pending |
//! | /api/issues/{id}/resolve | POST | mark resolved (notes + evidence) |
//! | /api/issues/{id}/close | POST | verify and close |
//! | /api/issues/{id}/reject | POST | reject with reason |
//! | /api/issues/{id}/reopen | POST | reopen with reason |
//! | /api/issues/{id}/escalate | POST | audited priority raise |
//! | /api/assignees/{id}/issues | GET | one engineer's worklist |

pub mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/issues", post(handler::submit).get(handler::list))
        // Static segment must register before the {id} capture
        .route("/api/issues/breaches", get(handler::breaches))
        .route(
            "/api/issues/{id}",
            get(handler::get_by_id).patch(handler::update),
        )
        .route("/api/issues/{id}/assign", post(handler::assign))
        .route("/api/issues/{id}/auto-assign", post(handler::auto_assign))
        .route("/api/issues/{id}/accept", post(handler::accept))
        .route("/api/issues/{id}/unassign", post(handler::unassign))
        .route("/api/issues/{id}/resolve", post(handler::resolve))
        .route("/api/issues/{id}/close", post(handler::close))
        .route("/api/issues/{id}/reject", post(handler::reject))
        .route("/api/issues/{id}/reopen", post(handler::reopen))
        .route("/api/issues/{id}/escalate", post(handler::escalate))
        .route("/api/assignees/{id}/issues", get(handler::worklist))
}
