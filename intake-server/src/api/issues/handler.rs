//! Issue API Handlers
//!
//! Thin translation layer: extract, delegate to the pipeline or lifecycle
//! engine, wrap in the response envelope. No business rules live here.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use shared::models::Issue;
use shared::request::{
    AcceptRequest, AssignRequest, AutoAssignRequest, CloseRequest, EscalateRequest, IssueFilter,
    Pagination, RejectRequest, ReopenRequest, ResolveRequest, SubmitIssueRequest, UnassignRequest,
    UpdateIssueRequest,
};
use shared::response::{AppResponse, IssueDetail, Paginated, SubmitOutcome};
use shared::types::{IssueKind, IssueStatus, PriorityTier};

use crate::core::error::{AppError, AppResult, ok, ok_with_message};
use crate::core::ServerState;
use crate::db::repository::issue;

/// POST /api/issues
pub async fn submit(
    State(state): State<ServerState>,
    Json(payload): Json<SubmitIssueRequest>,
) -> AppResult<Json<AppResponse<SubmitOutcome>>> {
    let outcome = state.intake.submit(payload).await?;
    let message = if outcome.is_duplicate() {
        "Matched an existing open report"
    } else {
        "Issue accepted"
    };
    Ok(ok_with_message(outcome, message))
}

/// Query-string shape for GET /api/issues
///
/// Kept flat: `serde(flatten)` over mixed string/number fields trips up the
/// query-string deserializer.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default)]
    pub priority: Option<PriorityTier>,
    #[serde(default)]
    pub zone_id: Option<i64>,
    #[serde(default)]
    pub kind: Option<IssueKind>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub reporter_id: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// GET /api/issues
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Paginated<Issue>>>> {
    let filter = IssueFilter {
        status: query.status,
        priority: query.priority,
        zone_id: query.zone_id,
        kind: query.kind,
        assignee_id: query.assignee_id,
        reporter_id: query.reporter_id,
    };
    let page = Pagination {
        page: query.page,
        limit: query.limit,
    }
    .clamped();

    let (items, total) = issue::list(&state.pool, &filter, page).await?;
    Ok(ok(Paginated {
        items,
        page: page.page,
        limit: page.limit,
        total,
    }))
}

/// GET /api/issues/breaches
pub async fn breaches(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<Issue>>>> {
    let issues = state.lifecycle.breach_candidates().await?;
    Ok(ok(issues))
}

/// GET /api/issues/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<IssueDetail>>> {
    let detail = state.lifecycle.detail(id).await?;
    Ok(ok(detail))
}

/// PATCH /api/issues/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateIssueRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    if payload.description.trim().is_empty() {
        return Err(AppError::validation("description must not be empty"));
    }
    let updated =
        issue::update_description(&state.pool, id, &payload.description, &payload.actor).await?;
    Ok(ok(updated))
}

/// POST /api/issues/{id}/assign
pub async fn assign(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.assign(id, payload).await?))
}

/// POST /api/issues/{id}/auto-assign
pub async fn auto_assign(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<AutoAssignRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.auto_assign(id, payload).await?))
}

/// POST /api/issues/{id}/accept
pub async fn accept(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<AcceptRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.accept(id, payload).await?))
}

/// POST /api/issues/{id}/unassign
pub async fn unassign(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<UnassignRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.unassign(id, payload).await?))
}

/// POST /api/issues/{id}/resolve
pub async fn resolve(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ResolveRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.resolve(id, payload).await?))
}

/// POST /api/issues/{id}/close
pub async fn close(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<CloseRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.close(id, payload).await?))
}

/// POST /api/issues/{id}/reject
pub async fn reject(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<RejectRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.reject(id, payload).await?))
}

/// POST /api/issues/{id}/reopen
pub async fn reopen(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ReopenRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.reopen(id, payload).await?))
}

/// POST /api/issues/{id}/escalate
pub async fn escalate(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<EscalateRequest>,
) -> AppResult<Json<AppResponse<Issue>>> {
    Ok(ok(state.lifecycle.escalate(id, payload).await?))
}

/// GET /api/assignees/{id}/issues
pub async fn worklist(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<Issue>>>> {
    Ok(ok(state.lifecycle.worklist(&id).await?))
}
