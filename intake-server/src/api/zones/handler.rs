//! Zone API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use shared::models::{Zone, ZoneCreate};
use shared::response::AppResponse;
use shared::types::Coordinates;

use crate::core::ServerState;
use crate::core::error::{AppError, AppResult, ok};
use crate::db::repository::zone;

/// GET /api/zones
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<AppResponse<Vec<Zone>>>> {
    let zones = state.spatial.zones().await?;
    Ok(ok(zones))
}

/// POST /api/zones
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ZoneCreate>,
) -> AppResult<Json<AppResponse<Zone>>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Zone name is required"));
    }
    if !(1.0..=3.0).contains(&payload.importance) {
        return Err(AppError::validation("Zone importance must be within [1, 3]"));
    }
    Coordinates::new(payload.centroid_lat, payload.centroid_lon).validate()?;

    let created = zone::create(&state.pool, payload).await?;
    // 新增后强制刷新缓存
    state.spatial.invalidate().await;
    Ok(ok(created))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub lat: f64,
    pub lon: f64,
}

/// GET /api/zones/resolve?lat=..&lon=..
pub async fn resolve(
    State(state): State<ServerState>,
    Query(query): Query<ResolveQuery>,
) -> AppResult<Json<AppResponse<Zone>>> {
    let zone = state
        .spatial
        .resolve(Coordinates::new(query.lat, query.lon))
        .await?;
    Ok(ok(zone))
}
