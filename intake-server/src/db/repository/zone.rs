//! Zone Repository

use shared::models::{Zone, ZoneCreate};
use sqlx::SqlitePool;

use super::{RepoError, RepoResult};

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Zone>> {
    let zones = sqlx::query_as::<_, Zone>(
        "SELECT id, ward_number, name, importance, centroid_lat, centroid_lon, boundary \
         FROM zones ORDER BY ward_number",
    )
    .fetch_all(pool)
    .await?;
    Ok(zones)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Zone>> {
    let zone = sqlx::query_as::<_, Zone>(
        "SELECT id, ward_number, name, importance, centroid_lat, centroid_lon, boundary \
         FROM zones WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(zone)
}

pub async fn create(pool: &SqlitePool, data: ZoneCreate) -> RepoResult<Zone> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO zones (id, ward_number, name, importance, centroid_lat, centroid_lon, boundary) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(data.ward_number)
    .bind(&data.name)
    .bind(data.importance)
    .bind(data.centroid_lat)
    .bind(data.centroid_lon)
    .bind(&data.boundary)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create zone".into()))
}
