//! Assignee Repository
//!
//! Read interface over the assignment pool: eligible assignees and their
//! current open-issue load. The pool itself (accounts, capabilities) is
//! maintained by services outside this core; we only read it per assignment
//! decision and never cache the counts.

use shared::models::{Assignee, AssigneeLoad};
use sqlx::SqlitePool;

use super::RepoResult;

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Assignee>> {
    let assignee = sqlx::query_as::<_, Assignee>(
        "SELECT id, name, zone_id, active FROM assignees WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(assignee)
}

/// Eligible assignees for a zone with their open-issue counts, least loaded
/// first, ties broken by ascending id so the choice is deterministic.
///
/// An assignee with NULL zone_id is capable of any zone.
pub async fn eligible_for_zone(pool: &SqlitePool, zone_id: i64) -> RepoResult<Vec<AssigneeLoad>> {
    let rows = sqlx::query_as::<_, AssigneeLoad>(
        "SELECT a.id, a.name, COUNT(i.id) AS open_count \
         FROM assignees a \
         LEFT JOIN issues i ON i.assignee_id = a.id \
              AND i.status NOT IN ('resolved', 'closed', 'rejected') \
         WHERE a.active = 1 AND (a.zone_id = ? OR a.zone_id IS NULL) \
         GROUP BY a.id, a.name \
         ORDER BY open_count ASC, a.id ASC",
    )
    .bind(zone_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All eligible assignees regardless of zone, same ordering
pub async fn eligible_any(pool: &SqlitePool) -> RepoResult<Vec<AssigneeLoad>> {
    let rows = sqlx::query_as::<_, AssigneeLoad>(
        "SELECT a.id, a.name, COUNT(i.id) AS open_count \
         FROM assignees a \
         LEFT JOIN issues i ON i.assignee_id = a.id \
              AND i.status NOT IN ('resolved', 'closed', 'rejected') \
         WHERE a.active = 1 \
         GROUP BY a.id, a.name \
         ORDER BY open_count ASC, a.id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Register an assignee (seeding / administration)
pub async fn create(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    zone_id: Option<i64>,
) -> RepoResult<Assignee> {
    sqlx::query("INSERT INTO assignees (id, name, zone_id, active) VALUES (?, ?, ?, 1)")
        .bind(id)
        .bind(name)
        .bind(zone_id)
        .execute(pool)
        .await?;
    Ok(Assignee {
        id: id.to_string(),
        name: name.to_string(),
        zone_id,
        active: true,
    })
}
