//! Issue History Repository
//!
//! Append-only audit trail. Entries are only ever written inside the same
//! transaction as the status change they record, so inserts take a
//! connection, not the pool.

use shared::models::IssueHistoryEntry;
use shared::types::IssueStatus;
use sqlx::{SqliteConnection, SqlitePool};

use super::RepoResult;

/// Append one entry. Caller owns the transaction.
pub async fn insert(
    conn: &mut SqliteConnection,
    issue_id: i64,
    status: IssueStatus,
    actor: &str,
    remarks: Option<&str>,
    changed_at: i64,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO issue_history (issue_id, status, actor, remarks, changed_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(issue_id)
    .bind(status)
    .bind(actor)
    .bind(remarks)
    .bind(changed_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Chronological audit trail for one issue
pub async fn list_for_issue(pool: &SqlitePool, issue_id: i64) -> RepoResult<Vec<IssueHistoryEntry>> {
    let entries = sqlx::query_as::<_, IssueHistoryEntry>(
        "SELECT id, issue_id, status, actor, remarks, changed_at \
         FROM issue_history WHERE issue_id = ? ORDER BY changed_at ASC, id ASC",
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Number of entries for one issue (used by tests and consistency checks)
pub async fn count_for_issue(pool: &SqlitePool, issue_id: i64) -> RepoResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM issue_history WHERE issue_id = ?")
            .bind(issue_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
