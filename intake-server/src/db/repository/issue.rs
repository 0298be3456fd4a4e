//! Issue Repository
//!
//! All writes that must be atomic (insert + first history entry, status
//! compare-and-swap + history entry) run in a single transaction here.

use shared::models::Issue;
use shared::types::{IssueKind, IssueStatus, PriorityTier};
use shared::util::now_millis;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{RepoError, RepoResult, issue_history};

const ISSUE_COLUMNS: &str = "id, issue_number, idempotency_key, latitude, longitude, zone_id, \
     kind, department, ai_label, ai_confidence, priority, status, description, image_ref, \
     reporter_id, assignee_id, submitted_at, updated_at, resolved_at";

/// What a lifecycle transition writes, applied as one transaction
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    pub issue_id: i64,
    /// Compare-and-swap guard: the status the caller observed
    pub expected: IssueStatus,
    pub to: IssueStatus,
    pub actor: String,
    pub remarks: Option<String>,
    pub assignee: AssigneeChange,
    /// Some = stamp resolved_at
    pub resolved_at: Option<i64>,
    /// Reopening clears the previous resolution timestamp
    pub clear_resolved_at: bool,
}

#[derive(Debug, Clone)]
pub enum AssigneeChange {
    Keep,
    Set(String),
    Clear,
}

/// Insert a new issue and its initial history entry atomically.
///
/// A unique-violation on `idempotency_key` surfaces as [`RepoError::Duplicate`]
/// so the intake pipeline can return the already-persisted issue.
pub async fn insert_with_history(
    pool: &SqlitePool,
    issue: &Issue,
    remarks: &str,
) -> RepoResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO issues (id, issue_number, idempotency_key, latitude, longitude, zone_id, \
         kind, department, ai_label, ai_confidence, priority, status, description, image_ref, \
         reporter_id, assignee_id, submitted_at, updated_at, resolved_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(issue.id)
    .bind(&issue.issue_number)
    .bind(&issue.idempotency_key)
    .bind(issue.latitude)
    .bind(issue.longitude)
    .bind(issue.zone_id)
    .bind(issue.kind)
    .bind(&issue.department)
    .bind(&issue.ai_label)
    .bind(issue.ai_confidence)
    .bind(issue.priority)
    .bind(issue.status)
    .bind(&issue.description)
    .bind(&issue.image_ref)
    .bind(&issue.reporter_id)
    .bind(&issue.assignee_id)
    .bind(issue.submitted_at)
    .bind(issue.updated_at)
    .bind(issue.resolved_at)
    .execute(&mut *tx)
    .await?;

    issue_history::insert(
        &mut *tx,
        issue.id,
        issue.status,
        &issue.reporter_id,
        Some(remarks),
        issue.submitted_at,
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(issue)
}

pub async fn find_by_idempotency_key(pool: &SqlitePool, key: &str) -> RepoResult<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues WHERE idempotency_key = ?"
    ))
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(issue)
}

/// Open issues of one kind submitted inside `(from_ms, to_ms]`.
///
/// Candidate set for duplicate detection; the caller applies the spatial
/// radius and ordering.
pub async fn find_recent_same_kind(
    pool: &SqlitePool,
    kind: IssueKind,
    from_ms: i64,
    to_ms: i64,
) -> RepoResult<Vec<Issue>> {
    let issues = sqlx::query_as::<_, Issue>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues \
         WHERE kind = ? AND submitted_at > ? AND submitted_at <= ? \
           AND status NOT IN ('closed', 'rejected') \
         ORDER BY submitted_at ASC"
    ))
    .bind(kind)
    .bind(from_ms)
    .bind(to_ms)
    .fetch_all(pool)
    .await?;
    Ok(issues)
}

/// Issues still on the SLA clock (candidates for breach evaluation)
pub async fn find_open(pool: &SqlitePool) -> RepoResult<Vec<Issue>> {
    let issues = sqlx::query_as::<_, Issue>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues \
         WHERE status NOT IN ('resolved', 'closed', 'rejected') \
         ORDER BY submitted_at ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(issues)
}

/// Filtered, paginated listing, newest first
pub async fn list(
    pool: &SqlitePool,
    filter: &shared::request::IssueFilter,
    page: shared::request::Pagination,
) -> RepoResult<(Vec<Issue>, i64)> {
    let page = page.clamped();

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM issues WHERE 1=1");
    push_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb =
        QueryBuilder::<Sqlite>::new(format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE 1=1"));
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY submitted_at DESC LIMIT ");
    qb.push_bind(i64::from(page.limit));
    qb.push(" OFFSET ");
    qb.push_bind(page.offset());

    let issues = qb.build_query_as::<Issue>().fetch_all(pool).await?;
    Ok((issues, total))
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &shared::request::IssueFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
    if let Some(zone_id) = filter.zone_id {
        qb.push(" AND zone_id = ").push_bind(zone_id);
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ").push_bind(kind);
    }
    if let Some(assignee_id) = &filter.assignee_id {
        qb.push(" AND assignee_id = ").push_bind(assignee_id.clone());
    }
    if let Some(reporter_id) = &filter.reporter_id {
        qb.push(" AND reporter_id = ").push_bind(reporter_id.clone());
    }
}

/// Worklist for one assignee: most urgent first, then oldest
pub async fn assigned_to(pool: &SqlitePool, assignee_id: &str) -> RepoResult<Vec<Issue>> {
    let issues = sqlx::query_as::<_, Issue>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues WHERE assignee_id = ? \
         ORDER BY CASE priority \
             WHEN 'critical' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END, \
           submitted_at ASC"
    ))
    .bind(assignee_id)
    .fetch_all(pool)
    .await?;
    Ok(issues)
}

/// Apply one status transition: compare-and-swap on the current status plus
/// the audit entry, in a single transaction. Zero rows affected means either
/// the issue is gone or a concurrent transition won the race.
pub async fn apply_transition(pool: &SqlitePool, write: TransitionWrite) -> RepoResult<Issue> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE issues SET status = ");
    qb.push_bind(write.to);
    qb.push(", updated_at = ").push_bind(now);
    match &write.assignee {
        AssigneeChange::Keep => {}
        AssigneeChange::Set(id) => {
            qb.push(", assignee_id = ").push_bind(id.clone());
        }
        AssigneeChange::Clear => {
            qb.push(", assignee_id = NULL");
        }
    }
    if let Some(ts) = write.resolved_at {
        qb.push(", resolved_at = ").push_bind(ts);
    } else if write.clear_resolved_at {
        qb.push(", resolved_at = NULL");
    }
    qb.push(" WHERE id = ").push_bind(write.issue_id);
    qb.push(" AND status = ").push_bind(write.expected);

    let result = qb.build().execute(&mut *tx).await?;
    if result.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM issues WHERE id = ?")
            .bind(write.issue_id)
            .fetch_optional(&mut *tx)
            .await?;
        return Err(match exists {
            None => RepoError::NotFound(format!("Issue {} not found", write.issue_id)),
            Some(_) => RepoError::Conflict(format!(
                "Issue {} changed status concurrently",
                write.issue_id
            )),
        });
    }

    issue_history::insert(
        &mut *tx,
        write.issue_id,
        write.to,
        &write.actor,
        write.remarks.as_deref(),
        now,
    )
    .await?;

    tx.commit().await?;

    find_by_id(pool, write.issue_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Issue {} not found", write.issue_id)))
}

/// Raise the priority tier, guarded against concurrent escalations, with an
/// audit entry recording the current status and the reason
pub async fn escalate(
    pool: &SqlitePool,
    issue_id: i64,
    expected: PriorityTier,
    new_tier: PriorityTier,
    current_status: IssueStatus,
    actor: &str,
    remarks: &str,
) -> RepoResult<Issue> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE issues SET priority = ?, updated_at = ? WHERE id = ? AND priority = ?",
    )
    .bind(new_tier)
    .bind(now)
    .bind(issue_id)
    .bind(expected)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::Conflict(format!(
            "Issue {issue_id} priority changed concurrently"
        )));
    }

    issue_history::insert(&mut *tx, issue_id, current_status, actor, Some(remarks), now).await?;

    tx.commit().await?;

    find_by_id(pool, issue_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Issue {issue_id} not found")))
}

/// Edit the description, logging the edit against the current status
pub async fn update_description(
    pool: &SqlitePool,
    issue_id: i64,
    description: &str,
    actor: &str,
) -> RepoResult<Issue> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let status: Option<IssueStatus> =
        sqlx::query_scalar("SELECT status FROM issues WHERE id = ?")
            .bind(issue_id)
            .fetch_optional(&mut *tx)
            .await?;
    let status =
        status.ok_or_else(|| RepoError::NotFound(format!("Issue {issue_id} not found")))?;

    sqlx::query("UPDATE issues SET description = ?, updated_at = ? WHERE id = ?")
        .bind(description)
        .bind(now)
        .bind(issue_id)
        .execute(&mut *tx)
        .await?;

    issue_history::insert(
        &mut *tx,
        issue_id,
        status,
        actor,
        Some("Updated: description"),
        now,
    )
    .await?;

    tx.commit().await?;

    find_by_id(pool, issue_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Issue {issue_id} not found")))
}
