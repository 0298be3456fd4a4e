//! Lifecycle Engine
//!
//! The state machine over issue statuses. Every mutation goes through one of
//! the named actions here; each action validates the edge, then delegates to
//! the repository's compare-and-swap transition so concurrent actors cannot
//! both win.
//!
//! Allowed edges:
//!
//! ```text
//! pending     -> assigned | rejected
//! assigned    -> in_progress | pending
//! in_progress -> resolved | assigned
//! resolved    -> closed | in_progress
//! closed      -> in_progress          (reopen)
//! rejected    -> pending              (reopen)
//! ```

use shared::models::Issue;
use shared::request::{
    AcceptRequest, AssignRequest, AutoAssignRequest, CloseRequest, EscalateRequest, RejectRequest,
    ReopenRequest, ResolveRequest, UnassignRequest,
};
use shared::response::IssueDetail;
use shared::types::IssueStatus;
use shared::util::now_millis;
use sqlx::SqlitePool;
use tracing::info;

use crate::core::config::SlaConfig;
use crate::core::error::{AppError, AppResult};
use crate::db::repository::{assignee, issue, issue_history};
use crate::db::repository::issue::{AssigneeChange, TransitionWrite};

pub struct LifecycleEngine {
    pool: SqlitePool,
    sla: SlaConfig,
}

/// Edge table of the status state machine
pub fn valid_transition(from: IssueStatus, to: IssueStatus) -> bool {
    use IssueStatus::*;
    matches!(
        (from, to),
        (Pending, Assigned)
            | (Pending, Rejected)
            | (Assigned, InProgress)
            | (Assigned, Pending)
            | (InProgress, Resolved)
            | (InProgress, Assigned)
            | (Resolved, Closed)
            | (Resolved, InProgress)
            | (Closed, InProgress)
            | (Rejected, Pending)
    )
}

impl LifecycleEngine {
    pub fn new(pool: SqlitePool, sla: SlaConfig) -> Self {
        Self { pool, sla }
    }

    async fn load(&self, issue_id: i64) -> AppResult<Issue> {
        issue::find_by_id(&self.pool, issue_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Issue {issue_id} not found")))
    }

    fn ensure_edge(from: IssueStatus, to: IssueStatus) -> AppResult<()> {
        if from == to {
            return Err(AppError::NoOpTransition(from));
        }
        if !valid_transition(from, to) {
            return Err(AppError::InvalidTransition { from, to });
        }
        Ok(())
    }

    async fn apply(
        &self,
        current: &Issue,
        to: IssueStatus,
        actor: &str,
        remarks: Option<String>,
        assignee: AssigneeChange,
        resolved_at: Option<i64>,
        clear_resolved_at: bool,
    ) -> AppResult<Issue> {
        Self::ensure_edge(current.status, to)?;
        let updated = issue::apply_transition(
            &self.pool,
            TransitionWrite {
                issue_id: current.id,
                expected: current.status,
                to,
                actor: actor.to_string(),
                remarks,
                assignee,
                resolved_at,
                clear_resolved_at,
            },
        )
        .await?;
        info!(
            issue_id = updated.id,
            from = %current.status,
            to = %to,
            actor = %actor,
            "Status transition applied"
        );
        Ok(updated)
    }

    /// Assign to a named engineer. Valid from `pending` (first assignment)
    /// and from `in_progress` (handoff back to the assigned state).
    pub async fn assign(&self, issue_id: i64, req: AssignRequest) -> AppResult<Issue> {
        let current = self.load(issue_id).await?;
        let target = assignee::find_by_id(&self.pool, &req.assignee_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Assignee {} not found", req.assignee_id)))?;
        if !target.active {
            return Err(AppError::validation(format!(
                "Assignee {} is not active",
                target.id
            )));
        }
        self.apply(
            &current,
            IssueStatus::Assigned,
            &req.actor,
            Some(format!("Assigned to {}", target.name)),
            AssigneeChange::Set(target.id),
            None,
            false,
        )
        .await
    }

    /// Load-balanced assignment: least open issues among assignees eligible
    /// for the issue's zone, widening to the whole pool when the zone has
    /// nobody. Ties break by ascending assignee id.
    pub async fn auto_assign(&self, issue_id: i64, req: AutoAssignRequest) -> AppResult<Issue> {
        let current = self.load(issue_id).await?;
        Self::ensure_edge(current.status, IssueStatus::Assigned)?;

        let mut pool = assignee::eligible_for_zone(&self.pool, current.zone_id).await?;
        if pool.is_empty() {
            pool = assignee::eligible_any(&self.pool).await?;
        }
        let chosen = pool.into_iter().next().ok_or(AppError::NoAssigneeAvailable)?;

        info!(
            issue_id,
            assignee_id = %chosen.id,
            open_count = chosen.open_count,
            "Auto-assignment selected least-loaded engineer"
        );
        self.apply(
            &current,
            IssueStatus::Assigned,
            &req.actor,
            Some(format!("Auto-assigned to {}", chosen.name)),
            AssigneeChange::Set(chosen.id),
            None,
            false,
        )
        .await
    }

    /// The assigned engineer starts work
    pub async fn accept(&self, issue_id: i64, req: AcceptRequest) -> AppResult<Issue> {
        let current = self.load(issue_id).await?;
        if current.assignee_id.as_deref() != Some(req.actor.as_str()) {
            return Err(AppError::validation(
                "Only the assigned engineer can accept an issue",
            ));
        }
        self.apply(
            &current,
            IssueStatus::InProgress,
            &req.actor,
            Some("Work started".to_string()),
            AssigneeChange::Keep,
            None,
            false,
        )
        .await
    }

    /// Return an assigned issue to the pending pool
    pub async fn unassign(&self, issue_id: i64, req: UnassignRequest) -> AppResult<Issue> {
        let current = self.load(issue_id).await?;
        self.apply(
            &current,
            IssueStatus::Pending,
            &req.actor,
            Some(req.remarks.unwrap_or_else(|| "Unassigned".to_string())),
            AssigneeChange::Clear,
            None,
            false,
        )
        .await
    }

    /// Mark work complete. Requires resolution notes and an evidence
    /// reference; stamps `resolved_at`.
    pub async fn resolve(&self, issue_id: i64, req: ResolveRequest) -> AppResult<Issue> {
        if req.notes.trim().is_empty() {
            return Err(AppError::validation("Resolution notes are required"));
        }
        if req.evidence_ref.trim().is_empty() {
            return Err(AppError::validation("Evidence reference is required"));
        }
        let current = self.load(issue_id).await?;
        self.apply(
            &current,
            IssueStatus::Resolved,
            &req.actor,
            Some(format!("Resolved: {} (evidence: {})", req.notes, req.evidence_ref)),
            AssigneeChange::Keep,
            Some(now_millis()),
            false,
        )
        .await
    }

    /// Verify and close a resolved issue
    pub async fn close(&self, issue_id: i64, req: CloseRequest) -> AppResult<Issue> {
        let current = self.load(issue_id).await?;
        self.apply(
            &current,
            IssueStatus::Closed,
            &req.actor,
            Some(
                req.remarks
                    .unwrap_or_else(|| "Issue verified and closed".to_string()),
            ),
            AssigneeChange::Keep,
            None,
            false,
        )
        .await
    }

    /// Reject a pending issue, with a mandatory reason
    pub async fn reject(&self, issue_id: i64, req: RejectRequest) -> AppResult<Issue> {
        if req.reason.trim().is_empty() {
            return Err(AppError::validation("A rejection reason is required"));
        }
        let current = self.load(issue_id).await?;
        self.apply(
            &current,
            IssueStatus::Rejected,
            &req.actor,
            Some(format!("Rejected: {}", req.reason)),
            AssigneeChange::Keep,
            None,
            false,
        )
        .await
    }

    /// Reopen a settled issue. Resolved and closed issues go back to
    /// `in_progress` (the previous assignee keeps it); rejected issues
    /// return to `pending`. Clears `resolved_at` so the SLA clock restarts
    /// against the original submission time.
    pub async fn reopen(&self, issue_id: i64, req: ReopenRequest) -> AppResult<Issue> {
        if req.reason.trim().is_empty() {
            return Err(AppError::validation("A reopen reason is required"));
        }
        let current = self.load(issue_id).await?;
        let target = match current.status {
            IssueStatus::Resolved | IssueStatus::Closed => IssueStatus::InProgress,
            IssueStatus::Rejected => IssueStatus::Pending,
            other => {
                return Err(AppError::InvalidTransition {
                    from: other,
                    to: IssueStatus::InProgress,
                });
            }
        };
        self.apply(
            &current,
            target,
            &req.actor,
            Some(format!("Issue reopened: {}", req.reason)),
            AssigneeChange::Keep,
            None,
            true,
        )
        .await
    }

    /// Explicit, audited priority raise. Lowering is not an escalation.
    pub async fn escalate(&self, issue_id: i64, req: EscalateRequest) -> AppResult<Issue> {
        if req.reason.trim().is_empty() {
            return Err(AppError::validation("An escalation reason is required"));
        }
        let current = self.load(issue_id).await?;
        if !current.status.is_open() {
            return Err(AppError::validation(format!(
                "Cannot escalate a {} issue",
                current.status
            )));
        }
        if req.tier <= current.priority {
            return Err(AppError::validation(format!(
                "Escalation must raise the priority above {}",
                current.priority
            )));
        }
        let updated = issue::escalate(
            &self.pool,
            issue_id,
            current.priority,
            req.tier,
            current.status,
            &req.actor,
            &format!("Escalated to {}: {}", req.tier, req.reason),
        )
        .await?;
        info!(issue_id, from = %current.priority, to = %req.tier, "Priority escalated");
        Ok(updated)
    }

    /// Whether the issue is currently past its SLA target
    ///
    /// Only issues still on the clock can breach: resolved, closed and
    /// rejected issues report false regardless of how late resolution
    /// landed. Late-resolution reporting is a metrics concern, not a
    /// breach-queue concern.
    pub fn is_breached(&self, issue: &Issue, now_ms: i64) -> bool {
        if issue.status.stops_sla_clock() || issue.status == IssueStatus::Rejected {
            return false;
        }
        let target_ms = self.sla.target_minutes(issue.priority) * 60_000;
        now_ms - issue.submitted_at > target_ms
    }

    /// Open issues currently past their SLA target, oldest first
    pub async fn breach_candidates(&self) -> AppResult<Vec<Issue>> {
        let now = now_millis();
        let open = issue::find_open(&self.pool).await?;
        Ok(open
            .into_iter()
            .filter(|i| self.is_breached(i, now))
            .collect())
    }

    /// Issue with its audit trail and computed SLA flag
    pub async fn detail(&self, issue_id: i64) -> AppResult<IssueDetail> {
        let issue = self.load(issue_id).await?;
        let history = issue_history::list_for_issue(&self.pool, issue_id).await?;
        let sla_breached = self.is_breached(&issue, now_millis());
        Ok(IssueDetail {
            issue,
            history,
            sla_breached,
        })
    }

    /// One engineer's worklist, most urgent first
    pub async fn worklist(&self, assignee_id: &str) -> AppResult<Vec<Issue>> {
        assignee::find_by_id(&self.pool, assignee_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Assignee {assignee_id} not found")))?;
        Ok(issue::assigned_to(&self.pool, assignee_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::IssueStatus::*;

    #[test]
    fn edge_table_matches_the_state_machine() {
        let allowed = [
            (Pending, Assigned),
            (Pending, Rejected),
            (Assigned, InProgress),
            (Assigned, Pending),
            (InProgress, Resolved),
            (InProgress, Assigned),
            (Resolved, Closed),
            (Resolved, InProgress),
            (Closed, InProgress),
            (Rejected, Pending),
        ];
        for from in IssueStatus::ALL {
            for to in IssueStatus::ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    valid_transition(from, to),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn self_transition_is_a_noop_not_an_edge() {
        for status in IssueStatus::ALL {
            assert!(!valid_transition(status, status));
            match LifecycleEngine::ensure_edge(status, status) {
                Err(AppError::NoOpTransition(s)) => assert_eq!(s, status),
                other => panic!("expected NoOpTransition, got {other:?}"),
            }
        }
    }

    #[test]
    fn invalid_edge_names_both_ends() {
        match LifecycleEngine::ensure_edge(Pending, Resolved) {
            Err(AppError::InvalidTransition { from, to }) => {
                assert_eq!(from, Pending);
                assert_eq!(to, Resolved);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }
}
