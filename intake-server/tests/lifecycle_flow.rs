//! Lifecycle engine end-to-end: transitions, assignment, audit trail, SLA.

mod common;

use common::*;
use intake_server::AppError;
use intake_server::db::repository::{issue, issue_history};
use shared::models::Issue;
use shared::request::{
    AcceptRequest, AssignRequest, AutoAssignRequest, CloseRequest, EscalateRequest, RejectRequest,
    ReopenRequest, ResolveRequest, UnassignRequest,
};
use shared::types::{IssueKind, IssueStatus, PriorityTier};
use shared::util::now_millis;

async fn submit_pending(state: &intake_server::ServerState, key: &str, lat: f64, lon: f64) -> Issue {
    match state
        .intake
        .submit(submission(key, lat, lon, IssueKind::Pothole))
        .await
        .unwrap()
    {
        shared::response::SubmitOutcome::Created { issue } => issue,
        other => panic!("expected Created, got {other:?}"),
    }
}

fn accept_req(actor: &str) -> AcceptRequest {
    AcceptRequest {
        actor: actor.into(),
    }
}

#[tokio::test]
async fn happy_path_pending_to_closed() {
    let (state, ward) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    seed_engineer(&state, "eng-01", Some(ward.id)).await;

    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;

    let issue = state
        .lifecycle
        .assign(
            issue.id,
            AssignRequest {
                actor: "dispatcher-1".into(),
                assignee_id: "eng-01".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(issue.status, IssueStatus::Assigned);
    assert_eq!(issue.assignee_id.as_deref(), Some("eng-01"));

    let issue = state
        .lifecycle
        .accept(issue.id, accept_req("eng-01"))
        .await
        .unwrap();
    assert_eq!(issue.status, IssueStatus::InProgress);

    let issue = state
        .lifecycle
        .resolve(
            issue.id,
            ResolveRequest {
                actor: "eng-01".into(),
                notes: "Filled and compacted".into(),
                evidence_ref: "img/after.jpg".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(issue.status, IssueStatus::Resolved);
    assert!(issue.resolved_at.is_some());

    let issue = state
        .lifecycle
        .close(
            issue.id,
            CloseRequest {
                actor: "supervisor-1".into(),
                remarks: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(issue.status, IssueStatus::Closed);
    assert!(issue.resolved_at.is_some(), "closing keeps resolved_at");

    let history = issue_history::list_for_issue(&state.pool, issue.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 5);
    let statuses: Vec<_> = history.iter().map(|h| h.status).collect();
    assert_eq!(
        statuses,
        vec![
            IssueStatus::Pending,
            IssueStatus::Assigned,
            IssueStatus::InProgress,
            IssueStatus::Resolved,
            IssueStatus::Closed,
        ]
    );
    assert_eq!(
        history[3].remarks.as_deref(),
        Some("Resolved: Filled and compacted (evidence: img/after.jpg)")
    );
    assert_eq!(history[4].remarks.as_deref(), Some("Issue verified and closed"));
}

#[tokio::test]
async fn invalid_transition_changes_nothing() {
    let (state, _) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;

    // pending cannot resolve or close directly
    let err = state
        .lifecycle
        .resolve(
            issue.id,
            ResolveRequest {
                actor: "eng-01".into(),
                notes: "n".into(),
                evidence_ref: "e".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }), "{err:?}");

    let err = state
        .lifecycle
        .close(
            issue.id,
            CloseRequest {
                actor: "x".into(),
                remarks: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }), "{err:?}");

    let unchanged = issue::find_by_id(&state.pool, issue.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, IssueStatus::Pending);
    let count = issue_history::count_for_issue(&state.pool, issue.id)
        .await
        .unwrap();
    assert_eq!(count, 1, "failed transitions leave no audit entries");
}

#[tokio::test]
async fn only_the_assigned_engineer_can_accept() {
    let (state, ward) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    seed_engineer(&state, "eng-01", Some(ward.id)).await;
    seed_engineer(&state, "eng-02", Some(ward.id)).await;

    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;
    state
        .lifecycle
        .assign(
            issue.id,
            AssignRequest {
                actor: "dispatcher-1".into(),
                assignee_id: "eng-01".into(),
            },
        )
        .await
        .unwrap();

    let err = state
        .lifecycle
        .accept(issue.id, accept_req("eng-02"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    state
        .lifecycle
        .accept(issue.id, accept_req("eng-01"))
        .await
        .unwrap();
}

#[tokio::test]
async fn auto_assign_balances_load_with_deterministic_ties() {
    let (state, ward) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    seed_engineer(&state, "eng-01", Some(ward.id)).await;
    seed_engineer(&state, "eng-02", Some(ward.id)).await;

    // Spread the reports out so none of them deduplicate
    let a = submit_pending(&state, "k1", 22.26, 73.12).await;
    let b = submit_pending(&state, "k2", 22.28, 73.16).await;
    let c = submit_pending(&state, "k3", 22.31, 73.20).await;

    let auto = |id| {
        state.lifecycle.auto_assign(
            id,
            AutoAssignRequest {
                actor: "dispatcher-1".into(),
            },
        )
    };

    // Zero load everywhere: tie breaks to the lowest id
    let a = auto(a.id).await.unwrap();
    assert_eq!(a.assignee_id.as_deref(), Some("eng-01"));

    // eng-01 now carries one open issue
    let b = auto(b.id).await.unwrap();
    assert_eq!(b.assignee_id.as_deref(), Some("eng-02"));

    // Both carry one: back to the lowest id
    let c = auto(c.id).await.unwrap();
    assert_eq!(c.assignee_id.as_deref(), Some("eng-01"));
}

#[tokio::test]
async fn auto_assign_widens_when_the_zone_has_nobody() {
    let (state, _) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    let other = seed_unbounded_ward(&state, 2).await;
    // Only engineer is pinned to the other ward
    seed_engineer(&state, "eng-09", Some(other.id)).await;

    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;
    let issue = state
        .lifecycle
        .auto_assign(
            issue.id,
            AutoAssignRequest {
                actor: "dispatcher-1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(issue.assignee_id.as_deref(), Some("eng-09"));
}

#[tokio::test]
async fn auto_assign_with_empty_pool_fails_cleanly() {
    let (state, _) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;

    let err = state
        .lifecycle
        .auto_assign(
            issue.id,
            AutoAssignRequest {
                actor: "dispatcher-1".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoAssigneeAvailable), "{err:?}");

    let unchanged = issue::find_by_id(&state.pool, issue.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, IssueStatus::Pending);
}

#[tokio::test]
async fn unassign_returns_the_issue_to_the_pool() {
    let (state, ward) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    seed_engineer(&state, "eng-01", Some(ward.id)).await;

    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;
    let issue = state
        .lifecycle
        .assign(
            issue.id,
            AssignRequest {
                actor: "dispatcher-1".into(),
                assignee_id: "eng-01".into(),
            },
        )
        .await
        .unwrap();

    let issue = state
        .lifecycle
        .unassign(
            issue.id,
            UnassignRequest {
                actor: "dispatcher-1".into(),
                remarks: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(issue.status, IssueStatus::Pending);
    assert!(issue.assignee_id.is_none());
}

#[tokio::test]
async fn reject_and_reopen_returns_to_pending() {
    let (state, _) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;

    let err = state
        .lifecycle
        .reject(
            issue.id,
            RejectRequest {
                actor: "dispatcher-1".into(),
                reason: "  ".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "reason is mandatory");

    let issue = state
        .lifecycle
        .reject(
            issue.id,
            RejectRequest {
                actor: "dispatcher-1".into(),
                reason: "Duplicate of offline ticket".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(issue.status, IssueStatus::Rejected);

    let issue = state
        .lifecycle
        .reopen(
            issue.id,
            ReopenRequest {
                actor: "supervisor-1".into(),
                reason: "Rejected in error".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(issue.status, IssueStatus::Pending);

    let history = issue_history::list_for_issue(&state.pool, issue.id)
        .await
        .unwrap();
    assert_eq!(
        history.last().unwrap().remarks.as_deref(),
        Some("Issue reopened: Rejected in error")
    );
}

#[tokio::test]
async fn reopening_a_resolved_issue_clears_resolved_at() {
    let (state, ward) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    seed_engineer(&state, "eng-01", Some(ward.id)).await;

    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;
    state
        .lifecycle
        .assign(
            issue.id,
            AssignRequest {
                actor: "d".into(),
                assignee_id: "eng-01".into(),
            },
        )
        .await
        .unwrap();
    state
        .lifecycle
        .accept(issue.id, accept_req("eng-01"))
        .await
        .unwrap();
    let resolved = state
        .lifecycle
        .resolve(
            issue.id,
            ResolveRequest {
                actor: "eng-01".into(),
                notes: "patched".into(),
                evidence_ref: "img/1.jpg".into(),
            },
        )
        .await
        .unwrap();
    assert!(resolved.resolved_at.is_some());

    let reopened = state
        .lifecycle
        .reopen(
            issue.id,
            ReopenRequest {
                actor: "citizen-7".into(),
                reason: "Pothole reappeared after rain".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(reopened.status, IssueStatus::InProgress);
    assert!(reopened.resolved_at.is_none());
    assert_eq!(
        reopened.assignee_id.as_deref(),
        Some("eng-01"),
        "previous assignee keeps a reopened issue"
    );
}

#[tokio::test]
async fn escalation_is_audited_and_only_raises() {
    let (state, _) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;
    assert_eq!(issue.priority, PriorityTier::High);

    let err = state
        .lifecycle
        .escalate(
            issue.id,
            EscalateRequest {
                actor: "supervisor-1".into(),
                tier: PriorityTier::Low,
                reason: "nope".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    let escalated = state
        .lifecycle
        .escalate(
            issue.id,
            EscalateRequest {
                actor: "supervisor-1".into(),
                tier: PriorityTier::Critical,
                reason: "School route".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(escalated.priority, PriorityTier::Critical);
    assert_eq!(escalated.status, IssueStatus::Pending, "status untouched");

    let history = issue_history::list_for_issue(&state.pool, issue.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[1].remarks.as_deref(),
        Some("Escalated to critical: School route")
    );
}

#[tokio::test]
async fn sla_breach_detection() {
    let (state, _) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    let now = now_millis();

    let fresh = submit_pending(&state, "k-fresh", 22.26, 73.12).await;

    // Critical target is 120 minutes; plant one three-hour-old issue directly
    let mut aged = fresh.clone();
    aged.id += 1;
    aged.idempotency_key = "k-aged".into();
    aged.issue_number = "VMC-20250101-0001".into();
    aged.priority = PriorityTier::Critical;
    aged.submitted_at = now - 3 * 60 * 60 * 1000;
    issue::insert_with_history(&state.pool, &aged, "Issue submitted")
        .await
        .unwrap();

    let breaches = state.lifecycle.breach_candidates().await.unwrap();
    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].id, aged.id);

    assert!(state.lifecycle.detail(aged.id).await.unwrap().sla_breached);
    assert!(!state.lifecycle.detail(fresh.id).await.unwrap().sla_breached);
}

#[tokio::test]
async fn settled_issues_never_breach_even_when_resolved_late() {
    let (state, _) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    let now = now_millis();

    let base = submit_pending(&state, "k-base", 22.26, 73.12).await;

    // Critical target is 120 minutes; this one took five hours to resolve
    let mut late = base.clone();
    late.id += 1;
    late.idempotency_key = "k-late".into();
    late.issue_number = "VMC-20250101-0002".into();
    late.priority = PriorityTier::Critical;
    late.status = IssueStatus::Resolved;
    late.submitted_at = now - 10 * 60 * 60 * 1000;
    late.resolved_at = Some(now - 5 * 60 * 60 * 1000);
    issue::insert_with_history(&state.pool, &late, "Issue submitted")
        .await
        .unwrap();

    let mut closed = late.clone();
    closed.id += 1;
    closed.idempotency_key = "k-closed".into();
    closed.issue_number = "VMC-20250101-0003".into();
    closed.status = IssueStatus::Closed;
    issue::insert_with_history(&state.pool, &closed, "Issue submitted")
        .await
        .unwrap();

    assert!(
        !state.lifecycle.detail(late.id).await.unwrap().sla_breached,
        "resolved issues are off the SLA clock"
    );
    assert!(!state.lifecycle.detail(closed.id).await.unwrap().sla_breached);

    let breaches = state.lifecycle.breach_candidates().await.unwrap();
    assert!(breaches.is_empty(), "got: {breaches:?}");
}

#[tokio::test]
async fn worklist_orders_by_priority_then_age() {
    let (state, ward) = test_state(StubClassifier::confident("pothole", 0.9)).await;
    seed_engineer(&state, "eng-01", Some(ward.id)).await;

    let low = submit_pending(&state, "k1", 22.26, 73.12).await;
    let high = submit_pending(&state, "k2", 22.31, 73.20).await;

    state
        .lifecycle
        .escalate(
            high.id,
            EscalateRequest {
                actor: "supervisor-1".into(),
                tier: PriorityTier::Critical,
                reason: "Arterial road".into(),
            },
        )
        .await
        .unwrap();

    for id in [low.id, high.id] {
        state
            .lifecycle
            .assign(
                id,
                AssignRequest {
                    actor: "d".into(),
                    assignee_id: "eng-01".into(),
                },
            )
            .await
            .unwrap();
    }

    let worklist = state.lifecycle.worklist("eng-01").await.unwrap();
    assert_eq!(worklist.len(), 2);
    assert_eq!(worklist[0].id, high.id, "critical issue comes first");
    assert_eq!(worklist[1].id, low.id);

    let err = state.lifecycle.worklist("nobody").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn noop_transition_is_reported_as_such() {
    let (state, _) = test_state(StubClassifier::confident("pothole", 0.9)).await;

    // Unassigning a pending issue would be pending -> pending
    let issue = submit_pending(&state, "k1", IN_WARD.0, IN_WARD.1).await;
    let err = state
        .lifecycle
        .unassign(
            issue.id,
            UnassignRequest {
                actor: "d".into(),
                remarks: None,
            },
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::NoOpTransition(IssueStatus::Pending)),
        "{err:?}"
    );

    let count = issue_history::count_for_issue(&state.pool, issue.id)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
