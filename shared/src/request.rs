//! Request payloads accepted by the intake server

use serde::{Deserialize, Serialize};

use crate::types::{IssueKind, IssueStatus, PriorityTier};

/// POST /api/issues - submit a new report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitIssueRequest {
    /// Generated by the client at capture time, before any network contact
    pub idempotency_key: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Reporter-declared issue type; also the classifier fallback
    pub kind: IssueKind,
    pub image_ref: String,
    pub reporter_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/issues/{id}/assign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub actor: String,
    pub assignee_id: String,
}

/// POST /api/issues/{id}/auto-assign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAssignRequest {
    pub actor: String,
}

/// POST /api/issues/{id}/accept - assignee starts working
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRequest {
    pub actor: String,
}

/// POST /api/issues/{id}/unassign - back to pending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignRequest {
    pub actor: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// POST /api/issues/{id}/resolve - requires notes and evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub actor: String,
    pub notes: String,
    pub evidence_ref: String,
}

/// POST /api/issues/{id}/close - verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseRequest {
    pub actor: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// POST /api/issues/{id}/reject - requires a reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub actor: String,
    pub reason: String,
}

/// POST /api/issues/{id}/reopen - requires a reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReopenRequest {
    pub actor: String,
    pub reason: String,
}

/// POST /api/issues/{id}/escalate - explicit, audited priority raise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalateRequest {
    pub actor: String,
    pub tier: PriorityTier,
    pub reason: String,
}

/// PATCH /api/issues/{id} - description edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    pub actor: String,
    pub description: String,
}

/// Query-string filters for listing issues
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFilter {
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
}

/// Pagination parameters, clamped server-side
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const MAX_LIMIT: u32 = 100;

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl Pagination {
    /// Clamp to sane bounds: page >= 1, 1 <= limit <= 100
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(self) -> i64 {
        let p = self.clamped();
        i64::from(p.page - 1) * i64::from(p.limit)
    }
}
