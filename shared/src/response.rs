//! Response envelope and result payloads

use serde::{Deserialize, Serialize};

use crate::models::{Issue, IssueHistoryEntry};

/// Unified API response envelope
///
/// ```json
/// { "code": "E0000", "message": "Success", "data": { ... } }
/// ```
///
/// `E0000` means success; any other code identifies the error class
/// (see [`crate::error::codes`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> AppResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code == crate::error::codes::SUCCESS
    }
}

/// Outcome of a submission: either a new issue was created, or a recent
/// nearby report of the same kind already covers it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Created { issue: Issue },
    Duplicate { existing: Issue },
}

impl SubmitOutcome {
    pub fn issue(&self) -> &Issue {
        match self {
            SubmitOutcome::Created { issue } => issue,
            SubmitOutcome::Duplicate { existing } => existing,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, SubmitOutcome::Duplicate { .. })
    }
}

/// Issue with its audit trail and computed SLA flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDetail {
    pub issue: Issue,
    pub history: Vec<IssueHistoryEntry>,
    pub sla_breached: bool,
}

/// Paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}
