//! Outbox action union
//!
//! Closed set of actions the field client can capture offline. Each variant
//! has an explicit payload schema; the server endpoint for each is safe to
//! call more than once with the same idempotency key.

use serde::{Deserialize, Serialize};

use crate::request::SubmitIssueRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboxAction {
    /// Submit a new report; the idempotency key travels in the payload
    Create(SubmitIssueRequest),

    /// Mark a previously synced issue resolved
    Resolve {
        issue_id: i64,
        actor: String,
        notes: String,
        evidence_ref: String,
    },

    /// Edit the description of a previously synced issue
    Update {
        issue_id: i64,
        actor: String,
        description: String,
    },
}

impl OutboxAction {
    /// Short tag for logs and storage introspection
    pub fn kind_str(&self) -> &'static str {
        match self {
            OutboxAction::Create(_) => "create",
            OutboxAction::Resolve { .. } => "resolve",
            OutboxAction::Update { .. } => "update",
        }
    }
}
