//! Shared types for the civic issue intake platform
//!
//! Common types used across the server and the field client: issue domain
//! enums, wire models, request/response payloads, the outbox action union,
//! and utility helpers.

pub mod error;
pub mod models;
pub mod outbox;
pub mod request;
pub mod response;
pub mod types;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{Assignee, AssigneeLoad, Issue, IssueHistoryEntry, Zone};
pub use outbox::OutboxAction;
pub use response::{AppResponse, SubmitOutcome};
pub use types::{Coordinates, IssueKind, IssueStatus, PriorityTier};
