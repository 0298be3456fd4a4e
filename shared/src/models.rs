//! Wire and storage models

use serde::{Deserialize, Serialize};

use crate::types::{Coordinates, IssueKind, IssueStatus, PriorityTier};

/// The central work item produced by the intake pipeline
///
/// Created once by the server (never by the client); mutated only through
/// lifecycle transitions afterwards. Never hard-deleted: closed and rejected
/// issues are retained for audit and SLA reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Issue {
    /// Server-assigned durable ID (snowflake-style i64)
    pub id: i64,
    /// Human-facing reference, format `VMC-YYYYMMDD-XXXX`
    pub issue_number: String,
    /// Client-generated token that makes retried submissions safe;
    /// a UNIQUE index on this column is the idempotency boundary
    pub idempotency_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zone_id: i64,
    pub kind: IssueKind,
    /// Owning department, derived from `kind` at intake
    pub department: String,
    /// AI classifier output; None until classified, confidence 0.0 when the
    /// classifier was unavailable and the reporter-declared kind was used
    pub ai_label: Option<String>,
    pub ai_confidence: Option<f64>,
    pub priority: PriorityTier,
    pub status: IssueStatus,
    pub description: Option<String>,
    /// Opaque handle into the image store (not owned by this core)
    pub image_ref: String,
    pub reporter_id: String,
    pub assignee_id: Option<String>,
    /// Millisecond UTC timestamps
    pub submitted_at: i64,
    pub updated_at: i64,
    pub resolved_at: Option<i64>,
}

impl Issue {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Append-only audit record for one status transition
///
/// Written in the same transaction as the status update; immutable once
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct IssueHistoryEntry {
    pub id: i64,
    pub issue_id: i64,
    pub status: IssueStatus,
    pub actor: String,
    pub remarks: Option<String>,
    pub changed_at: i64,
}

/// Administrative zone (ward) used for geofencing and assignment routing
///
/// Read-mostly reference data. `boundary` is an optional polygon ring stored
/// as a JSON array of `[lat, lon]` pairs; when absent, zone resolution falls
/// back to nearest-centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Zone {
    pub id: i64,
    pub ward_number: i64,
    pub name: String,
    /// Importance weight on a 1-3 scale, feeds the priority formula
    pub importance: f64,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub boundary: Option<String>,
}

impl Zone {
    pub fn centroid(&self) -> Coordinates {
        Coordinates::new(self.centroid_lat, self.centroid_lon)
    }
}

/// Create zone payload (seeding / administration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneCreate {
    pub ward_number: i64,
    pub name: String,
    #[serde(default = "default_importance")]
    pub importance: f64,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    #[serde(default)]
    pub boundary: Option<String>,
}

fn default_importance() -> f64 {
    1.0
}

/// An eligible assignee (field engineer) from the assignment pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Assignee {
    pub id: String,
    pub name: String,
    /// None = capable of any zone
    pub zone_id: Option<i64>,
    pub active: bool,
}

/// Assignee with their current open-issue count, as read from the
/// assignment pool for one load-balanced assignment decision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AssigneeLoad {
    pub id: String,
    pub name: String,
    pub open_count: i64,
}
