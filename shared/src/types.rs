//! Core domain enums and coordinate types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Issue lifecycle status
///
/// Transitions between statuses are enforced by the server's lifecycle
/// engine; the values here are the wire and storage representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum IssueStatus {
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Rejected,
}

impl IssueStatus {
    /// Open = still in the active workflow (duplicate detection and
    /// assignment only consider open issues)
    pub fn is_open(self) -> bool {
        !matches!(self, IssueStatus::Closed | IssueStatus::Rejected)
    }

    /// Statuses that stop the SLA clock
    pub fn stops_sla_clock(self) -> bool {
        matches!(self, IssueStatus::Resolved | IssueStatus::Closed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::Assigned => "assigned",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Closed => "closed",
            IssueStatus::Rejected => "rejected",
        }
    }

    pub const ALL: [IssueStatus; 6] = [
        IssueStatus::Pending,
        IssueStatus::Assigned,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
        IssueStatus::Closed,
        IssueStatus::Rejected,
    ];
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tier assigned at intake, changed afterwards only by an explicit
/// escalation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PriorityTier {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityTier {
    /// Numeric base score used by the priority formula (1-4)
    pub fn base_score(self) -> f64 {
        match self {
            PriorityTier::Low => 1.0,
            PriorityTier::Medium => 2.0,
            PriorityTier::High => 3.0,
            PriorityTier::Critical => 4.0,
        }
    }

    /// Map a real-valued score to a tier by the fixed thresholds:
    /// `>=4 critical, >=3 high, >=2 medium, else low`
    pub fn from_score(score: f64) -> Self {
        if score >= 4.0 {
            PriorityTier::Critical
        } else if score >= 3.0 {
            PriorityTier::High
        } else if score >= 2.0 {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTier::Low => "low",
            PriorityTier::Medium => "medium",
            PriorityTier::High => "high",
            PriorityTier::Critical => "critical",
        }
    }
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue type catalog
///
/// Each kind routes to an owning department and carries a default priority
/// tier used as the base of the scoring formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum IssueKind {
    Pothole,
    Garbage,
    Debris,
    StrayCattle,
    BrokenRoad,
    OpenManhole,
}

impl IssueKind {
    pub fn display_name(self) -> &'static str {
        match self {
            IssueKind::Pothole => "Pothole",
            IssueKind::Garbage => "Garbage Accumulation",
            IssueKind::Debris => "Debris",
            IssueKind::StrayCattle => "Stray Cattle",
            IssueKind::BrokenRoad => "Broken Road",
            IssueKind::OpenManhole => "Open Manhole",
        }
    }

    /// Owning municipal department
    pub fn department(self) -> &'static str {
        match self {
            IssueKind::Pothole | IssueKind::BrokenRoad => "Roads",
            IssueKind::Garbage | IssueKind::Debris => "Sanitation",
            IssueKind::StrayCattle => "AnimalControl",
            IssueKind::OpenManhole => "Drainage",
        }
    }

    /// Default priority tier for this kind (base of the scoring formula)
    pub fn default_tier(self) -> PriorityTier {
        match self {
            IssueKind::Pothole | IssueKind::BrokenRoad => PriorityTier::High,
            IssueKind::Garbage | IssueKind::Debris | IssueKind::StrayCattle => {
                PriorityTier::Medium
            }
            IssueKind::OpenManhole => PriorityTier::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::Pothole => "pothole",
            IssueKind::Garbage => "garbage",
            IssueKind::Debris => "debris",
            IssueKind::StrayCattle => "stray_cattle",
            IssueKind::BrokenRoad => "broken_road",
            IssueKind::OpenManhole => "open_manhole",
        }
    }

    pub const ALL: [IssueKind; 6] = [
        IssueKind::Pothole,
        IssueKind::Garbage,
        IssueKind::Debris,
        IssueKind::StrayCattle,
        IssueKind::BrokenRoad,
        IssueKind::OpenManhole,
    ];
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinate validation failure
#[derive(Debug, Error)]
pub enum CoordinateError {
    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),

    #[error("coordinate is not a finite number")]
    NotFinite,
}

/// A WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject non-finite values and anything outside global bounds
    pub fn validate(&self) -> Result<(), CoordinateError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoordinateError::Latitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoordinateError::Longitude(self.longitude));
        }
        Ok(())
    }

    /// Haversine distance in meters
    pub fn distance_meters(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }
}
