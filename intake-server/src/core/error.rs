//! Unified error handling
//!
//! Application error enum plus the JSON response envelope. Every error maps
//! to a stable code from [`shared::error::codes`]; the field client keys its
//! retry decision off these codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::error::codes;
use shared::response::AppResponse;
use shared::types::{CoordinateError, IssueStatus};
use tracing::error;

use crate::db::repository::RepoError;

/// Application error enum
///
/// | Class | Variants | Retry? |
/// |-------|----------|--------|
/// | Input | Validation, InvalidCoordinates, OutsideServiceArea, NotFound | never |
/// | Workflow | InvalidTransition, NoOpTransition, NoAssigneeAvailable, Conflict | never |
/// | System | Database, Internal, ClassifierUnavailable | client may retry |
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Input errors (4xx) ==========
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Location is outside the service area")]
    OutsideServiceArea,

    #[error("Resource not found: {0}")]
    NotFound(String),

    // ========== Workflow errors (4xx) ==========
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition {
        from: IssueStatus,
        to: IssueStatus,
    },

    #[error("Status is already {0}")]
    NoOpTransition(IssueStatus),

    #[error("No assignee available")]
    NoAssigneeAvailable,

    #[error("Conflict: {0}")]
    Conflict(String),

    // ========== System errors (5xx) ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Stable error code for the response envelope
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION,
            AppError::InvalidCoordinates(_) => codes::INVALID_COORDINATES,
            AppError::OutsideServiceArea => codes::OUTSIDE_SERVICE_AREA,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::InvalidTransition { .. } => codes::INVALID_TRANSITION,
            AppError::NoOpTransition(_) => codes::NO_OP_TRANSITION,
            AppError::NoAssigneeAvailable => codes::NO_ASSIGNEE_AVAILABLE,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Database(_) => codes::DATABASE,
            AppError::Internal(_) => codes::INTERNAL,
            AppError::ClassifierUnavailable(_) => codes::CLASSIFIER_UNAVAILABLE,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) | RepoError::Conflict(msg) => AppError::Conflict(msg),
            RepoError::Database(msg) => AppError::Database(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

impl From<CoordinateError> for AppError {
    fn from(err: CoordinateError) -> Self {
        AppError::InvalidCoordinates(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::InvalidCoordinates(_) => StatusCode::BAD_REQUEST,
            AppError::OutsideServiceArea => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } | AppError::NoOpTransition(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NoAssigneeAvailable => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => {
                error!(target: "database", error = %self, "Database error occurred");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(_) => {
                error!(target: "internal", error = %self, "Internal error occurred");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ClassifierUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        // 5xx 不暴露内部细节
        let message = match &self {
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(AppResponse::<()> {
            code: self.code().to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

/// Handler result type alias
pub type AppResult<T> = Result<T, AppError>;

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: codes::SUCCESS.to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: codes::SUCCESS.to_string(),
        message: message.into(),
        data: Some(data),
    })
}
