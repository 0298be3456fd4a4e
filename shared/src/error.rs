//! Stable error codes shared between server responses and client handling
//!
//! The server's `AppError` maps onto these codes in its response envelope;
//! the field client uses them to decide whether a failed delivery is worth
//! retrying (transport/5xx) or terminal (logical rejection).

pub mod codes {
    /// Success
    pub const SUCCESS: &str = "E0000";

    // ========== Input errors (terminal, never retried) ==========
    /// Malformed input
    pub const VALIDATION: &str = "E1001";
    /// Coordinates outside global lat/lon bounds
    pub const INVALID_COORDINATES: &str = "E1002";
    /// No zone resolvable for the coordinates
    pub const OUTSIDE_SERVICE_AREA: &str = "E1003";
    /// Resource not found
    pub const NOT_FOUND: &str = "E1004";

    // ========== Workflow errors (terminal) ==========
    /// Requested edge is not in the transition table
    pub const INVALID_TRANSITION: &str = "E2001";
    /// Requested status equals the current status
    pub const NO_OP_TRANSITION: &str = "E2002";
    /// No eligible assignee; issue stays pending
    pub const NO_ASSIGNEE_AVAILABLE: &str = "E2003";
    /// Lost a concurrent transition race
    pub const CONFLICT: &str = "E2004";

    // ========== System errors (retryable) ==========
    /// Internal server error
    pub const INTERNAL: &str = "E9001";
    /// Database failure
    pub const DATABASE: &str = "E9002";
    /// Classifier unreachable (logged server-side, submissions degrade
    /// instead of surfacing this)
    pub const CLASSIFIER_UNAVAILABLE: &str = "E9003";

    /// Whether a delivery that failed with this code may succeed on retry
    pub fn is_retryable(code: &str) -> bool {
        matches!(code, INTERNAL | DATABASE | CLASSIFIER_UNAVAILABLE)
    }
}
