//! Delivery over HTTP
//!
//! Maps each outbox action to its intake-server endpoint and classifies the
//! outcome as success, transient failure (retry later) or terminal failure
//! (dead-letter). Classification keys off the stable error codes in the
//! response envelope; transport errors and 5xx with no envelope are
//! transient.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shared::error::codes;
use shared::outbox::OutboxAction;
use shared::response::AppResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Worth retrying: transport failure, 5xx, retryable error code
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// The server rejected the action; retrying cannot help
    #[error("Terminal delivery failure: {0}")]
    Terminal(String),
}

#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, action: &OutboxAction) -> Result<(), DeliveryError>;
}

pub struct HttpDelivery {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDelivery {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| DeliveryError::Terminal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn request(&self, action: &OutboxAction) -> reqwest::RequestBuilder {
        match action {
            OutboxAction::Create(req) => self
                .client
                .post(format!("{}/api/issues", self.base_url))
                .json(req),
            OutboxAction::Resolve {
                issue_id,
                actor,
                notes,
                evidence_ref,
            } => self
                .client
                .post(format!("{}/api/issues/{issue_id}/resolve", self.base_url))
                .json(&shared::request::ResolveRequest {
                    actor: actor.clone(),
                    notes: notes.clone(),
                    evidence_ref: evidence_ref.clone(),
                }),
            OutboxAction::Update {
                issue_id,
                actor,
                description,
            } => self
                .client
                .patch(format!("{}/api/issues/{issue_id}", self.base_url))
                .json(&shared::request::UpdateIssueRequest {
                    actor: actor.clone(),
                    description: description.clone(),
                }),
        }
    }
}

#[async_trait]
impl Delivery for HttpDelivery {
    async fn deliver(&self, action: &OutboxAction) -> Result<(), DeliveryError> {
        let response = self
            .request(action)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        classify(status, &body)
    }
}

/// Decide delivery outcome from the HTTP status and response envelope
fn classify(status: http::StatusCode, body: &str) -> Result<(), DeliveryError> {
    match serde_json::from_str::<AppResponse<Value>>(body) {
        Ok(envelope) => {
            if envelope.is_success() {
                return Ok(());
            }
            // A replayed resolve/update lands on an issue that already holds
            // the target status; the action took effect on a previous attempt
            if envelope.code == codes::NO_OP_TRANSITION {
                return Ok(());
            }
            let detail = format!("{}: {}", envelope.code, envelope.message);
            if codes::is_retryable(&envelope.code) {
                Err(DeliveryError::Transient(detail))
            } else {
                Err(DeliveryError::Terminal(detail))
            }
        }
        // No envelope: fall back to the HTTP status
        Err(_) if status.is_success() => Ok(()),
        Err(_) if status.is_server_error() => {
            Err(DeliveryError::Transient(format!("HTTP {status}")))
        }
        Err(_) => Err(DeliveryError::Terminal(format!("HTTP {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn success_envelope_is_ok() {
        let body = r#"{"code":"E0000","message":"Success","data":{"outcome":"created"}}"#;
        assert!(classify(StatusCode::OK, body).is_ok());
    }

    #[test]
    fn noop_transition_counts_as_already_applied() {
        let body = r#"{"code":"E2002","message":"Status is already resolved"}"#;
        assert!(classify(StatusCode::UNPROCESSABLE_ENTITY, body).is_ok());
    }

    #[test]
    fn retryable_code_is_transient() {
        let body = r#"{"code":"E9002","message":"Database error"}"#;
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, body),
            Err(DeliveryError::Transient(_))
        ));
    }

    #[test]
    fn validation_code_is_terminal() {
        let body = r#"{"code":"E1001","message":"Validation failed: image_ref is required"}"#;
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, body),
            Err(DeliveryError::Terminal(_))
        ));
    }

    #[test]
    fn envelope_free_responses_fall_back_to_status() {
        assert!(classify(StatusCode::OK, "").is_ok());
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            Err(DeliveryError::Transient(_))
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, "not found"),
            Err(DeliveryError::Terminal(_))
        ));
    }
}
