//! AI Classifier client
//!
//! Thin HTTP client for the image classification service. The pipeline
//! treats the classifier as advisory: any failure here falls back to the
//! reporter-declared kind with zero confidence, so errors are reported but
//! never block intake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Classifier verdict for one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image_ref: &str) -> AppResult<Classification>;
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    image_ref: &'a str,
}

pub struct HttpClassifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClassifier {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image_ref: &str) -> AppResult<Classification> {
        let url = format!("{}/classify", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ClassifyRequest { image_ref })
            .send()
            .await
            .map_err(|e| AppError::ClassifierUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ClassifierUnavailable(format!(
                "classifier returned {}",
                response.status()
            )));
        }

        let verdict: Classification = response
            .json()
            .await
            .map_err(|e| AppError::ClassifierUnavailable(format!("bad classifier payload: {e}")))?;

        if !verdict.confidence.is_finite() || !(0.0..=1.0).contains(&verdict.confidence) {
            return Err(AppError::ClassifierUnavailable(format!(
                "confidence {} out of range",
                verdict.confidence
            )));
        }
        Ok(verdict)
    }
}
