//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use intake_server::core::config::{Config, DedupConfig, SlaConfig};
use intake_server::db::repository::{assignee, zone};
use intake_server::services::{Classification, Classifier};
use intake_server::{AppError, AppResult, DbService, ServerState};
use shared::models::{Zone, ZoneCreate};
use shared::request::SubmitIssueRequest;
use shared::types::IssueKind;

/// A point inside the seeded test ward
pub const IN_WARD: (f64, f64) = (22.3072, 73.1812);

/// Classifier stub: fixed verdict or hard failure
pub struct StubClassifier {
    verdict: Option<Classification>,
}

impl StubClassifier {
    pub fn confident(label: &str, confidence: f64) -> Self {
        Self {
            verdict: Some(Classification {
                label: label.to_string(),
                confidence,
            }),
        }
    }

    pub fn offline() -> Self {
        Self { verdict: None }
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, _image_ref: &str) -> AppResult<Classification> {
        self.verdict
            .clone()
            .ok_or_else(|| AppError::ClassifierUnavailable("stub offline".into()))
    }
}

pub fn test_config() -> Config {
    Config {
        work_dir: ".".into(),
        http_port: 0,
        environment: "test".into(),
        classifier_url: "http://127.0.0.1:1".into(),
        classifier_timeout_ms: 100,
        dedup: DedupConfig::default(),
        sla: SlaConfig::default(),
        zone_cache_ttl_secs: 300,
        peak_windows: [(8, 10), (17, 20)],
    }
}

/// In-memory state with one bounded ward around [`IN_WARD`]
pub async fn test_state(classifier: StubClassifier) -> (ServerState, Zone) {
    let db = DbService::in_memory().await.unwrap();
    let state = ServerState::assemble(test_config(), db.pool, Arc::new(classifier));
    let ward = seed_ward(&state, 1, 1.0).await;
    (state, ward)
}

/// Square ward boundary containing [`IN_WARD`]
pub async fn seed_ward(state: &ServerState, ward_number: i64, importance: f64) -> Zone {
    let boundary = "[[22.25,73.10],[22.25,73.25],[22.35,73.25],[22.35,73.10],[22.25,73.10]]";
    let created = zone::create(
        &state.pool,
        ZoneCreate {
            ward_number,
            name: format!("Ward {ward_number}"),
            importance,
            centroid_lat: 22.3072,
            centroid_lon: 73.1812,
            boundary: Some(boundary.to_string()),
        },
    )
    .await
    .unwrap();
    state.spatial.invalidate().await;
    created
}

/// Ward with no boundary polygon, centered away from [`IN_WARD`]
pub async fn seed_unbounded_ward(state: &ServerState, ward_number: i64) -> Zone {
    let created = zone::create(
        &state.pool,
        ZoneCreate {
            ward_number,
            name: format!("Ward {ward_number}"),
            importance: 1.0,
            centroid_lat: 22.50,
            centroid_lon: 73.50,
            boundary: None,
        },
    )
    .await
    .unwrap();
    state.spatial.invalidate().await;
    created
}

pub async fn seed_engineer(state: &ServerState, id: &str, zone_id: Option<i64>) {
    assignee::create(&state.pool, id, &format!("Engineer {id}"), zone_id)
        .await
        .unwrap();
}

pub fn submission(key: &str, lat: f64, lon: f64, kind: IssueKind) -> SubmitIssueRequest {
    SubmitIssueRequest {
        idempotency_key: key.to_string(),
        latitude: lat,
        longitude: lon,
        kind,
        image_ref: format!("img/{key}.jpg"),
        reporter_id: "citizen-7".to_string(),
        description: None,
    }
}
