//! Intake Pipeline
//!
//! Turns a raw submission into a persisted issue, in fixed order: validate,
//! resolve zone, classify, detect duplicates, score, persist. Two safeguards
//! make retried submissions safe:
//!
//! 1. a fast-path lookup on the idempotency key before any work
//! 2. the UNIQUE index on `idempotency_key` as the authoritative boundary;
//!    a unique-violation on insert means a concurrent retry won, and the
//!    winner's issue is returned instead

use std::sync::Arc;

use chrono::Timelike;
use shared::models::Issue;
use shared::request::SubmitIssueRequest;
use shared::response::SubmitOutcome;
use shared::types::Coordinates;
use shared::util::{issue_number, now_millis, snowflake_id};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::core::error::{AppError, AppResult};
use crate::db::repository::{RepoError, issue};
use crate::services::classifier::Classifier;
use crate::services::dedup::DuplicateDetector;
use crate::services::scorer::{PriorityScorer, ScoreInput};
use crate::services::spatial::SpatialIndex;

pub struct IntakePipeline {
    pool: SqlitePool,
    spatial: Arc<SpatialIndex>,
    classifier: Arc<dyn Classifier>,
    dedup: DuplicateDetector,
    scorer: PriorityScorer,
}

impl IntakePipeline {
    pub fn new(
        pool: SqlitePool,
        spatial: Arc<SpatialIndex>,
        classifier: Arc<dyn Classifier>,
        dedup: DuplicateDetector,
        scorer: PriorityScorer,
    ) -> Self {
        Self {
            pool,
            spatial,
            classifier,
            dedup,
            scorer,
        }
    }

    /// Process one submission end to end
    pub async fn submit(&self, req: SubmitIssueRequest) -> AppResult<SubmitOutcome> {
        validate(&req)?;

        // Replay fast path: the same capture retried after a network failure
        if let Some(existing) = issue::find_by_idempotency_key(&self.pool, &req.idempotency_key).await? {
            info!(issue_id = existing.id, key = %req.idempotency_key, "Replayed submission, returning existing issue");
            return Ok(SubmitOutcome::Created { issue: existing });
        }

        let point = Coordinates::new(req.latitude, req.longitude);
        let zone = self.spatial.resolve(point).await?;

        // 分类失败不阻断受理
        let (ai_label, ai_confidence) = match self.classifier.classify(&req.image_ref).await {
            Ok(verdict) => (verdict.label, verdict.confidence),
            Err(e) => {
                warn!(error = %e, kind = %req.kind, "Classifier unavailable, using reporter-declared kind");
                (req.kind.as_str().to_string(), 0.0)
            }
        };

        let now = now_millis();

        let duplicates = self.dedup.find_duplicates(req.kind, point, now).await?;
        if let Some(existing) = duplicates.into_iter().next() {
            info!(
                issue_id = existing.id,
                issue_number = %existing.issue_number,
                "Submission matches an existing open report"
            );
            return Ok(SubmitOutcome::Duplicate { existing });
        }

        let nearby_similar = self.dedup.count_similar(req.kind, point, now).await?;
        let hour = chrono::Local::now().hour() as u8;
        let priority = self.scorer.tier(ScoreInput {
            kind: req.kind,
            ai_confidence,
            zone_importance: zone.importance,
            hour,
            nearby_similar,
        });

        let issue = Issue {
            id: snowflake_id(),
            issue_number: issue_number(now),
            idempotency_key: req.idempotency_key.clone(),
            latitude: req.latitude,
            longitude: req.longitude,
            zone_id: zone.id,
            kind: req.kind,
            department: req.kind.department().to_string(),
            ai_label: Some(ai_label),
            ai_confidence: Some(ai_confidence),
            priority,
            status: shared::types::IssueStatus::Pending,
            description: req.description.clone(),
            image_ref: req.image_ref.clone(),
            reporter_id: req.reporter_id.clone(),
            assignee_id: None,
            submitted_at: now,
            updated_at: now,
            resolved_at: None,
        };

        match issue::insert_with_history(&self.pool, &issue, "Issue submitted").await {
            Ok(()) => {
                info!(
                    issue_id = issue.id,
                    issue_number = %issue.issue_number,
                    zone_id = zone.id,
                    priority = %issue.priority,
                    "Issue created"
                );
                Ok(SubmitOutcome::Created { issue })
            }
            // 并发重试输掉了唯一索引竞争, 返回胜者
            Err(RepoError::Duplicate(_)) => {
                let existing = issue::find_by_idempotency_key(&self.pool, &req.idempotency_key)
                    .await?
                    .ok_or_else(|| {
                        AppError::internal("Idempotency key vanished after unique violation")
                    })?;
                info!(issue_id = existing.id, "Lost idempotency race, returning winner");
                Ok(SubmitOutcome::Created { issue: existing })
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn validate(req: &SubmitIssueRequest) -> AppResult<()> {
    if req.idempotency_key.trim().is_empty() {
        return Err(AppError::validation("idempotency_key is required"));
    }
    if req.image_ref.trim().is_empty() {
        return Err(AppError::validation("image_ref is required"));
    }
    if req.reporter_id.trim().is_empty() {
        return Err(AppError::validation("reporter_id is required"));
    }
    Coordinates::new(req.latitude, req.longitude).validate()?;
    Ok(())
}
