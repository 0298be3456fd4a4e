//! Duplicate Detector
//!
//! A submission duplicates an existing report when an open issue of the same
//! kind sits within `radius_m` and was submitted inside the trailing time
//! window. Closed and rejected issues never match: a re-report of a
//! previously rejected problem is a fresh signal.
//!
//! The same machinery, with the wider `similar_radius_m`, feeds the priority
//! scorer's clustering input.

use shared::models::Issue;
use shared::types::{Coordinates, IssueKind};
use sqlx::SqlitePool;
use tracing::debug;

use crate::core::config::DedupConfig;
use crate::core::error::AppResult;
use crate::db::repository::issue;

pub struct DuplicateDetector {
    pool: SqlitePool,
    config: DedupConfig,
}

impl DuplicateDetector {
    pub fn new(pool: SqlitePool, config: DedupConfig) -> Self {
        Self { pool, config }
    }

    /// Open same-kind issues within the duplicate radius and window, closest
    /// first (ties by earliest submission), capped at `max_results`.
    pub async fn find_duplicates(
        &self,
        kind: IssueKind,
        point: Coordinates,
        now_ms: i64,
    ) -> AppResult<Vec<Issue>> {
        let mut matches = self
            .candidates_within(kind, point, now_ms, self.config.radius_m)
            .await?;

        matches.sort_by(|(da, a), (db, b)| {
            da.total_cmp(db).then(a.submitted_at.cmp(&b.submitted_at))
        });
        matches.truncate(self.config.max_results);

        if !matches.is_empty() {
            debug!(
                kind = %kind,
                count = matches.len(),
                "Duplicate candidates found"
            );
        }
        Ok(matches.into_iter().map(|(_, i)| i).collect())
    }

    /// Count of open same-kind issues within the wider similarity radius
    /// (scorer clustering input)
    pub async fn count_similar(
        &self,
        kind: IssueKind,
        point: Coordinates,
        now_ms: i64,
    ) -> AppResult<usize> {
        let matches = self
            .candidates_within(kind, point, now_ms, self.config.similar_radius_m)
            .await?;
        Ok(matches.len())
    }

    async fn candidates_within(
        &self,
        kind: IssueKind,
        point: Coordinates,
        now_ms: i64,
        radius_m: f64,
    ) -> AppResult<Vec<(f64, Issue)>> {
        let from_ms = now_ms - self.config.window_minutes * 60_000;
        let candidates = issue::find_recent_same_kind(&self.pool, kind, from_ms, now_ms).await?;

        Ok(candidates
            .into_iter()
            .filter_map(|i| {
                let d = point.distance_meters(&i.coordinates());
                (d <= radius_m).then_some((d, i))
            })
            .collect())
    }
}
