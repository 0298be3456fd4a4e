//! Server state - shared handles to every service
//!
//! `ServerState` is cloned into each request handler. All fields are either
//! `Arc`s or cheap-to-clone pool handles.
//!
//! | Field | Type | Purpose |
//! |-------|------|---------|
//! | config | Config | immutable configuration |
//! | pool | SqlitePool | SQLite connection pool |
//! | spatial | Arc<SpatialIndex> | coordinate-to-zone resolution |
//! | intake | Arc<IntakePipeline> | submission processing |
//! | lifecycle | Arc<LifecycleEngine> | status state machine |

use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::DbService;
use crate::services::{
    Classifier, DuplicateDetector, HttpClassifier, IntakePipeline, LifecycleEngine, SpatialIndex,
};
use crate::services::scorer::PriorityScorer;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub spatial: Arc<SpatialIndex>,
    pub intake: Arc<IntakePipeline>,
    pub lifecycle: Arc<LifecycleEngine>,
}

impl ServerState {
    /// Initialize the full state: work directory, database, services
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)
            .with_context(|| format!("Failed to create work dir {}", config.work_dir))?;

        let db_path = config.database_path();
        let db = DbService::new(&db_path.to_string_lossy())
            .await
            .context("Failed to initialize database")?;

        let classifier: Arc<dyn Classifier> =
            Arc::new(HttpClassifier::new(&config.classifier_url, config.classifier_timeout_ms)?);

        Ok(Self::assemble(config.clone(), db.pool, classifier))
    }

    /// Build state over an existing pool with an injected classifier
    /// (integration tests use an in-memory pool and a stub classifier)
    pub fn assemble(config: Config, pool: SqlitePool, classifier: Arc<dyn Classifier>) -> Self {
        let spatial = Arc::new(SpatialIndex::new(pool.clone(), config.zone_cache_ttl_secs));
        let scorer = PriorityScorer::new(config.peak_windows);
        let dedup = DuplicateDetector::new(pool.clone(), config.dedup);
        let intake = Arc::new(IntakePipeline::new(
            pool.clone(),
            spatial.clone(),
            classifier,
            dedup,
            scorer,
        ));
        let lifecycle = Arc::new(LifecycleEngine::new(pool.clone(), config.sla));

        Self {
            config,
            pool,
            spatial,
            intake,
            lifecycle,
        }
    }
}
