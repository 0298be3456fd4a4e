//! Civic Intake Server
//!
//! Edge service for municipal issue reporting: accepts citizen submissions,
//! resolves them to administrative zones, scores priority, deduplicates
//! against recent open reports, and drives the issue lifecycle to closure.
//!
//! # Module structure
//!
//! ```text
//! intake-server/src/
//! ├── core/       # config, state, server, errors, logging
//! ├── db/         # SQLite pool, migrations, repositories
//! ├── services/   # spatial index, scorer, dedup, classifier, pipeline,
//! │               # lifecycle engine
//! └── api/        # HTTP routes and handlers
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod services;

pub use crate::core::logger::{init_logger, init_logger_with_file};
pub use crate::core::{AppError, AppResult, Config, Server, ServerState};
pub use db::DbService;

/// Load `.env` before anything reads the environment
pub fn setup_environment() {
    dotenv::dotenv().ok();
}
