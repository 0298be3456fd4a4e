//! Core module - configuration, state, server and error definitions
//!
//! - [`Config`] - server configuration
//! - [`ServerState`] - shared service handles
//! - [`Server`] - HTTP server
//! - [`AppError`] / [`AppResult`] - unified error handling

pub mod config;
pub mod error;
pub mod logger;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::Server;
pub use state::ServerState;
