//! Client error types

use thiserror::Error;

/// Outbox storage errors (redb + serialization)
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),
}

pub type OutboxResult<T> = Result<T, OutboxError>;

/// Top-level client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Outbox(#[from] OutboxError),

    /// Another flush already holds the queue
    #[error("A flush is already in progress")]
    FlushInProgress,
}

pub type ClientResult<T> = Result<T, ClientError>;
