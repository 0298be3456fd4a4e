//! redb-backed durable outbox
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `pending` | `local_id` | `OutboxEntry` | Queue awaiting delivery |
//! | `dead_letter` | `local_id` | `DeadLetter` | Permanently failed entries |
//! | `counters` | name | `u64` | Monotonic capture sequence |
//!
//! Entries are written with `Durability::Immediate` semantics (redb default):
//! once `enqueue` returns, the capture survives power loss. Dead letters are
//! kept for operator inspection and never retried automatically.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::outbox::OutboxAction;
use shared::util::now_millis;

use crate::error::{OutboxError, OutboxResult};

/// Queue awaiting delivery: key = local_id, value = JSON OutboxEntry
const PENDING_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("pending");

/// Permanently failed entries: key = local_id, value = JSON DeadLetter
const DEAD_LETTER_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("dead_letter");

/// Named counters; holds the capture sequence
const COUNTER_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const SEQ_COUNTER: &str = "outbox_seq";

/// One queued action with its delivery bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Device-local key (UUID); never leaves the device
    pub local_id: String,
    /// Capture order, assigned by the outbox on enqueue. Millisecond
    /// timestamps tie under burst capture; this never does.
    pub seq: u64,
    pub action: OutboxAction,
    pub enqueued_at: i64,
    /// Transient failures so far
    pub retries: u32,
    /// Entry is skipped until this instant (backoff)
    pub next_attempt_at: i64,
    pub last_error: Option<String>,
}

impl OutboxEntry {
    pub fn new(action: OutboxAction) -> Self {
        let now = now_millis();
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
            action,
            enqueued_at: now,
            retries: 0,
            next_attempt_at: now,
            last_error: None,
        }
    }
}

/// A permanently failed entry, kept for inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub entry: OutboxEntry,
    pub failed_at: i64,
    pub reason: String,
}

#[derive(Clone)]
pub struct Outbox {
    db: Arc<Database>,
}

impl Outbox {
    /// Open or create the outbox database at the given path
    pub fn open(path: impl AsRef<Path>) -> OutboxResult<Self> {
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PENDING_TABLE)?;
            let _ = write_txn.open_table(DEAD_LETTER_TABLE)?;
            let _ = write_txn.open_table(COUNTER_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Append one entry; durable once this returns. The stored copy carries
    /// the capture sequence, taken from the counter in the same transaction.
    pub fn enqueue(&self, entry: &OutboxEntry) -> OutboxResult<OutboxEntry> {
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut counters = write_txn.open_table(COUNTER_TABLE)?;
            let seq = counters.get(SEQ_COUNTER)?.map(|g| g.value()).unwrap_or(0) + 1;
            counters.insert(SEQ_COUNTER, seq)?;

            let mut stored = entry.clone();
            stored.seq = seq;
            let bytes = serde_json::to_vec(&stored)?;
            let mut table = write_txn.open_table(PENDING_TABLE)?;
            table.insert(stored.local_id.as_str(), bytes.as_slice())?;
            stored
        };
        write_txn.commit()?;
        Ok(stored)
    }

    /// All pending entries, oldest capture first
    pub fn pending(&self) -> OutboxResult<Vec<OutboxEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_TABLE)?;
        let mut entries = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            entries.push(serde_json::from_slice::<OutboxEntry>(value.value())?);
        }
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    pub fn pending_count(&self) -> OutboxResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_TABLE)?;
        Ok(table.len()?)
    }

    /// Remove a delivered entry
    pub fn remove(&self, local_id: &str) -> OutboxResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING_TABLE)?;
            table.remove(local_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Record a transient failure: bump the retry count, stash the error,
    /// and push the next attempt out to `next_attempt_at`
    pub fn record_failure(
        &self,
        local_id: &str,
        error: &str,
        next_attempt_at: i64,
    ) -> OutboxResult<OutboxEntry> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(PENDING_TABLE)?;
            let mut entry = match table.get(local_id)? {
                Some(guard) => serde_json::from_slice::<OutboxEntry>(guard.value())?,
                None => return Err(OutboxError::EntryNotFound(local_id.to_string())),
            };
            entry.retries += 1;
            entry.last_error = Some(error.to_string());
            entry.next_attempt_at = next_attempt_at;
            let bytes = serde_json::to_vec(&entry)?;
            table.insert(local_id, bytes.as_slice())?;
            entry
        };
        write_txn.commit()?;
        Ok(updated)
    }

    /// Move an entry out of the queue into the dead-letter table, atomically
    pub fn dead_letter(&self, local_id: &str, reason: &str) -> OutboxResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut pending = write_txn.open_table(PENDING_TABLE)?;
            let entry = match pending.remove(local_id)? {
                Some(guard) => serde_json::from_slice::<OutboxEntry>(guard.value())?,
                None => return Err(OutboxError::EntryNotFound(local_id.to_string())),
            };
            let letter = DeadLetter {
                entry,
                failed_at: now_millis(),
                reason: reason.to_string(),
            };
            let bytes = serde_json::to_vec(&letter)?;
            let mut dead = write_txn.open_table(DEAD_LETTER_TABLE)?;
            dead.insert(local_id, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All dead letters, most recent failure first
    pub fn dead_letters(&self) -> OutboxResult<Vec<DeadLetter>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEAD_LETTER_TABLE)?;
        let mut letters = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            letters.push(serde_json::from_slice::<DeadLetter>(value.value())?);
        }
        letters.sort_by_key(|l| std::cmp::Reverse(l.failed_at));
        Ok(letters)
    }
}
