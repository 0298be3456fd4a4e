//! Civic Field Client
//!
//! Offline-first capture library for field devices. Reports are written to a
//! durable local outbox first and delivered to the intake server by a
//! background sync queue; the device keeps working with no connectivity and
//! drains the backlog when the network returns.
//!
//! # Module structure
//!
//! ```text
//! field-client/src/
//! ├── config.rs   # client configuration
//! ├── error.rs    # outbox and client errors
//! ├── outbox.rs   # redb-backed durable queue (pending + dead letter)
//! ├── http.rs     # Delivery trait and HTTP implementation
//! └── sync.rs     # retrying sync queue and background worker
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod outbox;
pub mod sync;

pub use config::{ClientConfig, SyncConfig};
pub use error::{ClientError, ClientResult, OutboxError};
pub use http::{Delivery, DeliveryError, HttpDelivery};
pub use outbox::{DeadLetter, Outbox, OutboxEntry};
pub use sync::{FlushReport, SyncQueue, SyncWorker};
