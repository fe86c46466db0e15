//! # Name-operations indexer
//!
//! Periodically ingests batches of blockchain name operations and keeps a
//! deduplicated aggregate per calendar date.
//!
//! ```text
//! Scheduler ──tick──▶ Scanner::scan() ──▶ NameOpsStore::ingest(date, height, batch)
//!                                              │ merge + dedup by (nameId, nameValue)
//!                                              ▼
//!                                        DocumentBackend (SQLite / memory)
//!                                              ▲
//! caller ──▶ NameOpsStore::query(page, filter) ┘ full scan → sort DESC → slice
//! ```
//!
//! ## Module Organization
//!
//! - `model` - NameOp, DailyDocument, document ids
//! - `backend` - document backend trait + SQLite and in-memory implementations
//! - `store` - merge/dedup, paginated query, the store handle slot
//! - `scanner` - scanner trait + mock scanner
//! - `scheduler` - periodic scan → ingest loop
//! - `retry` - exponential backoff for scan/ingest retries
//! - `shutdown` - signal handling and teardown
//! - `config` - environment configuration

pub mod backend;
pub mod config;
pub mod model;
pub mod retry;
pub mod scanner;
pub mod scheduler;
pub mod shutdown;
pub mod sqlite_pragma;
pub mod store;

pub use backend::{DocumentBackend, MemoryBackend, SqliteBackend};
pub use config::{BackendType, RuntimeConfig};
pub use model::{DailyDocument, DocId, DocIdScheme, NameOp};
pub use scanner::{MockScanner, ScanBatch, ScanError, Scanner};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats};
pub use shutdown::ShutdownError;
pub use store::{NameOpFilter, NameOpsStore, PageRequest, StoreError, StoreOptions, StoreSlot};

use std::sync::Arc;

/// Build the backend selected by `config`
pub fn open_backend(config: &RuntimeConfig) -> Result<Arc<dyn DocumentBackend>, StoreError> {
    match config.backend {
        BackendType::Sqlite => SqliteBackend::new(&config.db_path)
            .map(|b| Arc::new(b) as Arc<dyn DocumentBackend>)
            .map_err(StoreError::Unavailable),
        BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}
