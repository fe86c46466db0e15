//! Name-operations aggregation store
//!
//! Owns the day-sharded document layout on top of a `DocumentBackend`:
//!
//! ```text
//! ingest(date, height, batch)
//!     ↓ doc id = f(date[, height])
//! backend.get(doc id) → existing nameOps (absent ⇒ empty)
//!     ↓ existing ++ batch → dedup by (nameId, nameValue), newest blocktime wins
//! backend.put(doc id, full document)      (overwrite, never delta)
//!
//! query(page, filter)
//!     ↓ backend.all() → flatten → sort by blocktime DESC → filter → slice
//! ```
//!
//! Query cost is O(total name ops) per call; there is no maintained index.
//! A secondary index keyed on blocktime is the first thing to add if the corpus
//! outgrows a full scan.

pub mod merge;
pub mod query;

use crate::backend::{AccessPolicy, BackendError, DocumentBackend, DocumentCollection};
use crate::model::{DailyDocument, DocId, DocIdScheme, NameOp};
use crate::shutdown::ShutdownError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use merge::{dedup_name_ops, merge_name_ops};
pub use query::{paginate, NameOpFilter, PageRequest};

/// Predicate accepted by `NameOpsStore::query`
pub type NameOpPredicate<'a> = &'a (dyn Fn(&NameOp) -> bool + Send + Sync);

#[derive(Debug)]
pub enum StoreError {
    /// Backend could not be opened; no degraded mode exists without it
    Unavailable(BackendError),
    /// A get/put during ingest failed
    WriteFailed { doc_id: String, source: BackendError },
    /// The full scan behind a query or stats call failed
    ReadFailed(BackendError),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(e) => write!(f, "Store unavailable: {}", e),
            StoreError::WriteFailed { doc_id, source } => {
                write!(f, "Store write failed for {}: {}", doc_id, source)
            }
            StoreError::ReadFailed(e) => write!(f, "Store read failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Unavailable(e) | StoreError::ReadFailed(e) => Some(e),
            StoreError::WriteFailed { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Collection name in the backend
    pub name: String,
    /// Writer identity; new collections only accept writes from it
    pub identity: String,
    pub doc_id_scheme: DocIdScheme,
    /// Upper bound for every single backend call
    pub backend_timeout: Duration,
}

impl StoreOptions {
    pub fn new(name: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: identity.into(),
            doc_id_scheme: DocIdScheme::default(),
            backend_timeout: Duration::from_secs(5),
        }
    }
}

/// Corpus size as seen by one full scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub documents: usize,
    pub name_ops: usize,
}

pub struct NameOpsStore {
    backend: Arc<dyn DocumentBackend>,
    collection: Arc<dyn DocumentCollection>,
    options: StoreOptions,
    /// Per-document ingest locks; serializes read-modify-write on the same id
    doc_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl NameOpsStore {
    /// Open (or create) the collection, restricting writes to `options.identity`
    pub async fn open_or_create(
        backend: Arc<dyn DocumentBackend>,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        log::info!(
            "🔧 Opening store '{}' on {} backend (writer: {})",
            options.name,
            backend.backend_type(),
            options.identity
        );

        let open = backend.open_collection(
            &options.name,
            AccessPolicy::single_writer(options.identity.clone()),
            &options.identity,
        );
        let collection = bounded(options.backend_timeout, "open", open)
            .await
            .map_err(StoreError::Unavailable)?;

        log::info!("✅ Opened store: {}", collection.name());

        Ok(Self {
            backend,
            collection,
            options,
            doc_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        self.collection.name()
    }

    pub fn doc_id(&self, date: NaiveDate, height: u64) -> DocId {
        self.options.doc_id_scheme.doc_id(date, height)
    }

    /// Merge `batch` into the document for `(date[, height])` and return its id
    pub async fn ingest(
        &self,
        date: NaiveDate,
        height: u64,
        batch: Vec<NameOp>,
    ) -> Result<DocId, StoreError> {
        let doc_id = self.doc_id(date, height);
        let lock = self.doc_lock(&doc_id);
        let guard = lock.lock().await;
        let result = self.merge_into(&doc_id, date, height, batch).await;
        drop(guard);
        self.release_doc_lock(&doc_id, lock);

        result?;
        Ok(doc_id)
    }

    async fn merge_into(
        &self,
        doc_id: &DocId,
        date: NaiveDate,
        height: u64,
        batch: Vec<NameOp>,
    ) -> Result<(), StoreError> {
        let write_failed = |source: BackendError| StoreError::WriteFailed {
            doc_id: doc_id.to_string(),
            source,
        };

        let existing = self.read_document(doc_id).await.map_err(write_failed)?;
        let existing_ops = existing.map(|d| d.name_ops).unwrap_or_default();
        let (existing_count, incoming_count) = (existing_ops.len(), batch.len());

        let merged = merge_name_ops(existing_ops, batch);
        let merged_count = merged.len();

        let doc = DailyDocument {
            id: doc_id.to_string(),
            block_date: date,
            block_height: height,
            name_ops: merged,
        };
        let value = serde_json::to_value(&doc)
            .map_err(|e| write_failed(BackendError::Serialization(e)))?;

        bounded(
            self.options.backend_timeout,
            "put",
            self.collection.put(doc_id.as_str(), value),
        )
        .await
        .map_err(write_failed)?;

        log::debug!(
            "📝 {} updated: {} existing + {} incoming → {} merged (height {})",
            doc_id,
            existing_count,
            incoming_count,
            merged_count,
            height
        );

        Ok(())
    }

    /// Point lookup of one day document
    pub async fn document(&self, doc_id: &DocId) -> Result<Option<DailyDocument>, StoreError> {
        self.read_document(doc_id)
            .await
            .map_err(StoreError::ReadFailed)
    }

    /// Newest-first page of all name operations, optionally filtered
    pub async fn query(
        &self,
        page: PageRequest,
        filter: Option<NameOpPredicate<'_>>,
    ) -> Result<Vec<NameOp>, StoreError> {
        let docs = self.scan_documents().await?;
        let ops: Vec<NameOp> = docs.into_iter().flat_map(|d| d.name_ops).collect();
        Ok(paginate(ops, page, filter))
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let docs = self.scan_documents().await?;
        Ok(StoreStats {
            documents: docs.len(),
            name_ops: docs.iter().map(|d| d.name_ops.len()).sum(),
        })
    }

    /// Stop the backend connection
    pub async fn close(&self) -> Result<(), ShutdownError> {
        bounded(self.options.backend_timeout, "close", self.backend.close())
            .await
            .map_err(|e| ShutdownError::new("close store backend", e))?;
        log::info!("✅ Store '{}' closed", self.name());
        Ok(())
    }

    async fn read_document(&self, doc_id: &DocId) -> Result<Option<DailyDocument>, BackendError> {
        let value = bounded(
            self.options.backend_timeout,
            "get",
            self.collection.get(doc_id.as_str()),
        )
        .await?;

        value
            .map(|v| serde_json::from_value(v).map_err(BackendError::Serialization))
            .transpose()
    }

    async fn scan_documents(&self) -> Result<Vec<DailyDocument>, StoreError> {
        let stored = bounded(self.options.backend_timeout, "all", self.collection.all())
            .await
            .map_err(StoreError::ReadFailed)?;

        let mut docs = Vec::with_capacity(stored.len());
        for entry in stored {
            match serde_json::from_value::<DailyDocument>(entry.value) {
                Ok(doc) => docs.push(doc),
                Err(e) => log::warn!("⚠️  Skipping undecodable document {}: {}", entry.id, e),
            }
        }
        Ok(docs)
    }

    fn doc_lock(&self, doc_id: &DocId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.doc_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(doc_id.to_string()).or_default().clone()
    }

    /// Drop the map entry once no other ingest holds or waits on it
    fn release_doc_lock(&self, doc_id: &DocId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.doc_locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(doc_id.as_str());
        }
    }
}

/// Bound a backend call; expiry surfaces as `BackendError::Unavailable`
///
/// Expiry only stops waiting. A SQLite call already handed to `spawn_blocking`
/// still runs to completion, so a timed-out `put` may have committed. Re-running
/// the same ingest is safe since the merge is idempotent.
async fn bounded<T>(
    limit: Duration,
    op: &str,
    fut: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Unavailable(format!(
            "{} timed out after {}ms",
            op,
            limit.as_millis()
        ))),
    }
}

/// Holder for the process's single store handle
///
/// Built once at startup and passed to whoever needs the store. The first
/// `get_or_open` opens the backend collection; later calls return the same
/// handle. `shutdown` closes it and empties the slot.
#[derive(Default)]
pub struct StoreSlot {
    handle: tokio::sync::Mutex<Option<Arc<NameOpsStore>>>,
}

impl StoreSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_open(
        &self,
        backend: Arc<dyn DocumentBackend>,
        options: StoreOptions,
    ) -> Result<Arc<NameOpsStore>, StoreError> {
        let mut guard = self.handle.lock().await;
        if let Some(store) = guard.as_ref() {
            return Ok(store.clone());
        }

        let store = Arc::new(NameOpsStore::open_or_create(backend, options).await?);
        *guard = Some(store.clone());
        Ok(store)
    }

    /// Currently open handle, if any
    pub async fn get(&self) -> Option<Arc<NameOpsStore>> {
        self.handle.lock().await.clone()
    }

    /// Close the open handle (no-op when nothing is open)
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let store = self.handle.lock().await.take();
        match store {
            Some(store) => store.close().await,
            None => Ok(()),
        }
    }
}
