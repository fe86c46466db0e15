//! Document backend abstraction
//!
//! The aggregation store only needs a small contract from its persistence layer:
//! open (or create) an access-controlled collection, point lookup, full-document
//! upsert and full-scan enumeration. Two implementations ship with the crate:
//!
//! - `SqliteBackend` - durable, WAL-mode SQLite file (production default)
//! - `MemoryBackend` - process-local maps (tests, dry runs)

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

#[derive(Debug)]
pub enum BackendError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
    /// The calling identity is not in the collection's writer list
    Unauthorized { identity: String, collection: String },
    /// Backend closed, timed out, or its worker could not run
    Unavailable(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err)
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        BackendError::Database(err.to_string())
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Io(e) => write!(f, "IO error: {}", e),
            BackendError::Serialization(e) => write!(f, "Serialization error: {}", e),
            BackendError::Database(e) => write!(f, "Database error: {}", e),
            BackendError::Unauthorized { identity, collection } => write!(
                f,
                "Identity '{}' is not allowed to write to collection '{}'",
                identity, collection
            ),
            BackendError::Unavailable(e) => write!(f, "Backend unavailable: {}", e),
        }
    }
}

impl std::error::Error for BackendError {}

/// Write access control for a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    pub writers: Vec<String>,
}

impl AccessPolicy {
    /// Only `identity` may write
    pub fn single_writer(identity: impl Into<String>) -> Self {
        Self {
            writers: vec![identity.into()],
        }
    }

    pub fn can_write(&self, identity: &str) -> bool {
        self.writers.iter().any(|w| w == "*" || w == identity)
    }
}

/// One entry of a full scan
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub value: Value,
}

/// Backend connection: hands out collections and owns the underlying resources
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Open `name`, creating it with `policy` if absent.
    ///
    /// An existing collection keeps the policy it was created with; the
    /// returned handle writes as `identity`.
    async fn open_collection(
        &self,
        name: &str,
        policy: AccessPolicy,
        identity: &str,
    ) -> Result<Arc<dyn DocumentCollection>, BackendError>;

    /// Release the connection. Later calls on any collection fail with `Unavailable`.
    async fn close(&self) -> Result<(), BackendError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Key/value-style document collection
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Value>, BackendError>;

    /// Full-document overwrite (upsert)
    async fn put(&self, id: &str, value: Value) -> Result<(), BackendError>;

    /// Every document in the collection, in no particular order
    async fn all(&self) -> Result<Vec<StoredDocument>, BackendError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_writer_policy() {
        let policy = AccessPolicy::single_writer("relay-a");
        assert!(policy.can_write("relay-a"));
        assert!(!policy.can_write("relay-b"));
    }

    #[test]
    fn test_wildcard_policy() {
        let policy = AccessPolicy {
            writers: vec!["*".to_string()],
        };
        assert!(policy.can_write("anyone"));
    }
}
