//! SQLite document backend
//!
//! Layout:
//! - `collections(name, writers, created_at)` - one row per collection, `writers` is a JSON array
//! - `documents(collection, id, body, updated_at)` - one row per document, `body` is the JSON value
//!
//! rusqlite is synchronous, so every call runs on tokio's blocking pool against a
//! single shared connection.

use super::{AccessPolicy, BackendError, DocumentBackend, DocumentCollection, StoredDocument};
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

type SharedConn = Arc<Mutex<Option<Connection>>>;

pub struct SqliteBackend {
    conn: SharedConn,
}

impl SqliteBackend {
    /// Open (or create) the database file and its schema
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let db_path = db_path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BackendError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create database directory {}: {}", parent.display(), e),
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        apply_optimized_pragmas(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                writers TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            );",
        )?;

        log::info!("✅ SQLite document backend initialized: {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }
}

/// Run `f` against the shared connection on the blocking pool
async fn with_conn<T, F>(conn: &SharedConn, f: F) -> Result<T, BackendError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, BackendError> + Send + 'static,
{
    let conn = conn.clone();
    tokio::task::spawn_blocking(move || {
        let guard = conn
            .lock()
            .map_err(|_| BackendError::Database("connection mutex poisoned".to_string()))?;
        match guard.as_ref() {
            Some(c) => f(c),
            None => Err(BackendError::Unavailable("backend is closed".to_string())),
        }
    })
    .await
    .map_err(|e| BackendError::Unavailable(format!("blocking task failed: {}", e)))?
}

#[async_trait]
impl DocumentBackend for SqliteBackend {
    async fn open_collection(
        &self,
        name: &str,
        policy: AccessPolicy,
        identity: &str,
    ) -> Result<Arc<dyn DocumentCollection>, BackendError> {
        let collection = name.to_string();
        let stored_policy = with_conn(&self.conn, move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT writers FROM collections WHERE name = ?1",
                    params![collection],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(writers) => Ok(AccessPolicy {
                    writers: serde_json::from_str(&writers)?,
                }),
                None => {
                    conn.execute(
                        "INSERT INTO collections (name, writers, created_at) VALUES (?1, ?2, ?3)",
                        params![
                            collection,
                            serde_json::to_string(&policy.writers)?,
                            chrono::Utc::now().timestamp()
                        ],
                    )?;
                    log::info!("🆕 Created collection '{}'", collection);
                    Ok(policy)
                }
            }
        })
        .await?;

        if !stored_policy.can_write(identity) {
            log::warn!(
                "⚠️  Identity '{}' is not a writer of collection '{}' (writers: {:?})",
                identity,
                name,
                stored_policy.writers
            );
        }

        Ok(Arc::new(SqliteCollection {
            conn: self.conn.clone(),
            name: name.to_string(),
            identity: identity.to_string(),
            policy: stored_policy,
        }))
    }

    async fn close(&self) -> Result<(), BackendError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| BackendError::Database("connection mutex poisoned".to_string()))?;
            let Some(c) = guard.take() else {
                return Ok(());
            };
            // Fold the WAL back into the main file before closing
            c.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
            c.close().map_err(|(_, e)| BackendError::from(e))?;
            log::info!("✅ SQLite document backend closed");
            Ok(())
        })
        .await
        .map_err(|e| BackendError::Unavailable(format!("blocking task failed: {}", e)))?
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

struct SqliteCollection {
    conn: SharedConn,
    name: String,
    identity: String,
    policy: AccessPolicy,
}

#[async_trait]
impl DocumentCollection for SqliteCollection {
    async fn get(&self, id: &str) -> Result<Option<Value>, BackendError> {
        let collection = self.name.clone();
        let id = id.to_string();
        with_conn(&self.conn, move |conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| serde_json::from_str(&b).map_err(BackendError::from))
                .transpose()
        })
        .await
    }

    async fn put(&self, id: &str, value: Value) -> Result<(), BackendError> {
        if !self.policy.can_write(&self.identity) {
            return Err(BackendError::Unauthorized {
                identity: self.identity.clone(),
                collection: self.name.clone(),
            });
        }

        let collection = self.name.clone();
        let id = id.to_string();
        let body = serde_json::to_string(&value)?;
        with_conn(&self.conn, move |conn| {
            conn.execute(
                "INSERT INTO documents (collection, id, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET
                    body = excluded.body,
                    updated_at = excluded.updated_at",
                params![collection, id, body, chrono::Utc::now().timestamp()],
            )?;
            Ok(())
        })
        .await
    }

    async fn all(&self) -> Result<Vec<StoredDocument>, BackendError> {
        let collection = self.name.clone();
        with_conn(&self.conn, move |conn| {
            let mut stmt =
                conn.prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")?;
            let rows = stmt.query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut docs = Vec::new();
            for row in rows {
                let (id, body) = row?;
                docs.push(StoredDocument {
                    id,
                    value: serde_json::from_str(&body)?,
                });
            }
            Ok(docs)
        })
        .await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("docs.db")).unwrap();
        let coll = backend
            .open_collection("nameops", AccessPolicy::single_writer("me"), "me")
            .await
            .unwrap();

        assert!(coll.get("a").await.unwrap().is_none());

        coll.put("a", json!({"v": 1})).await.unwrap();
        coll.put("a", json!({"v": 2})).await.unwrap();

        assert_eq!(coll.get("a").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(coll.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("docs.db")).unwrap();
        let policy = AccessPolicy::single_writer("me");
        let a = backend.open_collection("a", policy.clone(), "me").await.unwrap();
        let b = backend.open_collection("b", policy, "me").await.unwrap();

        a.put("doc", json!(1)).await.unwrap();

        assert!(b.get("doc").await.unwrap().is_none());
        assert!(b.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_existing_policy_rejects_other_writer() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("docs.db")).unwrap();
        backend
            .open_collection("nameops", AccessPolicy::single_writer("owner"), "owner")
            .await
            .unwrap();

        // Second identity asks for its own policy; the stored one wins
        let intruder = backend
            .open_collection("nameops", AccessPolicy::single_writer("intruder"), "intruder")
            .await
            .unwrap();

        let err = intruder.put("x", json!({})).await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("docs.db");

        {
            let backend = SqliteBackend::new(&path).unwrap();
            let coll = backend
                .open_collection("nameops", AccessPolicy::single_writer("me"), "me")
                .await
                .unwrap();
            coll.put("day-1", json!({"n": 3})).await.unwrap();
            backend.close().await.unwrap();
        }

        let backend = SqliteBackend::new(&path).unwrap();
        let coll = backend
            .open_collection("nameops", AccessPolicy::single_writer("me"), "me")
            .await
            .unwrap();
        assert_eq!(coll.get("day-1").await.unwrap(), Some(json!({"n": 3})));
    }

    #[tokio::test]
    async fn test_calls_after_close_are_unavailable() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("docs.db")).unwrap();
        let coll = backend
            .open_collection("nameops", AccessPolicy::single_writer("me"), "me")
            .await
            .unwrap();

        backend.close().await.unwrap();
        // Closing twice is a no-op
        backend.close().await.unwrap();

        let err = coll.all().await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
