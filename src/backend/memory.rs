//! In-memory document backend for tests and dry runs

use super::{AccessPolicy, BackendError, DocumentBackend, DocumentCollection, StoredDocument};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

struct CollectionState {
    policy: AccessPolicy,
    docs: BTreeMap<String, Value>,
}

#[derive(Default)]
pub struct MemoryBackend {
    collections: Arc<RwLock<HashMap<String, CollectionState>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn open_collection(
        &self,
        name: &str,
        policy: AccessPolicy,
        identity: &str,
    ) -> Result<Arc<dyn DocumentCollection>, BackendError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("backend is closed".to_string()));
        }

        let stored_policy = {
            let mut collections = self.collections.write().await;
            collections
                .entry(name.to_string())
                .or_insert_with(|| CollectionState {
                    policy,
                    docs: BTreeMap::new(),
                })
                .policy
                .clone()
        };

        Ok(Arc::new(MemoryCollection {
            collections: self.collections.clone(),
            closed: self.closed.clone(),
            name: name.to_string(),
            identity: identity.to_string(),
            policy: stored_policy,
        }))
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "Memory"
    }
}

struct MemoryCollection {
    collections: Arc<RwLock<HashMap<String, CollectionState>>>,
    closed: Arc<AtomicBool>,
    name: String,
    identity: String,
    policy: AccessPolicy,
}

impl MemoryCollection {
    fn ensure_open(&self) -> Result<(), BackendError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("backend is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn get(&self, id: &str) -> Result<Option<Value>, BackendError> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&self.name)
            .and_then(|c| c.docs.get(id))
            .cloned())
    }

    async fn put(&self, id: &str, value: Value) -> Result<(), BackendError> {
        self.ensure_open()?;
        if !self.policy.can_write(&self.identity) {
            return Err(BackendError::Unauthorized {
                identity: self.identity.clone(),
                collection: self.name.clone(),
            });
        }

        let mut collections = self.collections.write().await;
        let state = collections
            .entry(self.name.clone())
            .or_insert_with(|| CollectionState {
                policy: self.policy.clone(),
                docs: BTreeMap::new(),
            });
        state.docs.insert(id.to_string(), value);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<StoredDocument>, BackendError> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&self.name)
            .map(|c| {
                c.docs
                    .iter()
                    .map(|(id, value)| StoredDocument {
                        id: id.clone(),
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
