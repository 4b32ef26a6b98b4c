use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use models::coffee::Record;
use tokio::sync::RwLock;

use super::{push_id::PushIdGenerator, Store};
use crate::errors::ServiceError;

type Collection = BTreeMap<String, Record>;

/// In-process store for tests and local runs. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, Collection>>,
    keys: PushIdGenerator,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn generate_key(&self) -> String {
        self.keys.next_id()
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Record>, ServiceError> {
        let map = self.inner.read().await;
        Ok(map.get(collection).and_then(|c| c.get(key)).cloned())
    }

    async fn put(&self, collection: &str, key: &str, record: Record) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        map.entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), record);
        Ok(())
    }

    async fn merge(&self, collection: &str, key: &str, partial: Record) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        let record = map
            .entry(collection.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
        record.extend(partial);
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<(String, Record)>, ServiceError> {
        let map = self.inner.read().await;
        Ok(map
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
