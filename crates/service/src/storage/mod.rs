//! Storage abstractions for the service layer
//!
//! A `Store` is a hierarchical key-value database addressed by
//! `collection/key`. Records are flat JSON maps.

pub mod push_id;
pub mod memory;
pub mod json_file;
pub mod firebase;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use configs::{StoreBackend, StoreConfig};
use models::coffee::Record;
use tracing::info;

use crate::errors::ServiceError;

#[async_trait]
pub trait Store: Send + Sync {
    /// A new unique key for a child of any collection.
    fn generate_key(&self) -> String;

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Record>, ServiceError>;

    /// Set the whole record at `collection/key`, replacing anything there.
    async fn put(&self, collection: &str, key: &str, record: Record) -> Result<(), ServiceError>;

    /// Write only the fields in `partial`; other stored fields are kept.
    async fn merge(&self, collection: &str, key: &str, partial: Record) -> Result<(), ServiceError>;

    /// Every record of the collection as `(key, record)`, in key order.
    async fn list_all(&self, collection: &str) -> Result<Vec<(String, Record)>, ServiceError>;
}

/// Characters Firebase forbids in a key; they would also address a different path.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 768
        && !key.chars().any(|c| matches!(c, '.' | '#' | '$' | '[' | ']' | '/') || c.is_control())
}

/// Open the backend selected in the configuration.
pub async fn open(cfg: &StoreConfig) -> Result<Arc<dyn Store>, ServiceError> {
    let store: Arc<dyn Store> = match cfg.backend {
        StoreBackend::Memory => Arc::new(memory::MemoryStore::new()),
        StoreBackend::File => json_file::JsonFileStore::new(&cfg.data_file).await?,
        StoreBackend::Firebase => {
            let credentials = match &cfg.database_secret {
                Some(secret) => firebase::Credentials::DatabaseSecret(secret.clone()),
                None => firebase::Credentials::from_key_file(&cfg.credentials_path).await?,
            };
            Arc::new(firebase::FirebaseStore::new(
                &cfg.database_url,
                credentials,
                Duration::from_secs(cfg.request_timeout_secs),
            )?)
        }
    };
    info!(backend = ?cfg.backend, "store opened");
    Ok(store)
}
