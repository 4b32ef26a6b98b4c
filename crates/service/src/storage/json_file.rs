use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use models::coffee::Record;
use tokio::{fs, sync::RwLock};
use tracing::debug;

use super::{push_id::PushIdGenerator, Store};
use crate::errors::ServiceError;

/// `collection -> key -> record`, the same tree shape the database exports.
type Tree = BTreeMap<String, BTreeMap<String, Record>>;

/// JSON file-backed store.
///
/// Keeps the whole tree in memory and rewrites the file after every mutation.
/// Intended for local development where a hosted database is overkill.
pub struct JsonFileStore {
    inner: RwLock<Tree>,
    file_path: PathBuf,
    keys: PushIdGenerator,
}

impl JsonFileStore {
    /// Initialize the store from a path. Creates the file with an empty tree if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        let tree: Tree = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Tree::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ServiceError::Store(format!("cannot parse {}: {e}", file_path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Tree::new();
                fs::write(&file_path, serde_json::to_vec(&empty).map_err(ServiceError::store)?)
                    .await
                    .map_err(ServiceError::store)?;
                empty
            }
            Err(e) => {
                return Err(ServiceError::Store(format!("cannot read {}: {e}", file_path.display())))
            }
        };

        Ok(Arc::new(Self { inner: RwLock::new(tree), file_path, keys: PushIdGenerator::new() }))
    }

    async fn save(&self, tree: &Tree) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(tree).map_err(ServiceError::store)?;
        fs::write(&self.file_path, data).await.map_err(ServiceError::store)?;
        debug!(path = %self.file_path.display(), "store file written");
        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    fn generate_key(&self) -> String {
        self.keys.next_id()
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Record>, ServiceError> {
        let tree = self.inner.read().await;
        Ok(tree.get(collection).and_then(|c| c.get(key)).cloned())
    }

    async fn put(&self, collection: &str, key: &str, record: Record) -> Result<(), ServiceError> {
        let mut tree = self.inner.write().await;
        let mut next = tree.clone();
        next.entry(collection.to_string()).or_default().insert(key.to_string(), record);
        // hold the write lock across the save so file order matches memory order
        self.save(&next).await?;
        *tree = next;
        Ok(())
    }

    async fn merge(&self, collection: &str, key: &str, partial: Record) -> Result<(), ServiceError> {
        let mut tree = self.inner.write().await;
        let mut next = tree.clone();
        next.entry(collection.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
            .extend(partial);
        self.save(&next).await?;
        *tree = next;
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<(String, Record)>, ServiceError> {
        let tree = self.inner.read().await;
        Ok(tree
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
