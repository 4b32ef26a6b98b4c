use std::sync::Arc;

use chrono::Utc;
use models::{
    coffee::{for_listing, Field, Record},
    request::{CreateCoffeeRequest, UpdateCoffeeRequest},
    FieldPolicy,
};
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::storage::{is_valid_key, Store};

/// Create, list and partially update coffee records in one collection.
///
/// Holds no state of its own besides the injected store handle.
pub struct CatalogService {
    store: Arc<dyn Store>,
    collection: String,
    policy: FieldPolicy,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, collection: impl Into<String>, policy: FieldPolicy) -> Self {
        Self { store, collection: collection.into(), policy }
    }

    pub fn policy(&self) -> FieldPolicy { self.policy }

    /// Validate and write a new record; returns its generated key.
    #[instrument(skip(self, input), fields(collection = %self.collection))]
    pub async fn create(&self, input: CreateCoffeeRequest) -> Result<String, ServiceError> {
        let coffee = input.validate(self.policy)?;
        let key = self.store.generate_key();
        self.store
            .put(&self.collection, &key, coffee.into_record(&key))
            .await?;
        info!(id = %key, "coffee created");
        Ok(key)
    }

    /// Every record in store order, with `price` normalized to a number.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn list(&self) -> Result<Vec<Record>, ServiceError> {
        let records = self.store.list_all(&self.collection).await?;
        info!(count = records.len(), "coffees listed");
        Ok(records.into_iter().map(|(_, record)| for_listing(record)).collect())
    }

    /// Fail with `NotFound` unless a record exists at `id`.
    pub async fn require_existing(&self, id: &str) -> Result<(), ServiceError> {
        // a key with path characters cannot name a record in this collection
        if !is_valid_key(id) {
            return Err(ServiceError::not_found("coffee"));
        }
        match self.store.get(&self.collection, id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("coffee")),
        }
    }

    /// Merge the supplied fields into an existing record and stamp `updatedAt`.
    ///
    /// Existence is checked before the body, so an unknown key is reported as
    /// not found whatever the body holds. Nothing is written on either failure.
    #[instrument(skip(self, input), fields(collection = %self.collection))]
    pub async fn update(&self, id: &str, input: UpdateCoffeeRequest) -> Result<(), ServiceError> {
        self.require_existing(id).await?;
        let update = input.validate(self.policy)?;
        if !update.dropped.is_empty() {
            let dropped: Vec<&str> = update.dropped.iter().map(|f| f.as_str()).collect();
            warn!(%id, ?dropped, "empty or zero values ignored under truthy field policy");
        }
        let written: Vec<&'static str> = update.patch.fields().into_iter().map(Field::as_str).collect();
        self.store
            .merge(&self.collection, id, update.patch.into_partial(Utc::now()))
            .await?;
        info!(%id, fields = ?written, "coffee updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use async_trait::async_trait;
    use models::errors::ModelError;
    use models::price::PriceInput;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts writes so tests can assert nothing was written.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl Store for CountingStore {
        fn generate_key(&self) -> String { self.inner.generate_key() }

        async fn get(&self, c: &str, k: &str) -> Result<Option<Record>, ServiceError> {
            self.inner.get(c, k).await
        }

        async fn put(&self, c: &str, k: &str, r: Record) -> Result<(), ServiceError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.put(c, k, r).await
        }

        async fn merge(&self, c: &str, k: &str, r: Record) -> Result<(), ServiceError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.merge(c, k, r).await
        }

        async fn list_all(&self, c: &str) -> Result<Vec<(String, Record)>, ServiceError> {
            self.inner.list_all(c).await
        }
    }

    fn service(policy: FieldPolicy) -> (CatalogService, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        (CatalogService::new(store.clone(), "Coffee", policy), store)
    }

    fn latte() -> CreateCoffeeRequest {
        CreateCoffeeRequest {
            name: Some("Latte".into()),
            price: Some(PriceInput::Text("3.5".into())),
            description: Some("Milk coffee".into()),
            image_url: Some("http://x/y.png".into()),
            category: Some("Hot".into()),
        }
    }

    #[tokio::test]
    async fn create_then_list() -> Result<(), ServiceError> {
        let (svc, _) = service(FieldPolicy::Truthy);
        assert!(svc.list().await?.is_empty());

        let id = svc.create(latte()).await?;
        let list = svc.list().await?;
        assert_eq!(list.len(), 1);
        assert_eq!(
            Value::Object(list[0].clone()),
            json!({
                "id": id,
                "name": "Latte",
                "price": 3.5,
                "description": "Milk coffee",
                "imageUrl": "http://x/y.png",
                "category": "Hot",
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn invalid_create_writes_nothing() {
        let (svc, store) = service(FieldPolicy::Truthy);
        let mut missing = latte();
        missing.description = None;
        assert!(matches!(
            svc.create(missing).await,
            Err(ServiceError::Validation(ModelError::MissingFields(_)))
        ));

        let mut bad_price = latte();
        bad_price.price = Some(PriceInput::Text("abc".into()));
        assert!(matches!(
            svc.create(bad_price).await,
            Err(ServiceError::Validation(ModelError::InvalidPrice(_)))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_normalizes_text_prices() -> Result<(), ServiceError> {
        let (svc, store) = service(FieldPolicy::Truthy);
        let mut raw = Record::new();
        raw.insert("name".into(), json!("Legacy"));
        raw.insert("price".into(), json!("2.50"));
        store.put("Coffee", "legacy", raw).await?;

        let list = svc.list().await?;
        assert_eq!(list[0]["price"], json!(2.5));
        Ok(())
    }

    #[tokio::test]
    async fn update_merges_only_supplied_fields() -> Result<(), ServiceError> {
        let (svc, store) = service(FieldPolicy::Truthy);
        let id = svc.create(latte()).await?;

        svc.update(&id, UpdateCoffeeRequest { name: Some("Flat white".into()), ..Default::default() })
            .await?;
        let first = store.get("Coffee", &id).await?.unwrap();
        assert_eq!(first["name"], json!("Flat white"));
        assert_eq!(first["price"], json!(3.5));
        assert_eq!(first["description"], json!("Milk coffee"));
        assert_eq!(first["imageUrl"], json!("http://x/y.png"));
        assert_eq!(first["category"], json!("Hot"));
        let stamp = first["updatedAt"].as_str().unwrap().to_string();
        assert!(stamp.ends_with('Z'));

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        svc.update(&id, UpdateCoffeeRequest { price: Some(PriceInput::Number(4.0)), ..Default::default() })
            .await?;
        let second = store.get("Coffee", &id).await?.unwrap();
        assert_eq!(second["price"], json!(4.0));
        assert_eq!(second["name"], json!("Flat white"));
        assert_ne!(second["updatedAt"].as_str().unwrap(), stamp);
        Ok(())
    }

    #[tokio::test]
    async fn update_unknown_key_is_not_found_whatever_the_body() {
        let (svc, store) = service(FieldPolicy::Truthy);
        for body in [
            UpdateCoffeeRequest { name: Some("X".into()), ..Default::default() },
            UpdateCoffeeRequest::default(),
        ] {
            assert!(matches!(svc.update("doesnotexist", body).await, Err(ServiceError::NotFound(_))));
        }
        assert!(matches!(
            svc.update("a/b", UpdateCoffeeRequest { name: Some("X".into()), ..Default::default() }).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_with_only_falsy_values_is_rejected_under_truthy_policy() -> Result<(), ServiceError> {
        let (svc, store) = service(FieldPolicy::Truthy);
        let id = svc.create(latte()).await?;
        let body = UpdateCoffeeRequest {
            price: Some(PriceInput::Number(0.0)),
            category: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update(&id, body).await,
            Err(ServiceError::Validation(ModelError::NothingToUpdate))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn presence_policy_applies_zero_and_empty() -> Result<(), ServiceError> {
        let (svc, store) = service(FieldPolicy::Presence);
        let id = svc.create(latte()).await?;
        let body = UpdateCoffeeRequest {
            price: Some(PriceInput::Number(0.0)),
            category: Some(String::new()),
            ..Default::default()
        };
        svc.update(&id, body).await?;
        let stored = store.get("Coffee", &id).await?.unwrap();
        assert_eq!(stored["price"], json!(0.0));
        assert_eq!(stored["category"], json!(""));
        assert_eq!(stored["name"], json!("Latte"));
        Ok(())
    }
}
