//! Firebase Realtime Database backend over the REST API.
//!
//! Every node is addressable as `{database_url}/{path}.json`. `GET` reads a
//! subtree (`null` when absent), `PUT` sets it, `PATCH` merges the given
//! children. Keys are generated locally in push-id format, as the SDK does.

pub mod credentials;

use std::{cmp::Ordering, time::Duration};

use async_trait::async_trait;
use models::coffee::Record;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

pub use credentials::{Credentials, ServiceAccountKey, ServiceAccountTokens};

use super::{push_id::PushIdGenerator, Store};
use crate::errors::ServiceError;

pub struct FirebaseStore {
    client: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    keys: PushIdGenerator,
}

impl FirebaseStore {
    pub fn new(database_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = Url::parse(database_url.trim())
            .map_err(|e| ServiceError::Store(format!("invalid database url `{database_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::Store(format!("invalid database url `{database_url}`")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ServiceError::store)?;
        Ok(Self { client, base_url, credentials, keys: PushIdGenerator::new() })
    }

    /// `{base}/{segments...}.json`, each segment percent-encoded.
    fn node_url(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ServiceError::Store("database url cannot be a base".into()))?;
            path.pop_if_empty();
            if let Some((last, init)) = segments.split_last() {
                path.extend(init);
                path.push(&format!("{last}.json"));
            }
        }
        Ok(url)
    }

    async fn request(&self, method: Method, segments: &[&str]) -> Result<reqwest::RequestBuilder, ServiceError> {
        let mut url = self.node_url(segments)?;
        if let Some((name, value)) = self.credentials.query_param(&self.client).await? {
            url.query_pairs_mut().append_pair(name, &value);
        }
        Ok(self.client.request(method, url))
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<T, ServiceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::Store(format!("{what} failed: {}", e.without_url())))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Store(error_message(status, response).await));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Store(format!("{what} returned an unreadable body: {}", e.without_url())))
    }
}

/// Database errors come back as `{"error": "..."}`.
async fn error_message(status: StatusCode, response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    format!("database returned {status}: {detail}")
}

#[async_trait]
impl Store for FirebaseStore {
    fn generate_key(&self) -> String {
        self.keys.next_id()
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Record>, ServiceError> {
        let req = self.request(Method::GET, &[collection, key]).await?;
        match self.send::<Value>(req, "read").await? {
            Value::Null => Ok(None),
            Value::Object(record) => Ok(Some(record)),
            other => Err(ServiceError::Store(format!(
                "{collection}/{key} holds a {} instead of a record",
                json_kind(&other)
            ))),
        }
    }

    async fn put(&self, collection: &str, key: &str, record: Record) -> Result<(), ServiceError> {
        let req = self.request(Method::PUT, &[collection, key]).await?.json(&record);
        let _: Value = self.send(req, "set").await?;
        debug!(%collection, %key, "record set");
        Ok(())
    }

    async fn merge(&self, collection: &str, key: &str, partial: Record) -> Result<(), ServiceError> {
        let req = self.request(Method::PATCH, &[collection, key]).await?.json(&partial);
        let _: Value = self.send(req, "update").await?;
        debug!(%collection, %key, "record merged");
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<(String, Record)>, ServiceError> {
        let req = self.request(Method::GET, &[collection]).await?;
        let children = match self.send::<Value>(req, "read").await? {
            Value::Null => return Ok(Vec::new()),
            Value::Object(children) => children,
            // arrays come back when every key is a small integer
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            other => {
                return Err(ServiceError::Store(format!(
                    "{collection} holds a {} instead of a collection",
                    json_kind(&other)
                )))
            }
        };

        let mut records: Vec<(String, Record)> = children
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Object(record) => Some((key, record)),
                Value::Null => None,
                other => {
                    warn!(%collection, %key, kind = json_kind(&other), "skipping non-record child");
                    None
                }
            })
            .collect();
        records.sort_by(|a, b| compare_keys(&a.0, &b.0));
        Ok(records)
    }
}

/// Child order used by the database: 32-bit integer keys first, numerically,
/// then every other key as a string.
pub(crate) fn compare_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.len().cmp(&b.len())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn integer_key(key: &str) -> Option<i64> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || digits.trim_start_matches('0').len() > 10
    {
        return None;
    }
    let value: i64 = key.parse().ok()?;
    (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&value).then_some(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
