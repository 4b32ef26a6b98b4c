//! Credentials for the Realtime Database REST API.
//!
//! A service account key is exchanged for a short-lived OAuth2 access token
//! (JWT bearer grant, RS256). The token is cached and refreshed a minute
//! before it expires.

use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::ServiceError;

const SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const JWT_BEARER: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String { "https://oauth2.googleapis.com/token".into() }

/// The parts of a Google service account key file this service needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub async fn from_file(path: &str) -> Result<Self, ServiceError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ServiceError::Store(format!("cannot read service account key {path}: {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ServiceError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ServiceError::Store(format!("invalid service account key: {e}")))
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 { 3600 }

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Access tokens minted from a service account key.
pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey) -> Result<Self, ServiceError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| ServiceError::Store(format!("invalid service account private key: {e}")))?;
        Ok(Self { key, signing_key, cached: Mutex::new(None) })
    }

    fn assertion(&self) -> Result<String, ServiceError> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| ServiceError::Store(format!("cannot sign token assertion: {e}")))
    }

    /// A valid access token, fetching a new one when the cached token is near expiry.
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String, ServiceError> {
        let mut cached = self.cached.lock().await;
        if let Some(c) = cached.as_ref() {
            if Instant::now() < c.refresh_at {
                return Ok(c.token.clone());
            }
        }

        debug!(client_email = %self.key.client_email, "requesting access token");
        let response = client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER), ("assertion", self.assertion()?.as_str())])
            .send()
            .await
            .map_err(|e| ServiceError::Store(format!("token request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Store(format!("token endpoint returned {status}: {body}")));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Store(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(REFRESH_MARGIN);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        info!(expires_in = token.expires_in, "access token refreshed");
        Ok(token.access_token)
    }
}

/// How requests to the database authenticate.
pub enum Credentials {
    /// No credentials, for the emulator or public rules.
    None,
    /// Legacy database secret, sent as the `auth` parameter.
    DatabaseSecret(String),
    /// OAuth2 token from a service account, sent as `access_token`.
    ServiceAccount(ServiceAccountTokens),
}

impl Credentials {
    /// Load a service account key file; an empty path means no credentials.
    pub async fn from_key_file(path: &str) -> Result<Self, ServiceError> {
        if path.trim().is_empty() {
            return Ok(Self::None);
        }
        let key = ServiceAccountKey::from_file(path).await?;
        info!(client_email = %key.client_email, project_id = ?key.project_id, "loaded service account key");
        Ok(Self::ServiceAccount(ServiceAccountTokens::new(key)?))
    }

    /// Query parameter to append to a request, if any.
    pub async fn query_param(
        &self,
        client: &reqwest::Client,
    ) -> Result<Option<(&'static str, String)>, ServiceError> {
        match self {
            Credentials::None => Ok(None),
            Credentials::DatabaseSecret(secret) => Ok(Some(("auth", secret.clone()))),
            Credentials::ServiceAccount(tokens) => {
                Ok(Some(("access_token", tokens.access_token(client).await?)))
            }
        }
    }
}
