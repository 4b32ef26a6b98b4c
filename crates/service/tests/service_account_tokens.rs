use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, post},
    Form, Json, Router,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;
use service::errors::ServiceError;
use service::storage::firebase::{Credentials, FirebaseStore, ServiceAccountKey, ServiceAccountTokens};
use service::storage::Store;
use tokio::net::TcpListener;

const PRIVATE_KEY: &str = include_str!("fixtures/service_account_key.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/service_account_pub.pem");
const CLIENT_EMAIL: &str = "svc@coffee-shop.iam.gserviceaccount.com";

#[derive(Clone)]
struct TokenEndpoint {
    issued: Arc<AtomicUsize>,
    expires_in: u64,
    audience: String,
}

#[derive(Deserialize)]
struct GrantForm {
    grant_type: String,
    assertion: String,
}

#[derive(Deserialize)]
struct AssertionClaims {
    iss: String,
    aud: String,
    scope: String,
    iat: i64,
    exp: i64,
}

async fn issue_token(State(endpoint): State<TokenEndpoint>, Form(form): Form<GrantForm>) -> Response {
    if form.grant_type != "urn:ietf:params:oauth:grant-type:jwt-bearer" {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "unsupported_grant_type"}))).into_response();
    }

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[endpoint.audience.as_str()]);
    let key = match DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()) {
        Ok(key) => key,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };
    let claims = match decode::<AssertionClaims>(&form.assertion, &key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant", "detail": e.to_string()})))
                .into_response()
        }
    };
    if claims.iss != CLIENT_EMAIL
        || claims.aud != endpoint.audience
        || !claims.scope.contains("firebase.database")
        || claims.exp <= claims.iat
    {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response();
    }

    let n = endpoint.issued.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("token-{n}"),
        "expires_in": endpoint.expires_in,
        "token_type": "Bearer"
    }))
    .into_response()
}

/// Database stand-in that only answers requests carrying an issued token.
async fn read_node(Path(_path): Path<String>, Query(query): Query<HashMap<String, String>>) -> Response {
    match query.get("access_token") {
        Some(token) if token.starts_with("token-") => {
            Json(json!({"-Nb0000000000000000a": {"name": "Latte", "price": 3.5}})).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "Permission denied"}))).into_response(),
    }
}

/// Starts the token endpoint and the database on one listener; returns the base url and issue counter.
async fn start_fake_google(expires_in: u64) -> anyhow::Result<(String, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}", addr);

    let issued = Arc::new(AtomicUsize::new(0));
    let endpoint = TokenEndpoint { issued: issued.clone(), expires_in, audience: format!("{base_url}/token") };
    let app = Router::new()
        .route("/token", post(issue_token))
        .route("/db/*path", any(read_node))
        .with_state(endpoint);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("fake token server error: {}", e); }
    });
    Ok((base_url, issued))
}

fn key_for(base_url: &str) -> ServiceAccountKey {
    ServiceAccountKey {
        client_email: CLIENT_EMAIL.into(),
        private_key: PRIVATE_KEY.into(),
        token_uri: format!("{base_url}/token"),
        project_id: Some("coffee-shop".into()),
    }
}

#[tokio::test]
async fn access_token_is_cached_between_calls() -> anyhow::Result<()> {
    let (base_url, issued) = start_fake_google(3600).await?;
    let tokens = ServiceAccountTokens::new(key_for(&base_url))?;
    let client = reqwest::Client::new();

    let first = tokens.access_token(&client).await?;
    let second = tokens.access_token(&client).await?;
    let third = tokens.access_token(&client).await?;

    assert_eq!(first, "token-1");
    assert_eq!(second, first);
    assert_eq!(third, first);
    assert_eq!(issued.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn short_lived_token_is_refreshed() -> anyhow::Result<()> {
    let (base_url, issued) = start_fake_google(60).await?;
    let tokens = ServiceAccountTokens::new(key_for(&base_url))?;
    let client = reqwest::Client::new();

    assert_eq!(tokens.access_token(&client).await?, "token-1");
    assert_eq!(tokens.access_token(&client).await?, "token-2");
    assert_eq!(issued.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn rejected_assertion_is_a_store_error() -> anyhow::Result<()> {
    let (base_url, issued) = start_fake_google(3600).await?;
    let mut key = key_for(&base_url);
    key.client_email = "someone-else@example.com".into();
    let tokens = ServiceAccountTokens::new(key)?;

    match tokens.access_token(&reqwest::Client::new()).await {
        Err(ServiceError::Store(msg)) => assert!(msg.contains("invalid_grant"), "{msg}"),
        other => panic!("expected store error, got {other:?}"),
    }
    assert_eq!(issued.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn firebase_store_reads_with_service_account_token() -> anyhow::Result<()> {
    let (base_url, issued) = start_fake_google(3600).await?;
    let credentials = Credentials::ServiceAccount(ServiceAccountTokens::new(key_for(&base_url))?);
    let db = FirebaseStore::new(&format!("{base_url}/db"), credentials, Duration::from_secs(5))?;

    let listed = db.list_all("Coffee").await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].1["name"], json!("Latte"));
    db.list_all("Coffee").await?;
    assert_eq!(issued.load(Ordering::SeqCst), 1);
    Ok(())
}
