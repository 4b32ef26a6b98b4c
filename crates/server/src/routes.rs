pub mod coffee;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;
use service::catalog::CatalogService;

use crate::{metrics, openapi::ApiDoc};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics_handler() -> (StatusCode, String) {
    metrics::encode_metrics()
}

/// Build the full application router: catalog routes plus health, metrics and API docs.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    // Catalog routes
    let catalog = Router::new()
        .route("/add-coffee", post(coffee::add_coffee))
        .route("/get-coffees", get(coffee::get_coffees))
        .route("/update-coffee/:id", put(coffee::update_coffee));

    // Operational routes
    let ops = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler));

    // Compose
    catalog
        .merge(ops)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one INFO span per request with method and path
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // status code and latency
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
