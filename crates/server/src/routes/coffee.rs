use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use models::{
    coffee::Record,
    request::{CreateCoffeeRequest, UpdateCoffeeRequest},
};
use serde::Serialize;
use tracing::info;

use crate::{errors::JsonApiError, metrics, routes::AppState};

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn observed<T>(operation: &str, result: Result<T, JsonApiError>, ok: StatusCode) -> Result<T, JsonApiError> {
    match &result {
        Ok(_) => metrics::observe(operation, ok),
        Err(e) => metrics::observe(operation, e.status),
    }
    result
}

#[utoipa::path(
    post, path = "/add-coffee", tag = "coffee",
    request_body = crate::openapi::CreateCoffeeDoc,
    responses(
        (status = 201, description = "Created", body = crate::openapi::CreatedDoc),
        (status = 400, description = "Missing field or non-numeric price", body = crate::openapi::ErrorDoc),
        (status = 500, description = "Store failure", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn add_coffee(
    State(state): State<AppState>,
    payload: Result<Json<CreateCoffeeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), JsonApiError> {
    let result = async {
        let Json(input) = payload?;
        let id = state.catalog.create(input).await?;
        Ok::<_, JsonApiError>((StatusCode::CREATED, Json(CreatedResponse { message: "Coffee added successfully", id })))
    }
    .await;
    observed("create", result, StatusCode::CREATED)
}

#[utoipa::path(
    get, path = "/get-coffees", tag = "coffee",
    responses(
        (status = 200, description = "All coffees", body = [crate::openapi::CoffeeDoc]),
        (status = 500, description = "Store failure", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn get_coffees(State(state): State<AppState>) -> Result<Json<Vec<Record>>, JsonApiError> {
    let result = state
        .catalog
        .list()
        .await
        .map(Json)
        .map_err(JsonApiError::from);
    observed("list", result, StatusCode::OK)
}

#[utoipa::path(
    put, path = "/update-coffee/{id}", tag = "coffee",
    params(("id" = String, Path, description = "Coffee key")),
    request_body = crate::openapi::UpdateCoffeeDoc,
    responses(
        (status = 200, description = "Updated", body = crate::openapi::MessageDoc),
        (status = 400, description = "No fields to update", body = crate::openapi::ErrorDoc),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorDoc),
        (status = 500, description = "Store failure", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn update_coffee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCoffeeRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, JsonApiError> {
    let result = async {
        let input = match payload {
            Ok(Json(input)) => input,
            Err(rejection) => {
                // an unknown key is reported as 404 even when the body is unusable
                state.catalog.require_existing(&id).await?;
                return Err(rejection.into());
            }
        };
        state.catalog.update(&id, input).await?;
        info!(%id, "update request applied");
        Ok::<_, JsonApiError>(Json(MessageResponse { message: "Coffee updated successfully" }))
    }
    .await;
    observed("update", result, StatusCode::OK)
}
