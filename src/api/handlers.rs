//! API Handlers
//!
//! HTTP request handlers for each sample host endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{DistributedCache, TableStorageCache};
use crate::error::Result;
use crate::models::{ErrorResponse, GetResponse, HealthResponse, KeyResponse, SetRequest};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache handler; connects lazily on the first request
    pub cache: Arc<TableStorageCache>,
}

impl AppState {
    /// Creates a new AppState around the given cache handler.
    pub fn new(cache: TableStorageCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

/// Handler for GET /cache/:key
///
/// Retrieves a value by key; absent keys map to 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let response = match state.cache.get(&key).await? {
        Some(bytes) => {
            let value = String::from_utf8_lossy(&bytes).into_owned();
            Json(GetResponse::new(key, value)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Key not found: {}", key))),
        )
            .into_response(),
    };

    Ok(response)
}

/// Handler for PUT /cache/:key
///
/// Stores a value with the request's expiration settings.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<KeyResponse>> {
    let options = req.entry_options();
    state
        .cache
        .set(&key, req.value.into_bytes(), &options)
        .await?;

    Ok(Json(KeyResponse::set(key)))
}

/// Handler for POST /cache/:key/refresh
///
/// Removes the entry if it has expired; otherwise leaves it untouched.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<KeyResponse>> {
    state.cache.refresh(&key).await?;
    Ok(Json(KeyResponse::refreshed(key)))
}

/// Handler for DELETE /cache/:key
///
/// Idempotent: deleting an absent key still succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<KeyResponse>> {
    state.cache.remove(&key).await?;
    Ok(Json(KeyResponse::removed(key)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connection = format!("{:?}", state.cache.connection_state());
    Json(HealthResponse::healthy(connection))
}
