//! Route store API endpoints.
//!
//! Configuration routes are listed alongside stored ones but cannot be
//! changed through the API. Every mutation rebuilds the route graph.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use routebot_core::RouteRecord;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::{AppState, RouteStoreError};

type ApiError = (StatusCode, Json<Value>);

fn store_error(err: RouteStoreError) -> ApiError {
    let status = match &err {
        RouteStoreError::NotFound(_) => StatusCode::NOT_FOUND,
        RouteStoreError::ReadOnly(_) => StatusCode::CONFLICT,
        RouteStoreError::InvalidPoints(_) => StatusCode::BAD_REQUEST,
        RouteStoreError::Persistence(inner) => {
            tracing::error!("Route store failure: {:#}", inner);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() })))
}

/// List configuration routes followed by stored routes.
pub async fn list_routes(State(state): State<Arc<AppState>>) -> Json<Vec<RouteRecord>> {
    Json(state.all_routes().await)
}

/// Stored routes only, in the `{ "routes": [...] }` shape the import accepts.
pub async fn export_routes(State(state): State<Arc<AppState>>) -> Json<Value> {
    let routes = state.stored_routes().await;
    Json(json!({ "routes": routes }))
}

pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RouteRecord>, StatusCode> {
    state
        .get_route(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Create a route, or replace the stored route with the same id.
pub async fn create_route(
    State(state): State<Arc<AppState>>,
    Json(route): Json<RouteRecord>,
) -> Result<(StatusCode, Json<RouteRecord>), ApiError> {
    let saved = state.upsert_route(route).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RouteListBody {
    Bare(Vec<RouteRecord>),
    Wrapped { routes: Vec<RouteRecord> },
}

/// Replace every stored route (import).
pub async fn replace_routes(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RouteListBody>,
) -> Result<Json<Value>, ApiError> {
    let routes = match body {
        RouteListBody::Bare(routes) => routes,
        RouteListBody::Wrapped { routes } => routes,
    };
    let count = state.replace_routes(routes).await.map_err(store_error)?;
    Ok(Json(json!({ "stored": count })))
}

pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.delete_route(&id).await.map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
