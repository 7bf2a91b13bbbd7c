//! Path planning endpoint.

use axum::{extract::State, http::StatusCode, Json};
use routebot_core::{FollowerSnapshot, GeoPoint, PathResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub start: GeoPoint,
    pub end: GeoPoint,
    /// Start animating the marker along the result.
    #[serde(default = "default_follow")]
    pub follow: bool,
}

fn default_follow() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub path: PathResult,
    pub node_ids: Vec<String>,
    pub follower: FollowerSnapshot,
}

pub async fn plan_route(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, (StatusCode, Json<Value>)> {
    match state.plan(&req.start, &req.end, req.follow).await {
        Ok(planned) => Ok(Json(PlanResponse {
            path: planned.path,
            node_ids: planned.node_ids,
            follower: state.follower_snapshot(),
        })),
        Err(err) => {
            tracing::warn!("Plan request failed: {}", err);
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": err.to_string() })),
            ))
        }
    }
}
