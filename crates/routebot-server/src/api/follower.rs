//! Follower status endpoints.

use axum::{extract::State, Json};
use routebot_core::FollowerSnapshot;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

pub async fn get_follower(State(state): State<Arc<AppState>>) -> Json<FollowerSnapshot> {
    Json(state.follower_snapshot())
}

/// Stop the current run. Safe to call when nothing is running.
pub async fn stop_follower(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stopped = state.stop_follower();
    if stopped {
        tracing::info!("Follower stopped by request");
    }
    Json(json!({ "stopped": stopped, "follower": state.follower_snapshot() }))
}
