//! REST API routes.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::{follower, plan, stored_routes, ws};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Route store
        .route(
            "/v1/routes",
            get(stored_routes::list_routes)
                .post(stored_routes::create_route)
                .put(stored_routes::replace_routes),
        )
        .route("/v1/routes/export", get(stored_routes::export_routes))
        .route(
            "/v1/routes/:id",
            get(stored_routes::get_route).delete(stored_routes::delete_route),
        )
        .route("/v1/graph", get(graph_stats))
        // Planning and animation
        .route("/v1/plan", axum::routing::post(plan::plan_route))
        .route(
            "/v1/follower",
            get(follower::get_follower).delete(follower::stop_follower),
        )
        // WebSocket streaming
        .route("/v1/ws", get(ws::ws_handler))
}

#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub routes: usize,
    pub nodes: usize,
    pub edges: usize,
}

/// Size of the current graph snapshot. `edges` counts each undirected
/// edge once.
async fn graph_stats(State(state): State<Arc<AppState>>) -> Json<GraphStats> {
    let graph = state.graph();
    Json(GraphStats {
        routes: graph.route_count(),
        nodes: graph.node_count(),
        edges: graph.edge_count() / 2,
    })
}
