//! API routes for the route server.

pub mod follower;
pub mod plan;
mod routes;
pub mod stored_routes;
pub mod ws;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}

#[cfg(test)]
mod tests;
