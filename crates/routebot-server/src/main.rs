//! Routebot server - route planning and path following over HTTP.

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routebot_server::config::Config;
use routebot_server::routes_file::load_routes_file;
use routebot_server::state::AppState;
use routebot_server::{api, persistence};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("routebot_server=debug".parse()?))
        .init();

    tracing::info!("Starting routebot server...");

    let config = Config::from_env();
    let port = config.server_port;

    let config_routes = match config.routes_config_path.as_deref() {
        Some(path) => load_routes_file(path)?,
        None => Vec::new(),
    };

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;
    let state = Arc::new(AppState::with_database(db, config, config_routes));
    state.load_from_database().await?;

    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.stop_follower();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
