//! Configuration routes file.

use anyhow::{Context, Result};
use routebot_core::{parse_route_list, RouteRecord};
use std::path::Path;

/// Load the read-only configuration routes. Accepts a bare array or an
/// object with a `routes` array.
pub fn load_routes_file(path: impl AsRef<Path>) -> Result<Vec<RouteRecord>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading routes file {}", path.display()))?;
    let routes = parse_route_list(&raw)
        .with_context(|| format!("parsing routes file {}", path.display()))?;
    tracing::info!("Loaded {} configuration routes from {}", routes.len(), path.display());
    Ok(routes)
}
