//! Command line input parsing.

use anyhow::{bail, Context, Result};
use routebot_core::{parse_route_list, GeoPoint, RouteRecord};
use std::path::Path;

/// Parse `lon,lat` or `lon,lat,height`.
pub fn parse_point(raw: &str) -> Result<GeoPoint> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 2 && parts.len() != 3 {
        bail!("expected lon,lat[,height], got '{}'", raw);
    }
    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        let value: f64 = part
            .parse()
            .with_context(|| format!("invalid number '{}' in '{}'", part, raw))?;
        if !value.is_finite() {
            bail!("non-finite coordinate in '{}'", raw);
        }
        values.push(value);
    }
    let (lon, lat) = (values[0], values[1]);
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        bail!("coordinate out of range: '{}'", raw);
    }
    Ok(GeoPoint::new(lon, lat, values.get(2).copied().unwrap_or(0.0)))
}

/// Read a routes JSON file (bare array or `{ "routes": [...] }`).
pub fn load_routes(path: impl AsRef<Path>) -> Result<Vec<RouteRecord>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_route_list(&raw).with_context(|| format!("parsing {}", path.display()))
}
