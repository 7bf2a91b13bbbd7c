//! Core data models for the routing engine.

use crate::geometry::{path_length, Cartesian3, MARKER_CLEARANCE_M};
use serde::{Deserialize, Serialize};

fn default_route_color() -> String {
    "ORANGE".to_string()
}

/// Geodetic point: degrees plus height above the ellipsoid in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub height: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64, height: f64) -> Self {
        Self { lon, lat, height }
    }

    /// Position used for graph comparisons and rendering, lifted by the
    /// marker clearance.
    pub fn lifted_position(&self) -> Cartesian3 {
        Cartesian3::from_degrees(self.lon, self.lat, self.height + MARKER_CLEARANCE_M)
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.height.is_finite()
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lon: self.lon,
            lat: self.lat,
        }
    }
}

/// Longitude/latitude pair sent to height providers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

/// An authored polyline stored either in the configuration file or in the
/// persisted route list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_route_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub points: Vec<GeoPoint>,
}

/// Accepts either a bare JSON array of routes or an object with a `routes`
/// array (the layout of the viewer configuration file).
pub fn parse_route_list(json: &str) -> Result<Vec<RouteRecord>, serde_json::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RouteList {
        Bare(Vec<RouteRecord>),
        Wrapped {
            #[serde(default)]
            routes: Vec<RouteRecord>,
        },
    }

    match serde_json::from_str(json)? {
        RouteList::Bare(routes) => Ok(routes),
        RouteList::Wrapped { routes } => Ok(routes),
    }
}

/// Where a computed path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Derived from the route graph.
    Network,
    /// Terrain-sampled straight line.
    Direct,
}

/// A planned path. The length is always derived from the positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathResult {
    positions: Vec<Cartesian3>,
    length_m: f64,
    mode: PathMode,
}

impl PathResult {
    pub fn new(positions: Vec<Cartesian3>, mode: PathMode) -> Self {
        let length_m = path_length(&positions);
        Self {
            positions,
            length_m,
            mode,
        }
    }

    pub fn positions(&self) -> &[Cartesian3] {
        &self.positions
    }

    pub fn into_positions(self) -> Vec<Cartesian3> {
        self.positions
    }

    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// At least two positions and not every position identical.
    pub fn is_usable(&self) -> bool {
        match self.positions.first() {
            Some(first) => {
                self.positions.len() >= 2 && self.positions.iter().any(|p| p != first)
            }
            None => false,
        }
    }
}
