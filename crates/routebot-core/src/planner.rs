//! Route planning service: owns the current route graph snapshot and
//! combines network search with the terrain fallback.

use crate::geometry::haversine_distance;
use crate::graph::RouteGraph;
use crate::models::{GeoPoint, PathMode, PathResult, RouteRecord};
use crate::pathfinder::{PathFinder, DEFAULT_NEAREST_NEIGHBORS};
use crate::terrain::{build_direct_line, HeightProvider, DEFAULT_TERRAIN_SAMPLES};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Two query points closer than this resolve to the same position.
const SAME_POINT_EPSILON_M: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Graph nodes each query point is spliced to.
    pub nearest_neighbors: usize,
    /// Segments of the terrain fallback line.
    pub terrain_samples: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            nearest_neighbors: DEFAULT_NEAREST_NEIGHBORS,
            terrain_samples: DEFAULT_TERRAIN_SAMPLES,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("unable to compute route between selected points: start and end are the same point")]
    Degenerate,
    #[error("unable to compute route between selected points: invalid coordinates")]
    InvalidPoint,
}

#[derive(Debug, Clone)]
pub struct PlannedRoute {
    pub path: PathResult,
    /// Graph nodes along a network path; empty for direct lines.
    pub node_ids: Vec<String>,
}

impl PlannedRoute {
    pub fn mode(&self) -> PathMode {
        self.path.mode()
    }
}

/// Holds the configuration routes and the current graph. Rebuilding swaps
/// the `Arc`, so searches keep a consistent snapshot.
#[derive(Debug)]
pub struct RoutePlanner {
    config_routes: Vec<RouteRecord>,
    graph: RwLock<Arc<RouteGraph>>,
    finder: PathFinder,
    config: PlannerConfig,
}

impl RoutePlanner {
    pub fn new(config_routes: Vec<RouteRecord>, config: PlannerConfig) -> Self {
        let graph = Arc::new(RouteGraph::build(&config_routes));
        Self {
            finder: PathFinder::new(config.nearest_neighbors),
            config_routes,
            graph: RwLock::new(graph),
            config,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn config_routes(&self) -> &[RouteRecord] {
        &self.config_routes
    }

    /// Current graph snapshot.
    pub fn snapshot(&self) -> Arc<RouteGraph> {
        match self.graph.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Build a new graph from the config routes followed by `stored` and
    /// swap it in.
    pub fn rebuild(&self, stored: &[RouteRecord]) -> Arc<RouteGraph> {
        let combined: Vec<RouteRecord> = self
            .config_routes
            .iter()
            .chain(stored.iter())
            .cloned()
            .collect();
        let graph = Arc::new(RouteGraph::build(&combined));
        tracing::info!(
            "Rebuilt route graph: {} routes, {} nodes, {} edges",
            graph.route_count(),
            graph.node_count(),
            graph.edge_count()
        );

        match self.graph.write() {
            Ok(mut guard) => *guard = graph.clone(),
            Err(poisoned) => *poisoned.into_inner() = graph.clone(),
        }
        graph
    }

    /// Plan a path from `start` to `end`: the route network when it connects
    /// them, otherwise a terrain-sampled straight line.
    ///
    /// Fails only for unusable input; "no network path" falls back silently.
    pub async fn plan<P>(
        &self,
        heights: &P,
        start: &GeoPoint,
        end: &GeoPoint,
    ) -> Result<PlannedRoute, PlanError>
    where
        P: HeightProvider,
    {
        if !start.is_finite() || !end.is_finite() {
            return Err(PlanError::InvalidPoint);
        }
        if start.lifted_position().distance(&end.lifted_position()) < SAME_POINT_EPSILON_M {
            return Err(PlanError::Degenerate);
        }

        let graph = self.snapshot();
        if let Some(route) = self.finder.shortest_path(&graph, start, end) {
            if route.path.is_usable() {
                tracing::info!(
                    "Network route, length approx. {:.0} m ({} nodes)",
                    route.path.length_m(),
                    route.node_ids.len()
                );
                return Ok(PlannedRoute {
                    path: route.path,
                    node_ids: route.node_ids,
                });
            }
        }

        let path = build_direct_line(heights, start, end, self.config.terrain_samples).await;
        if !path.is_usable() {
            return Err(PlanError::Degenerate);
        }
        tracing::info!(
            "Direct route, length approx. {:.0} m (ground distance {:.0} m)",
            path.length_m(),
            haversine_distance(start.lat, start.lon, end.lat, end.lon)
        );
        Ok(PlannedRoute {
            path,
            node_ids: Vec::new(),
        })
    }
}
