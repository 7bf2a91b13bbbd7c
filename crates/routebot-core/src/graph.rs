//! Route graph built from authored polylines.
//!
//! Every point of every route becomes a node (`routeId:index`) connected to its
//! predecessor on the same route. Routes never share nodes; the only link
//! between two routes is the query-time splicing done by the path finder.

use crate::geometry::Cartesian3;
use crate::models::{GeoPoint, RouteRecord};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
    pub position: Cartesian3,
}

impl GraphNode {
    pub fn from_point(id: String, point: &GeoPoint) -> Self {
        Self {
            id,
            lon: point.lon,
            lat: point.lat,
            height: point.height,
            position: point.lifted_position(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub neighbor: String,
    pub weight: f64,
}

pub type Adjacency = IndexMap<String, Vec<GraphEdge>>;

/// Immutable node/edge set. Rebuilt wholesale whenever the route collection
/// changes; consumers share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RouteGraph {
    nodes: IndexMap<String, GraphNode>,
    adjacency: Adjacency,
    route_count: usize,
}

impl RouteGraph {
    pub fn build(routes: &[RouteRecord]) -> Self {
        let mut graph = RouteGraph::default();
        for (index, route) in routes.iter().enumerate() {
            graph.add_route(index, route);
        }
        graph
    }

    fn add_route(&mut self, index: usize, route: &RouteRecord) {
        if route.points.is_empty() {
            return;
        }
        let route_id = if route.id.is_empty() {
            format!("route-{index}")
        } else {
            route.id.clone()
        };

        let mut previous: Option<(String, Cartesian3)> = None;
        for (idx, point) in route.points.iter().enumerate() {
            let node = GraphNode::from_point(format!("{route_id}:{idx}"), point);
            let node_id = node.id.clone();
            let position = node.position;
            self.nodes.insert(node_id.clone(), node);
            self.adjacency.entry(node_id.clone()).or_default();

            if let Some((prev_id, prev_position)) = previous.take() {
                let weight = prev_position.distance(&position);
                self.connect(&prev_id, &node_id, weight);
            }
            previous = Some((node_id, position));
        }
        self.route_count += 1;
    }

    fn connect(&mut self, a: &str, b: &str, weight: f64) {
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .push(GraphEdge {
                neighbor: a.to_string(),
                weight,
            });
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .push(GraphEdge {
                neighbor: b.to_string(),
                weight,
            });
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Nodes in insertion order (config routes first).
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn neighbors(&self, id: &str) -> &[GraphEdge] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edge entries (twice the undirected edge count).
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Routes that contributed at least one node.
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
