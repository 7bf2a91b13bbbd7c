//! Nearest-node lookup and shortest-path search over a route graph.
//!
//! Query points are spliced into a cloned copy of the adjacency through
//! temporary start/end nodes, so the shared graph is never mutated.

use crate::geometry::Cartesian3;
use crate::graph::{Adjacency, GraphEdge, GraphNode, RouteGraph};
use crate::models::{GeoPoint, PathMode, PathResult};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

pub const DEFAULT_NEAREST_NEIGHBORS: usize = 3;

const TEMP_NODE_PREFIX: &str = "_temp";

#[derive(Debug, Clone, PartialEq)]
pub struct NearestNode<'a> {
    pub node: &'a GraphNode,
    pub distance: f64,
}

/// Up to `k` graph nodes closest to `point`, nearest first.
///
/// Linear scan over every node. Ties keep graph insertion order.
pub fn find_nearest<'a>(graph: &'a RouteGraph, point: &GeoPoint, k: usize) -> Vec<NearestNode<'a>> {
    if graph.is_empty() || k == 0 {
        return Vec::new();
    }
    let reference = point.lifted_position();
    let mut distances: Vec<NearestNode<'a>> = graph
        .nodes()
        .map(|node| NearestNode {
            node,
            distance: reference.distance(&node.position),
        })
        .collect();
    // sort_by is stable, equal distances stay in iteration order
    distances.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    distances.truncate(k);
    distances
}

/// Result of a successful graph search.
#[derive(Debug, Clone)]
pub struct NetworkRoute {
    pub path: PathResult,
    /// Graph nodes visited, in travel order (temporary nodes excluded).
    pub node_ids: Vec<String>,
    /// Nodes settled before the target was reached.
    pub settled: usize,
}

/// Identifiers for the temporary nodes of one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchContext {
    pub request_id: u64,
    pub start_id: String,
    pub end_id: String,
}

/// Shortest-path search with per-request temporary node identifiers.
#[derive(Debug)]
pub struct PathFinder {
    nearest_neighbors: usize,
    next_request: AtomicU64,
}

impl Default for PathFinder {
    fn default() -> Self {
        Self::new(DEFAULT_NEAREST_NEIGHBORS)
    }
}

impl PathFinder {
    pub fn new(nearest_neighbors: usize) -> Self {
        Self {
            nearest_neighbors: nearest_neighbors.max(1),
            next_request: AtomicU64::new(1),
        }
    }

    pub fn nearest_neighbors(&self) -> usize {
        self.nearest_neighbors
    }

    /// Mint identifiers unique to one search that do not collide with any
    /// node already in `graph`.
    pub fn next_context(&self, graph: &RouteGraph) -> SearchContext {
        loop {
            let request_id = self.next_request.fetch_add(1, AtomicOrdering::Relaxed);
            let start_id = format!("{TEMP_NODE_PREFIX}-start-{request_id}");
            let end_id = format!("{TEMP_NODE_PREFIX}-end-{request_id}");
            if graph.node(&start_id).is_none() && graph.node(&end_id).is_none() {
                return SearchContext {
                    request_id,
                    start_id,
                    end_id,
                };
            }
        }
    }

    /// Splice `start` and `end` into a copy of `graph` and run Dijkstra
    /// between them. `None` means no path: empty graph or disconnected
    /// components.
    pub fn shortest_path(
        &self,
        graph: &RouteGraph,
        start: &GeoPoint,
        end: &GeoPoint,
    ) -> Option<NetworkRoute> {
        let start_neighbors = find_nearest(graph, start, self.nearest_neighbors);
        let end_neighbors = find_nearest(graph, end, self.nearest_neighbors);
        if start_neighbors.is_empty() || end_neighbors.is_empty() {
            tracing::debug!("route graph is empty, no network path");
            return None;
        }

        let context = self.next_context(graph);
        let mut adjacency: Adjacency = graph.adjacency().clone();
        let mut positions: HashMap<&str, Cartesian3> = graph
            .nodes()
            .map(|node| (node.id.as_str(), node.position))
            .collect();
        positions.insert(context.start_id.as_str(), start.lifted_position());
        positions.insert(context.end_id.as_str(), end.lifted_position());

        splice(&mut adjacency, &context.start_id, &start_neighbors);
        splice(&mut adjacency, &context.end_id, &end_neighbors);

        let search = dijkstra(&adjacency, &context.start_id, &context.end_id);
        let Some(path_ids) = search.path else {
            tracing::debug!(
                request_id = context.request_id,
                settled = search.settled,
                "no network path between query points"
            );
            return None;
        };

        let route_positions: Vec<Cartesian3> = path_ids
            .iter()
            .filter_map(|id| positions.get(id.as_str()).copied())
            .collect();
        let node_ids: Vec<String> = path_ids
            .into_iter()
            .filter(|id| *id != context.start_id && *id != context.end_id)
            .collect();

        let path = PathResult::new(route_positions, PathMode::Network);
        tracing::debug!(
            request_id = context.request_id,
            settled = search.settled,
            nodes = node_ids.len(),
            length_m = path.length_m(),
            "network path found"
        );

        Some(NetworkRoute {
            path,
            node_ids,
            settled: search.settled,
        })
    }
}

fn splice(adjacency: &mut Adjacency, temp_id: &str, neighbors: &[NearestNode<'_>]) {
    let mut temp_edges = Vec::with_capacity(neighbors.len());
    for nearest in neighbors {
        temp_edges.push(GraphEdge {
            neighbor: nearest.node.id.clone(),
            weight: nearest.distance,
        });
        adjacency
            .entry(nearest.node.id.clone())
            .or_default()
            .push(GraphEdge {
                neighbor: temp_id.to_string(),
                weight: nearest.distance,
            });
    }
    adjacency.insert(temp_id.to_string(), temp_edges);
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    distance: FloatOrd,
    // insertion sequence keeps pops deterministic for equal distances
    seq: usize,
    index: usize,
}

struct SearchOutcome {
    path: Option<Vec<String>>,
    settled: usize,
}

/// Dijkstra over an adjacency map with a binary heap and lazy deletion.
///
/// Stops as soon as `target` is settled or nothing reachable remains.
fn dijkstra(adjacency: &Adjacency, source: &str, target: &str) -> SearchOutcome {
    let (Some(source_idx), Some(target_idx)) =
        (adjacency.get_index_of(source), adjacency.get_index_of(target))
    else {
        return SearchOutcome {
            path: None,
            settled: 0,
        };
    };

    let mut distances = vec![f64::INFINITY; adjacency.len()];
    let mut previous: Vec<Option<usize>> = vec![None; adjacency.len()];
    let mut settled: HashSet<usize> = HashSet::new();
    let mut open = BinaryHeap::new();
    let mut seq = 0usize;

    distances[source_idx] = 0.0;
    open.push(Reverse(OpenNode {
        distance: FloatOrd(0.0),
        seq,
        index: source_idx,
    }));

    while let Some(Reverse(current)) = open.pop() {
        if !settled.insert(current.index) {
            continue;
        }
        if current.index == target_idx {
            break;
        }

        let Some((_, edges)) = adjacency.get_index(current.index) else {
            continue;
        };
        let base = distances[current.index];
        for edge in edges {
            let Some(neighbor_idx) = adjacency.get_index_of(edge.neighbor.as_str()) else {
                continue;
            };
            if settled.contains(&neighbor_idx) {
                continue;
            }
            let candidate = base + edge.weight;
            if candidate < distances[neighbor_idx] {
                distances[neighbor_idx] = candidate;
                previous[neighbor_idx] = Some(current.index);
                seq += 1;
                open.push(Reverse(OpenNode {
                    distance: FloatOrd(candidate),
                    seq,
                    index: neighbor_idx,
                }));
            }
        }
    }

    let settled_count = settled.len();
    if previous[target_idx].is_none() && source_idx != target_idx {
        return SearchOutcome {
            path: None,
            settled: settled_count,
        };
    }

    let mut path = Vec::new();
    let mut current = target_idx;
    path.push(current);
    while current != source_idx {
        match previous[current] {
            Some(prev) => {
                current = prev;
                path.push(current);
            }
            None => {
                return SearchOutcome {
                    path: None,
                    settled: settled_count,
                }
            }
        }
    }
    path.reverse();

    let ids = path
        .into_iter()
        .filter_map(|idx| adjacency.get_index(idx).map(|(id, _)| id.clone()))
        .collect();
    SearchOutcome {
        path: Some(ids),
        settled: settled_count,
    }
}
