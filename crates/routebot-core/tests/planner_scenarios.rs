//! End-to-end planning scenarios over small hand-built route sets.

use routebot_core::geometry::{meters_to_lat, meters_to_lon};
use routebot_core::{
    path_length, Coordinate, FlatTerrain, GeoPoint, HeightError, HeightProvider, PathFollower,
    PathMode, PlanError, PlannerConfig, RouteGraph, RoutePlanner, RouteRecord,
    DEFAULT_FOLLOWER_SPEED_MPS,
};
use std::time::{Duration, Instant};

const LAT: f64 = 60.17;
const LON: f64 = 24.94;

fn offset(east_m: f64, north_m: f64) -> GeoPoint {
    GeoPoint::new(
        LON + meters_to_lon(east_m, LAT),
        LAT + meters_to_lat(north_m, LAT),
        0.0,
    )
}

fn route(id: &str, points: Vec<GeoPoint>) -> RouteRecord {
    RouteRecord {
        id: id.to_string(),
        name: format!("Route {id}"),
        color: "CYAN".to_string(),
        description: None,
        points,
    }
}

/// A -> B -> C, 10 m apart.
fn abc() -> RouteRecord {
    route("abc", vec![offset(0.0, 0.0), offset(10.0, 0.0), offset(20.0, 0.0)])
}

struct UnreachableTerrain;

impl HeightProvider for UnreachableTerrain {
    async fn query_heights(&self, _points: &[Coordinate]) -> Result<Vec<f64>, HeightError> {
        Err(HeightError::Request("timed out".to_string()))
    }
}

#[tokio::test]
async fn single_route_yields_network_path_of_twenty_meters() {
    let planner = RoutePlanner::new(vec![abc()], PlannerConfig::default());
    let planned = planner
        .plan(&FlatTerrain::default(), &offset(0.0, 0.0), &offset(20.0, 0.0))
        .await
        .expect("route");

    assert_eq!(planned.mode(), PathMode::Network);
    assert!((planned.path.length_m() - 20.0).abs() < 0.1);
}

#[tokio::test]
async fn single_neighbor_splice_visits_every_node() {
    // With one splice edge per query point the only way across is the route.
    let planner = RoutePlanner::new(
        vec![abc()],
        PlannerConfig {
            nearest_neighbors: 1,
            ..PlannerConfig::default()
        },
    );
    let planned = planner
        .plan(&FlatTerrain::default(), &offset(-1.0, 0.5), &offset(21.0, 0.5))
        .await
        .expect("route");

    assert_eq!(planned.mode(), PathMode::Network);
    assert_eq!(planned.node_ids, vec!["abc:0", "abc:1", "abc:2"]);
    assert!((planned.path.length_m() - 20.0).abs() < 3.0);
}

#[tokio::test]
async fn empty_graph_falls_back_to_direct_line() {
    let planner = RoutePlanner::new(Vec::new(), PlannerConfig::default());
    let planned = planner
        .plan(&UnreachableTerrain, &offset(0.0, 0.0), &offset(500.0, 200.0))
        .await
        .expect("direct route never fails");

    assert_eq!(planned.mode(), PathMode::Direct);
    assert_eq!(planned.path.positions().len(), 49);
    assert!(planned.path.length_m() > 500.0);
}

#[tokio::test]
async fn identical_points_fail_even_without_graph() {
    let planner = RoutePlanner::new(Vec::new(), PlannerConfig::default());
    let result = planner
        .plan(&FlatTerrain::default(), &offset(5.0, 5.0), &offset(5.0, 5.0))
        .await;
    assert!(matches!(result, Err(PlanError::Degenerate)));
}

#[tokio::test]
async fn disjoint_routes_fall_back_to_direct_line() {
    let planner = RoutePlanner::new(
        vec![
            route("west", vec![offset(0.0, 0.0), offset(10.0, 0.0), offset(20.0, 0.0)]),
            route("east", vec![offset(2000.0, 0.0), offset(2010.0, 0.0), offset(2020.0, 0.0)]),
        ],
        PlannerConfig::default(),
    );
    let planned = planner
        .plan(&FlatTerrain::default(), &offset(-1.0, 0.0), &offset(2021.0, 0.0))
        .await
        .expect("route");
    assert_eq!(planned.mode(), PathMode::Direct);
    assert!(planned.node_ids.is_empty());
}

#[tokio::test]
async fn stored_routes_join_the_network_after_rebuild() {
    let planner = RoutePlanner::new(Vec::new(), PlannerConfig::default());
    let start = offset(0.0, 0.0);
    let end = offset(20.0, 0.0);

    let before = planner.plan(&FlatTerrain::default(), &start, &end).await.unwrap();
    assert_eq!(before.mode(), PathMode::Direct);

    planner.rebuild(&[abc()]);
    let after = planner.plan(&FlatTerrain::default(), &start, &end).await.unwrap();
    assert_eq!(after.mode(), PathMode::Network);
}

#[tokio::test]
async fn lengths_match_positions_for_both_modes() {
    let planner = RoutePlanner::new(vec![abc()], PlannerConfig::default());
    let network = planner
        .plan(&FlatTerrain::default(), &offset(1.0, 1.0), &offset(19.0, -1.0))
        .await
        .unwrap();
    let direct = RoutePlanner::new(Vec::new(), PlannerConfig::default())
        .plan(&FlatTerrain { height_m: 12.0 }, &offset(1.0, 1.0), &offset(300.0, -40.0))
        .await
        .unwrap();

    for planned in [network, direct] {
        let recomputed = path_length(planned.path.positions());
        assert!((planned.path.length_m() - recomputed).abs() < 1e-9);
    }
}

#[tokio::test]
async fn repeated_plans_have_equal_length() {
    let planner = RoutePlanner::new(
        vec![
            abc(),
            route("spur", vec![offset(10.0, 0.0), offset(10.0, 30.0)]),
        ],
        PlannerConfig::default(),
    );
    let start = offset(-2.0, 1.0);
    let end = offset(11.0, 29.0);
    let first = planner.plan(&FlatTerrain::default(), &start, &end).await.unwrap();
    let second = planner.plan(&FlatTerrain::default(), &start, &end).await.unwrap();
    assert_eq!(first.path.length_m(), second.path.length_m());
}

#[test]
fn graph_counts_for_many_routes() {
    let routes: Vec<RouteRecord> = (0..5)
        .map(|r| {
            let points = (0..(r + 2))
                .map(|i| offset(i as f64 * 15.0, r as f64 * 100.0))
                .collect();
            route(&format!("r{r}"), points)
        })
        .collect();
    let total_points: usize = routes.iter().map(|r| r.points.len()).sum();

    let graph = RouteGraph::build(&routes);
    assert_eq!(graph.node_count(), total_points);
    assert_eq!(graph.edge_count(), 2 * (total_points - routes.len()));
}

#[tokio::test]
async fn follower_completes_hundred_meter_path() {
    let planner = RoutePlanner::new(Vec::new(), PlannerConfig::default());
    let planned = planner
        .plan(&FlatTerrain::default(), &offset(0.0, 0.0), &offset(100.0, 0.0))
        .await
        .unwrap();
    assert!((planned.path.length_m() - 100.0).abs() < 0.5);

    let mut follower = PathFollower::new();
    let start = Instant::now();
    let positions = planned.path.positions().to_vec();
    assert!(follower.start(positions.clone(), DEFAULT_FOLLOWER_SPEED_MPS, start));

    let duration = follower.state().expect("running").duration();
    let expected = planned.path.length_m() / DEFAULT_FOLLOWER_SPEED_MPS;
    assert!((duration.as_secs_f64() - expected).abs() < 1e-6);

    let halfway = follower.tick(start + duration / 2).unwrap();
    assert!(!halfway.completed);

    let done = follower.tick(start + duration).unwrap();
    assert!(done.completed);
    assert_eq!(done.position, positions[positions.len() - 1]);
    assert!(follower.tick(start + duration + Duration::from_secs(1)).is_none());
}
