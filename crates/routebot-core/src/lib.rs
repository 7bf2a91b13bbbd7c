//! Routebot core: route graph, path finding, terrain fallback and path
//! following for point-to-point planning over authored routes.

pub mod follower;
pub mod geometry;
pub mod graph;
pub mod models;
pub mod pathfinder;
pub mod planner;
pub mod terrain;

pub use follower::{
    FollowerSnapshot, FollowerState, FollowerStatus, FollowerTick, PathFollower,
    DEFAULT_FOLLOWER_SPEED_MPS,
};
pub use geometry::{haversine_distance, path_length, Cartesian3, MARKER_CLEARANCE_M};
pub use graph::{GraphEdge, GraphNode, RouteGraph};
pub use models::{parse_route_list, Coordinate, GeoPoint, PathMode, PathResult, RouteRecord};
pub use pathfinder::{find_nearest, NearestNode, NetworkRoute, PathFinder, SearchContext};
pub use planner::{PlanError, PlannedRoute, PlannerConfig, RoutePlanner};
pub use terrain::{build_direct_line, clamp_to_ground, FlatTerrain, HeightError, HeightProvider};
