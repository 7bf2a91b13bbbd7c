//! Application state: route store, planner, follower.

use crate::config::Config;
use crate::loops::follower_loop::run_follower_loop;
use crate::persistence::{routes as routes_db, Database};
use crate::terrain::OpenMeteoHeights;
use routebot_core::{
    clamp_to_ground, Cartesian3, FollowerSnapshot, FollowerTick, GeoPoint, PathFollower, PlanError, PlannedRoute,
    RouteGraph, RoutePlanner, RouteRecord,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

const TICK_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RouteStoreError {
    #[error("route {0} not found")]
    NotFound(String),
    #[error("route {0} comes from the configuration file and is read-only")]
    ReadOnly(String),
    #[error("route {0} has non-finite coordinates")]
    InvalidPoints(String),
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// Application state shared by handlers and background tasks.
pub struct AppState {
    config: Config,
    db: Option<Database>,
    planner: RoutePlanner,
    heights: OpenMeteoHeights,
    stored_routes: RwLock<Vec<RouteRecord>>,
    follower: Arc<Mutex<PathFollower>>,
    follower_task: Mutex<Option<JoinHandle<()>>>,
    plan_lock: tokio::sync::Mutex<()>,
    pub tx: broadcast::Sender<FollowerTick>,
}

impl AppState {
    /// State without persistence; stored routes live only in memory.
    pub fn new(config: Config, config_routes: Vec<RouteRecord>) -> Self {
        let (tx, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
        let heights = OpenMeteoHeights::new(reqwest::Client::new(), &config);
        Self {
            planner: RoutePlanner::new(config_routes, config.planner_config()),
            heights,
            config,
            db: None,
            stored_routes: RwLock::new(Vec::new()),
            follower: Arc::new(Mutex::new(PathFollower::new())),
            follower_task: Mutex::new(None),
            plan_lock: tokio::sync::Mutex::new(()),
            tx,
        }
    }

    pub fn with_database(db: Database, config: Config, config_routes: Vec<RouteRecord>) -> Self {
        let mut state = Self::new(config, config_routes);
        state.db = Some(db);
        state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> Arc<RouteGraph> {
        self.planner.snapshot()
    }

    /// Load stored routes from the database and rebuild the graph.
    pub async fn load_from_database(&self) -> anyhow::Result<usize> {
        let Some(db) = &self.db else {
            return Ok(0);
        };
        let loaded = routes_db::load_all_routes(db.pool()).await?;
        let count = loaded.len();
        let mut stored = self.stored_routes.write().await;
        *stored = loaded;
        self.planner.rebuild(&stored);
        tracing::info!("Loaded {} stored routes from database", count);
        Ok(count)
    }

    /// Configuration routes followed by stored routes.
    pub async fn all_routes(&self) -> Vec<RouteRecord> {
        let stored = self.stored_routes.read().await;
        self.planner
            .config_routes()
            .iter()
            .chain(stored.iter())
            .cloned()
            .collect()
    }

    pub async fn stored_routes(&self) -> Vec<RouteRecord> {
        self.stored_routes.read().await.clone()
    }

    pub async fn get_route(&self, id: &str) -> Option<RouteRecord> {
        if let Some(route) = self.planner.config_routes().iter().find(|r| r.id == id) {
            return Some(route.clone());
        }
        let stored = self.stored_routes.read().await;
        stored.iter().find(|r| r.id == id).cloned()
    }

    fn is_config_route(&self, id: &str) -> bool {
        self.planner.config_routes().iter().any(|r| r.id == id)
    }

    /// Create or replace a stored route, persist it and rebuild the graph.
    /// An empty id is replaced by a fresh uuid.
    pub async fn upsert_route(&self, mut route: RouteRecord) -> Result<RouteRecord, RouteStoreError> {
        if route.id.trim().is_empty() {
            route.id = uuid::Uuid::new_v4().to_string();
        }
        if self.is_config_route(&route.id) {
            return Err(RouteStoreError::ReadOnly(route.id));
        }
        if !route.points.iter().all(GeoPoint::is_finite) {
            return Err(RouteStoreError::InvalidPoints(route.id));
        }

        let mut stored = self.stored_routes.write().await;
        if let Some(db) = &self.db {
            routes_db::upsert_route(db.pool(), &route).await?;
        }
        match stored.iter_mut().find(|r| r.id == route.id) {
            Some(existing) => *existing = route.clone(),
            None => stored.push(route.clone()),
        }
        self.planner.rebuild(&stored);
        tracing::info!("Saved route '{}' ({}, {} points)", route.name, route.id, route.points.len());
        Ok(route)
    }

    /// Replace every stored route.
    pub async fn replace_routes(&self, routes: Vec<RouteRecord>) -> Result<usize, RouteStoreError> {
        let mut routes = routes;
        for route in routes.iter_mut() {
            if route.id.trim().is_empty() {
                route.id = uuid::Uuid::new_v4().to_string();
            }
            if self.is_config_route(&route.id) {
                return Err(RouteStoreError::ReadOnly(route.id.clone()));
            }
            if !route.points.iter().all(GeoPoint::is_finite) {
                return Err(RouteStoreError::InvalidPoints(route.id.clone()));
            }
        }

        let mut stored = self.stored_routes.write().await;
        if let Some(db) = &self.db {
            routes_db::save_routes(db.pool(), &routes).await?;
        }
        let count = routes.len();
        *stored = routes;
        self.planner.rebuild(&stored);
        tracing::info!("Replaced stored routes ({} routes)", count);
        Ok(count)
    }

    pub async fn delete_route(&self, id: &str) -> Result<(), RouteStoreError> {
        if self.is_config_route(id) {
            return Err(RouteStoreError::ReadOnly(id.to_string()));
        }

        let mut stored = self.stored_routes.write().await;
        let Some(index) = stored.iter().position(|r| r.id == id) else {
            return Err(RouteStoreError::NotFound(id.to_string()));
        };
        if let Some(db) = &self.db {
            routes_db::delete_route(db.pool(), id).await?;
        }
        stored.remove(index);
        self.planner.rebuild(&stored);
        tracing::info!("Deleted route {}", id);
        Ok(())
    }

    /// Plan between two points. Both points are first dropped onto the
    /// ground; when the height service fails they keep the given heights.
    /// At most one plan runs at a time; a successful plan replaces the
    /// current follower run.
    pub async fn plan(
        &self,
        start: &GeoPoint,
        end: &GeoPoint,
        follow: bool,
    ) -> Result<PlannedRoute, PlanError> {
        let _guard = self.plan_lock.lock().await;
        let [start, end] = <[GeoPoint; 2]>::try_from(
            clamp_to_ground(&self.heights, &[*start, *end]).await,
        )
        .unwrap_or([*start, *end]);
        let planned = self.planner.plan(&self.heights, &start, &end).await?;

        if follow {
            self.start_follower(planned.path.positions().to_vec());
        } else {
            self.stop_follower();
        }
        Ok(planned)
    }

    /// Start a follower run over `positions`, replacing any current run.
    /// Returns the new run id, or `None` when there was nothing to follow.
    pub fn start_follower(&self, positions: Vec<Cartesian3>) -> Option<u64> {
        self.abort_follower_task();

        let run_id = {
            let Ok(mut follower) = self.follower.lock() else {
                return None;
            };
            if !follower.start(positions, self.config.follower_speed_mps, Instant::now()) {
                return None;
            }
            follower.run_id()
        };

        let handle = tokio::spawn(run_follower_loop(
            self.follower.clone(),
            self.tx.clone(),
            Duration::from_millis(self.config.follower_tick_ms.max(1)),
            run_id,
        ));
        if let Ok(mut task) = self.follower_task.lock() {
            *task = Some(handle);
        }
        Some(run_id)
    }

    /// Stop the current follower run. Returns whether one was running.
    pub fn stop_follower(&self) -> bool {
        self.abort_follower_task();
        match self.follower.lock() {
            Ok(mut follower) => follower.stop(),
            Err(_) => false,
        }
    }

    pub fn follower_snapshot(&self) -> FollowerSnapshot {
        match self.follower.lock() {
            Ok(follower) => follower.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    fn abort_follower_task(&self) {
        if let Ok(mut task) = self.follower_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}
