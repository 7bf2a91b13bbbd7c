//! Server configuration from environment.

use routebot_core::{PlannerConfig, DEFAULT_FOLLOWER_SPEED_MPS};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// JSON file with the configuration routes (bare array or `{ "routes": [...] }`).
    pub routes_config_path: Option<String>,
    pub terrain_provider_url: String,
    pub terrain_request_timeout_s: u64,
    pub terrain_max_points_per_request: usize,
    pub terrain_cache_ttl_s: u64,
    pub terrain_cache_max_entries: usize,
    pub follower_speed_mps: f64,
    pub follower_tick_ms: u64,
    pub nearest_neighbors: usize,
    pub terrain_samples: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let planner = PlannerConfig::default();
        Self {
            server_port: parse_var("ROUTEBOT_PORT").unwrap_or(3000),
            database_path: env::var("ROUTEBOT_DB_PATH")
                .unwrap_or_else(|_| "data/routebot.db".to_string()),
            database_max_connections: parse_var("ROUTEBOT_DB_MAX_CONNECTIONS").unwrap_or(5),
            routes_config_path: env::var("ROUTEBOT_ROUTES_CONFIG")
                .ok()
                .filter(|path| !path.trim().is_empty()),
            terrain_provider_url: env::var("ROUTEBOT_TERRAIN_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/elevation".to_string()),
            terrain_request_timeout_s: parse_var("ROUTEBOT_TERRAIN_TIMEOUT_S").unwrap_or(5),
            terrain_max_points_per_request: parse_var("ROUTEBOT_TERRAIN_MAX_POINTS")
                .unwrap_or(100),
            terrain_cache_ttl_s: parse_var("ROUTEBOT_TERRAIN_CACHE_TTL_S").unwrap_or(3600),
            terrain_cache_max_entries: parse_var("ROUTEBOT_TERRAIN_CACHE_MAX_ENTRIES")
                .unwrap_or(50_000),
            follower_speed_mps: parse_var("ROUTEBOT_FOLLOWER_SPEED_MPS")
                .filter(|speed: &f64| speed.is_finite() && *speed > 0.0)
                .unwrap_or(DEFAULT_FOLLOWER_SPEED_MPS),
            follower_tick_ms: parse_var("ROUTEBOT_FOLLOWER_TICK_MS").unwrap_or(50),
            nearest_neighbors: parse_var("ROUTEBOT_NEAREST_NEIGHBORS")
                .unwrap_or(planner.nearest_neighbors),
            terrain_samples: parse_var("ROUTEBOT_TERRAIN_SAMPLES")
                .unwrap_or(planner.terrain_samples),
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            nearest_neighbors: self.nearest_neighbors,
            terrain_samples: self.terrain_samples,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
