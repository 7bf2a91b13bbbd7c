//! Ground heights from the Open-Meteo elevation API.

use crate::cache::{prune_cache, CacheEntry};
use crate::config::Config;
use dashmap::DashMap;
use reqwest::Client;
use routebot_core::{Coordinate, HeightError, HeightProvider};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Cache key resolution: 1e-5 degrees, about a metre.
const KEY_SCALE: f64 = 1e5;

#[derive(Debug, Clone, Copy)]
struct HeightCacheEntry {
    fetched_at: Instant,
    height_m: f64,
}

impl CacheEntry for HeightCacheEntry {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

type PointKey = (i64, i64);

#[derive(Debug, Deserialize)]
struct OpenMeteoElevationResponse {
    elevation: Option<Vec<f64>>,
}

/// Batched height lookups with a per-point cache.
#[derive(Debug)]
pub struct OpenMeteoHeights {
    client: Client,
    base_url: String,
    timeout: Duration,
    max_points_per_request: usize,
    cache_ttl: Duration,
    cache_max_entries: usize,
    cache: DashMap<PointKey, HeightCacheEntry>,
}

impl OpenMeteoHeights {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.terrain_provider_url.trim().to_string(),
            timeout: Duration::from_secs(config.terrain_request_timeout_s.max(1)),
            max_points_per_request: config.terrain_max_points_per_request.max(1),
            cache_ttl: Duration::from_secs(config.terrain_cache_ttl_s.max(30)),
            cache_max_entries: config.terrain_cache_max_entries.max(1),
            cache: DashMap::new(),
        }
    }

    pub fn cached_points(&self) -> usize {
        self.cache.len()
    }

    fn cached_height(&self, key: &PointKey) -> Option<f64> {
        let entry = self.cache.get(key)?;
        if entry.fetched_at.elapsed() > self.cache_ttl {
            return None;
        }
        Some(entry.height_m)
    }

    fn remember(&self, key: PointKey, height_m: f64) {
        self.cache.insert(
            key,
            HeightCacheEntry {
                fetched_at: Instant::now(),
                height_m,
            },
        );
    }

    async fn fetch_chunk(&self, chunk: &[Coordinate]) -> Result<Vec<f64>, HeightError> {
        let latitudes: Vec<f64> = chunk.iter().map(|c| c.lat).collect();
        let longitudes: Vec<f64> = chunk.iter().map(|c| c.lon).collect();
        let url = build_provider_url(
            &self.base_url,
            &join_params(&latitudes),
            &join_params(&longitudes),
        );

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| HeightError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(HeightError::Request(format!(
                "terrain provider HTTP {}",
                response.status()
            )));
        }

        let payload: OpenMeteoElevationResponse = response
            .json()
            .await
            .map_err(|err| HeightError::Request(err.to_string()))?;
        let heights = payload
            .elevation
            .ok_or_else(|| HeightError::Request("terrain provider missing elevation".to_string()))?;

        if heights.len() != chunk.len() {
            return Err(HeightError::SampleCount {
                expected: chunk.len(),
                got: heights.len(),
            });
        }
        Ok(heights)
    }
}

impl HeightProvider for OpenMeteoHeights {
    async fn query_heights(&self, points: &[Coordinate]) -> Result<Vec<f64>, HeightError> {
        if self.base_url.is_empty() {
            return Err(HeightError::NotConfigured);
        }

        let keys: Vec<PointKey> = points.iter().map(point_key).collect();
        let mut heights: Vec<Option<f64>> = keys.iter().map(|k| self.cached_height(k)).collect();

        let missing: Vec<usize> = (0..points.len()).filter(|&i| heights[i].is_none()).collect();
        if !missing.is_empty() {
            tracing::debug!(
                "Fetching {} of {} terrain heights ({} cached)",
                missing.len(),
                points.len(),
                points.len() - missing.len()
            );
        }

        for indices in missing.chunks(self.max_points_per_request) {
            let chunk: Vec<Coordinate> = indices.iter().map(|&i| points[i]).collect();
            let fetched = self.fetch_chunk(&chunk).await?;
            for (&idx, height) in indices.iter().zip(fetched) {
                // non-finite values are passed through and never cached
                if height.is_finite() {
                    self.remember(keys[idx], height);
                }
                heights[idx] = Some(height);
            }
        }

        if !missing.is_empty() && self.cache.len() > self.cache_max_entries {
            let removed = prune_cache(&self.cache, self.cache_max_entries, self.cache_ttl);
            tracing::debug!("Pruned {} terrain cache entries", removed);
        }

        Ok(heights.into_iter().map(|h| h.unwrap_or(f64::NAN)).collect())
    }
}

fn point_key(coordinate: &Coordinate) -> PointKey {
    (
        (coordinate.lat * KEY_SCALE).round() as i64,
        (coordinate.lon * KEY_SCALE).round() as i64,
    )
}

fn join_params(values: &[f64]) -> String {
    let mut buf = String::new();
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            buf.push(',');
        }
        buf.push_str(&format!("{:.6}", value));
    }
    buf
}

fn build_provider_url(base: &str, latitudes: &str, longitudes: &str) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!(
        "{}{}latitude={}&longitude={}",
        base, separator, latitudes, longitudes
    )
}
