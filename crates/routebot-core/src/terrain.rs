//! Terrain-sampled straight-line fallback.

use crate::geometry::{lerp, Cartesian3, MARKER_CLEARANCE_M};
use crate::models::{Coordinate, GeoPoint, PathMode, PathResult};
use std::future::Future;
use thiserror::Error;

pub const DEFAULT_TERRAIN_SAMPLES: usize = 48;

#[derive(Debug, Error)]
pub enum HeightError {
    #[error("height provider is not configured")]
    NotConfigured,
    #[error("height request failed: {0}")]
    Request(String),
    #[error("height provider returned {got} samples for {expected} points")]
    SampleCount { expected: usize, got: usize },
}

/// Ground height lookup for a batch of coordinates.
///
/// Implementations return one height (meters) per input coordinate, in the
/// same order, or fail for the whole batch.
pub trait HeightProvider {
    fn query_heights(
        &self,
        points: &[Coordinate],
    ) -> impl Future<Output = Result<Vec<f64>, HeightError>> + Send;
}

/// Constant ground height everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain {
    pub height_m: f64,
}

impl HeightProvider for FlatTerrain {
    async fn query_heights(&self, points: &[Coordinate]) -> Result<Vec<f64>, HeightError> {
        Ok(vec![self.height_m; points.len()])
    }
}

/// Sample `samples + 1` evenly spaced points between `start` and `end`, look
/// up their ground height and lift them by the marker clearance.
///
/// A failed height query never aborts the line: every point falls back to
/// the height interpolated between the endpoints.
pub async fn build_direct_line<P>(
    provider: &P,
    start: &GeoPoint,
    end: &GeoPoint,
    samples: usize,
) -> PathResult
where
    P: HeightProvider,
{
    let samples = samples.max(1);
    let sampled: Vec<GeoPoint> = (0..=samples)
        .map(|i| {
            let t = i as f64 / samples as f64;
            GeoPoint::new(
                lerp(start.lon, end.lon, t),
                lerp(start.lat, end.lat, t),
                lerp(start.height, end.height, t),
            )
        })
        .collect();
    let coordinates: Vec<Coordinate> = sampled.iter().map(GeoPoint::coordinate).collect();

    let ground = match provider.query_heights(&coordinates).await {
        Ok(heights) if heights.len() == sampled.len() => Some(heights),
        Ok(heights) => {
            let err = HeightError::SampleCount {
                expected: sampled.len(),
                got: heights.len(),
            };
            tracing::warn!("Terrain samples failed, falling back to straight line: {}", err);
            None
        }
        Err(err) => {
            tracing::warn!("Terrain samples failed, falling back to straight line: {}", err);
            None
        }
    };

    let positions: Vec<Cartesian3> = sampled
        .iter()
        .enumerate()
        .map(|(idx, point)| {
            let height = ground
                .as_ref()
                .and_then(|heights| heights.get(idx).copied())
                .filter(|h| h.is_finite())
                .unwrap_or(point.height);
            Cartesian3::from_degrees(point.lon, point.lat, height + MARKER_CLEARANCE_M)
        })
        .collect();

    PathResult::new(positions, PathMode::Direct)
}

/// Replace each point's height with the ground height beneath it.
///
/// One batch query. When it fails, the given heights are kept; a single
/// non-finite sample keeps that point's height.
pub async fn clamp_to_ground<P>(provider: &P, points: &[GeoPoint]) -> Vec<GeoPoint>
where
    P: HeightProvider,
{
    let coordinates: Vec<Coordinate> = points.iter().map(GeoPoint::coordinate).collect();
    let ground = match provider.query_heights(&coordinates).await {
        Ok(heights) if heights.len() == points.len() => heights,
        Ok(heights) => {
            let err = HeightError::SampleCount {
                expected: points.len(),
                got: heights.len(),
            };
            tracing::warn!("Ground clamp failed, using picked height: {}", err);
            return points.to_vec();
        }
        Err(err) => {
            tracing::warn!("Ground clamp failed, using picked height: {}", err);
            return points.to_vec();
        }
    };

    points
        .iter()
        .zip(ground)
        .map(|(point, height)| {
            if height.is_finite() {
                GeoPoint::new(point.lon, point.lat, height)
            } else {
                *point
            }
        })
        .collect()
}
