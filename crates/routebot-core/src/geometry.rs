//! Geometry helpers: Earth-fixed cartesian positions, distances and
//! arc-length utilities shared by the graph, the path finder and the follower.

use serde::{Deserialize, Serialize};

/// Vertical clearance (meters) added to every graph node, query point and
/// fallback sample so lines and markers stay above the ground surface.
pub const MARKER_CLEARANCE_M: f64 = 1.5;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// WGS84 ellipsoid
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Earth-centered, Earth-fixed position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cartesian3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert geodetic longitude/latitude (degrees) and ellipsoid height
    /// (meters) to an ECEF position on the WGS84 ellipsoid.
    pub fn from_degrees(lon: f64, lat: f64, height: f64) -> Self {
        let lambda = lon.to_radians();
        let phi = lat.to_radians();
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let sin_phi = phi.sin();
        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();

        Self {
            x: (n + height) * phi.cos() * lambda.cos(),
            y: (n + height) * phi.cos() * lambda.sin(),
            z: (n * (1.0 - e2) + height) * sin_phi,
        }
    }

    /// Straight-line (chord) distance in meters.
    pub fn distance(&self, other: &Cartesian3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Component-wise linear interpolation; `t = 0` yields `a`, `t = 1` yields `b`.
    pub fn lerp(a: &Cartesian3, b: &Cartesian3, t: f64) -> Cartesian3 {
        Cartesian3 {
            x: lerp(a.x, b.x, t),
            y: lerp(a.y, b.y, t),
            z: lerp(a.z, b.z, t),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Length of each consecutive segment; one entry fewer than `positions`.
pub fn segment_lengths(positions: &[Cartesian3]) -> Vec<f64> {
    positions
        .windows(2)
        .map(|pair| pair[0].distance(&pair[1]))
        .collect()
}

/// Total arc length of a polyline in meters. Zero for fewer than two positions.
pub fn path_length(positions: &[Cartesian3]) -> f64 {
    segment_lengths(positions).iter().sum()
}

/// Calculate distance between two points in meters using Haversine formula.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    let meters_per_deg = meters_per_deg_lat(ref_lat_deg).max(1e-9);
    meters / meters_per_deg
}

/// Convert an east/west offset in meters to degrees longitude.
/// Requires the reference latitude for proper scaling.
pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    let meters_per_deg = meters_per_deg_lon(ref_lat_deg).max(1e-9);
    meters / meters_per_deg
}
