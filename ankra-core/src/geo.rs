//! Geographic primitives
//!
//! Haversine distance, rhumb-line bearing and spherical projection on a
//! spherical Earth model. All angles are radians unless a name says
//! otherwise; positions are degrees.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, matching the value used by the
/// navigation data sources we interoperate with.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic position snapshot. Immutable by convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Latitude in degrees, positive north
    pub latitude: f64,
    /// Longitude in degrees, positive east
    pub longitude: f64,
    /// Altitude in meters above the geoid, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Position {
            latitude,
            longitude,
            altitude: None,
        }
    }

    /// True if both coordinates are finite and within their legal ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Convert degrees to radians
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * (std::f64::consts::PI / 180.0)
}

/// Convert radians to degrees
pub fn rad_to_deg(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Euclidean modulo: the result is always in `[0, modulus)` even for
/// negative input.
pub fn normalize_angle(x: f64, modulus: f64) -> f64 {
    x - modulus * (x / modulus).floor()
}

/// Fold an angle into `(-π, π]`.
///
/// Used for apparent (bow-relative) bearings where 0 is dead ahead.
pub fn fold_angle(x: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let a = normalize_angle(x, two_pi);
    if a > std::f64::consts::PI {
        a - two_pi
    } else {
        a
    }
}

/// Great-circle distance between two positions in meters (haversine).
pub fn distance_meters(a: &Position, b: &Position) -> f64 {
    let d_lat = deg_to_rad(b.latitude - a.latitude);
    let d_lon = deg_to_rad(b.longitude - a.longitude);
    let h = (d_lat / 2.0).sin().powi(2)
        + deg_to_rad(a.latitude).cos() * deg_to_rad(b.latitude).cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Bearing along the rhumb line from `from` to `to`, in `[0, 2π)`.
/// 0 is true north, increasing clockwise.
pub fn rhumb_bearing_rad(from: &Position, to: &Position) -> f64 {
    let lat1 = deg_to_rad(from.latitude);
    let lat2 = deg_to_rad(to.latitude);
    let mut d_lon = deg_to_rad(to.longitude - from.longitude);

    // Mercator-projected latitude difference
    let d_psi = ((std::f64::consts::FRAC_PI_4 + lat2 / 2.0).tan()
        / (std::f64::consts::FRAC_PI_4 + lat1 / 2.0).tan())
    .ln();

    // Take the shorter way around the antimeridian
    if d_lon.abs() > std::f64::consts::PI {
        d_lon = if d_lon > 0.0 {
            d_lon - 2.0 * std::f64::consts::PI
        } else {
            d_lon + 2.0 * std::f64::consts::PI
        };
    }

    normalize_angle(d_lon.atan2(d_psi), 2.0 * std::f64::consts::PI)
}

/// Project `origin` along `heading_rad` (true, clockwise from north) by
/// `distance_m` meters on the sphere.
///
/// Inverts [`distance_meters`] to within floating point for distances
/// small relative to the Earth radius.
pub fn destination_from(origin: &Position, heading_rad: f64, distance_m: f64) -> Position {
    let delta = distance_m / EARTH_RADIUS_M;
    let lat1 = deg_to_rad(origin.latitude);
    let lon1 = deg_to_rad(origin.longitude);

    let lat2 =
        (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * heading_rad.cos()).asin();
    let lon2 = lon1
        + (heading_rad.sin() * delta.sin() * lat1.cos())
            .atan2(delta.cos() - lat1.sin() * lat2.sin());

    Position {
        latitude: rad_to_deg(lat2),
        // Keep longitude in [-180, 180)
        longitude: normalize_angle(rad_to_deg(lon2) + 180.0, 360.0) - 180.0,
        altitude: origin.altitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_distance_zero_for_same_point() {
        let a = Position::new(37.8, -122.4);
        assert_eq!(distance_meters(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Position::new(37.8, -122.4);
        let b = Position::new(37.9, -122.3);
        let ab = distance_meters(&a, &b);
        let ba = distance_meters(&b, &a);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_distance_one_degree_longitude_at_equator() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.0, 1.0);
        let d = distance_meters(&a, &b);
        assert!((d - 111_194.9).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_normalize_angle_negative_input() {
        assert!((normalize_angle(-90.0, 360.0) - 270.0).abs() < 1e-12);
        assert!((normalize_angle(-0.5, 2.0 * PI) - (2.0 * PI - 0.5)).abs() < 1e-12);
        assert_eq!(normalize_angle(0.0, 360.0), 0.0);
        assert!((normalize_angle(725.0, 360.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_fold_angle_range() {
        assert!((fold_angle(PI) - PI).abs() < 1e-12);
        assert!((fold_angle(-PI) - PI).abs() < 1e-12);
        assert!((fold_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!(fold_angle(0.1).abs() - 0.1 < 1e-12);
    }

    #[test]
    fn test_rhumb_bearing_cardinal_directions() {
        let origin = Position::new(10.0, 10.0);
        let north = Position::new(11.0, 10.0);
        let east = Position::new(10.0, 11.0);
        let south = Position::new(9.0, 10.0);

        assert!(rhumb_bearing_rad(&origin, &north).abs() < 1e-9);
        assert!((rhumb_bearing_rad(&origin, &east) - PI / 2.0).abs() < 1e-3);
        assert!((rhumb_bearing_rad(&origin, &south) - PI).abs() < 1e-9);
    }

    #[test]
    fn test_destination_inverts_distance() {
        let origin = Position::new(59.9, 10.7);
        for heading_deg in [0.0, 45.0, 133.0, 270.0] {
            let dest = destination_from(&origin, deg_to_rad(heading_deg), 150.0);
            let d = distance_meters(&origin, &dest);
            assert!((d - 150.0).abs() < 0.01, "heading {}: {}", heading_deg, d);
        }
    }

    #[test]
    fn test_destination_bearing_round_trip() {
        let origin = Position::new(0.0, 0.0);
        let dest = destination_from(&origin, deg_to_rad(45.0), 100.0);
        let bearing = rhumb_bearing_rad(&origin, &dest);
        assert!((bearing - deg_to_rad(45.0)).abs() < 1e-4);
    }

    #[test]
    fn test_position_validity() {
        assert!(Position::new(0.0, 0.0).is_valid());
        assert!(Position::new(-90.0, 180.0).is_valid());
        assert!(!Position::new(91.0, 0.0).is_valid());
        assert!(!Position::new(f64::NAN, 0.0).is_valid());
        assert!(!Position::new(0.0, 200.0).is_valid());
    }
}
