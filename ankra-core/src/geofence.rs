//! Geofence evaluation
//!
//! Computes distance and bearing from the anchor and decides containment
//! against the allowed circle, optionally narrowed to a pie-slice sector.
//! Deterministic and side-effect-free apart from logging a contained
//! sector-polygon failure.

use crate::error::ContainmentFailure;
use crate::geo::{
    deg_to_rad, destination_from, distance_meters, fold_angle, rhumb_bearing_rad, Position,
};
use crate::types::AnchorConfig;
use log::warn;
use serde::{Deserialize, Serialize};

/// Arc sampling step for the sector polygon, degrees. At anchor-watch
/// radii the chord error is far below GPS noise.
const ARC_STEP_DEG: f64 = 5.0;

/// Result of one geofence evaluation. Ephemeral; recomputed every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Distance from the bow to the anchor in meters
    pub distance_m: f64,
    /// True bearing from the bow to the anchor, radians `[0, 2π)`
    pub bearing_true_rad: f64,
    /// Bow-relative bearing in `(-π, π]`, positive to starboard.
    /// Absent when no heading is known. Display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apparent_bearing_rad: Option<f64>,
    /// Whether the vessel is inside the allowed area
    pub within_area: bool,
}

/// Evaluate the vessel position against the anchor configuration.
///
/// When both a true heading and a bow offset are known, the GPS antenna
/// position is projected forward to the bow first so distance and bearing
/// are measured from the bow roller rather than the antenna.
///
/// A sector-polygon failure never disables the alarm: the evaluation
/// falls back to the plain radius check for that cycle only.
pub fn evaluate(vessel: &Position, heading_rad: Option<f64>, config: &AnchorConfig) -> Evaluation {
    let bow = match heading_rad {
        Some(heading) if config.bow_offset_m > 0.0 => {
            destination_from(vessel, heading, config.bow_offset_m)
        }
        _ => *vessel,
    };

    let distance_m = distance_meters(&bow, &config.position);
    let bearing_true_rad = rhumb_bearing_rad(&bow, &config.position);
    let apparent_bearing_rad = heading_rad.map(|heading| fold_angle(bearing_true_rad - heading));

    // Non-strict: distance == radius counts as contained, flicker at the
    // exact boundary is allowed by contract.
    let within_radius = distance_m <= config.radius_m;

    let within_area = match &config.sector {
        None => within_radius,
        Some(sector) => {
            match compute_containment(&bow, &config.position, config.radius_m, sector) {
                Ok(in_sector) => within_radius && in_sector,
                Err(e) => {
                    warn!("Sector containment failed ({}), falling back to radius check", e);
                    within_radius
                }
            }
        }
    };

    Evaluation {
        distance_m,
        bearing_true_rad,
        apparent_bearing_rad,
        within_area,
    }
}

/// Test a point against the pie-slice polygon spanned by `sector` around
/// `anchor`.
///
/// Numerical problems are explicit errors rather than a silent answer, so
/// the caller can apply its fail-safe fallback.
pub fn compute_containment(
    point: &Position,
    anchor: &Position,
    radius_m: f64,
    sector: &crate::types::Sector,
) -> Result<bool, ContainmentFailure> {
    if !point.is_valid()
        || !anchor.is_valid()
        || !radius_m.is_finite()
        || !sector.orientation_deg.is_finite()
        || !sector.width_deg.is_finite()
    {
        return Err(ContainmentFailure::NonFiniteInput);
    }

    let polygon = sector_polygon(anchor, radius_m, sector)?;
    Ok(point_in_polygon(point, &polygon))
}

/// Build the pie-slice polygon: the anchor apex plus the arc from
/// `orientation - width/2` to `orientation + width/2` sampled every
/// [`ARC_STEP_DEG`], both edge rays included.
fn sector_polygon(
    anchor: &Position,
    radius_m: f64,
    sector: &crate::types::Sector,
) -> Result<Vec<Position>, ContainmentFailure> {
    let start = sector.orientation_deg - sector.width_deg / 2.0;
    let end = sector.orientation_deg + sector.width_deg / 2.0;

    let mut polygon = vec![*anchor];
    let mut bearing = start;
    while bearing < end {
        polygon.push(destination_from(anchor, deg_to_rad(bearing), radius_m));
        bearing += ARC_STEP_DEG;
    }
    polygon.push(destination_from(anchor, deg_to_rad(end), radius_m));

    if polygon.len() < 3 || polygon.iter().any(|p| !p.is_valid()) {
        return Err(ContainmentFailure::DegeneratePolygon);
    }
    Ok(polygon)
}

/// Even-odd point-in-polygon test in the lat/lon plane, with points on a
/// polygon edge counted as inside. Adequate for the small, local polygons
/// an anchor watch produces.
fn point_in_polygon(point: &Position, polygon: &[Position]) -> bool {
    let px = point.longitude;
    let py = point.latitude;

    // Boundary points (e.g. a vessel exactly on a sector edge ray) must
    // count as contained; the ray cast alone is unreliable there.
    let n = polygon.len();
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        if point_on_segment(px, py, a, b) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i].longitude, polygon[i].latitude);
        let (xj, yj) = (polygon[j].longitude, polygon[j].latitude);
        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Whether (px, py) lies on the segment a-b within ~1e-6 degrees
/// perpendicular distance (roughly a decimeter).
fn point_on_segment(px: f64, py: f64, a: &Position, b: &Position) -> bool {
    const EPS_DEG: f64 = 1e-6;

    let dx = b.longitude - a.longitude;
    let dy = b.latitude - a.latitude;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (px - a.longitude).abs() < EPS_DEG && (py - a.latitude).abs() < EPS_DEG;
    }

    let t = ((px - a.longitude) * dx + (py - a.latitude) * dy) / len_sq;
    if !(-1e-9..=1.0 + 1e-9).contains(&t) {
        return false;
    }

    let cross = dx * (py - a.latitude) - dy * (px - a.longitude);
    (cross.abs() / len_sq.sqrt()) < EPS_DEG
}
