//! Result types returned to callers: per-receiver spectra with weighted
//! overall levels, plus optional per-path detail for visualization.

use serde::{Deserialize, Serialize};

use noisemap_acoustics::geometry::{Point2D, Point3D};
use noisemap_acoustics::spectrum::{Spectrum9, NUM_BANDS};
use noisemap_acoustics::tracer::PathKind;

/// What happened at a waypoint, for map overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Reflection,
    Diffraction,
}

/// An interaction point along a traced path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: Point3D,
    pub kind: MarkerKind,
}

/// One traced path annotated with per-band contribution levels. Only
/// produced when `ComputeConfig::include_paths` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDetail {
    /// Index into the scene's source list.
    pub source: usize,
    pub kind: PathKind,
    /// Plan-view projection of the waypoints, for 2D map rendering.
    pub polyline: Vec<Point2D>,
    pub waypoints: Vec<Point3D>,
    pub markers: Vec<Marker>,
    /// Contribution of this path alone, dB SPL per band.
    pub band_levels: [f64; NUM_BANDS],
    /// Arrival phase per band, radians.
    pub band_phases: [f64; NUM_BANDS],
    pub total_distance: f64,
    pub path_difference: f64,
    pub valid: bool,
}

/// Levels at one receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverResult {
    pub position: Point3D,
    /// Unweighted band levels, dB SPL.
    pub spectrum: Spectrum9,
    /// A-weighted overall level, dB(A).
    pub laeq: f64,
    /// C-weighted overall level, dB(C).
    pub lceq: f64,
    /// Unweighted overall level, dB(Z).
    pub lzeq: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<PathDetail>>,
}

impl PathDetail {
    /// Markers for each interior waypoint, classified by the path kind.
    pub(crate) fn markers_for(kind: &PathKind, waypoints: &[Point3D]) -> Vec<Marker> {
        let marker_kind = if kind.is_diffraction() {
            MarkerKind::Diffraction
        } else {
            MarkerKind::Reflection
        };
        if waypoints.len() <= 2 {
            return Vec::new();
        }
        waypoints[1..waypoints.len() - 1]
            .iter()
            .map(|&position| Marker {
                position,
                kind: marker_kind,
            })
            .collect()
    }
}
