//! Path tracer: enumerates candidate propagation paths between one source
//! and one receiver given the batch's reflecting/diffracting surfaces and
//! building footprints.
//!
//! Produced paths are terminal values. Geometrically impossible candidates
//! (reflection point above the wall top, underground, beyond the distance
//! limit, blocked legs) are returned with `valid = false` so downstream
//! summation can exclude them; nothing is raised as an error.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::geometry::{
    cross2, find_visible_corners, is_path_blocked, segment_intersection, segment_polygon_crossing,
    Point2D, Point3D,
};
use crate::surface::{ReflectingSurface, SurfaceRole};
use crate::{DIFFRACTION_PHASE, EPSILON};

/// Which physical mechanism a ray path represents, with the geometry that
/// mechanism pivots on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PathKind {
    Direct,
    Ground { reflection: Point3D },
    Wall { reflection: Point3D },
    Diffracted { edge: Point3D },
    Roof { entry: Point3D, exit: Point3D },
    CornerLeft { corner: Point3D },
    CornerRight { corner: Point3D },
}

impl PathKind {
    /// Paths that pass over or around an obstacle edge and therefore take
    /// barrier attenuation.
    pub fn is_diffraction(&self) -> bool {
        matches!(
            self,
            PathKind::Diffracted { .. }
                | PathKind::Roof { .. }
                | PathKind::CornerLeft { .. }
                | PathKind::CornerRight { .. }
        )
    }
}

/// One traced propagation path. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayPath {
    pub kind: PathKind,
    /// Full traced length along the waypoints, meters.
    pub total_distance: f64,
    /// Straight-line source→receiver distance, meters.
    pub direct_distance: f64,
    /// total − direct, ≥ 0 by the triangle inequality.
    pub path_difference: f64,
    /// Ordered source → ... → receiver.
    pub waypoints: Vec<Point3D>,
    /// Pressure multiplier from surface absorption, ∈ [0, 1].
    pub absorption_factor: f64,
    /// Phase imparted by reflection/diffraction events, radians.
    pub phase_change: f64,
    pub valid: bool,
    /// Obstacle this path interacted with, if any.
    pub surface_id: Option<u32>,
}

impl RayPath {
    fn new(
        kind: PathKind,
        total_distance: f64,
        direct_distance: f64,
        waypoints: Vec<Point3D>,
        absorption_factor: f64,
        phase_change: f64,
        valid: bool,
        surface_id: Option<u32>,
    ) -> Self {
        Self {
            kind,
            total_distance,
            direct_distance,
            path_difference: (total_distance - direct_distance).max(0.0),
            waypoints,
            absorption_factor: absorption_factor.clamp(0.0, 1.0),
            phase_change,
            valid,
            surface_id,
        }
    }
}

/// Building footprint for roof and corner diffraction. All the footprint's
/// edge surfaces share the building's `id` so leg-blocking tests can
/// exclude the building itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingFootprint {
    pub vertices: Vec<Point2D>,
    pub height: f64,
    pub id: Option<u32>,
}

/// Whether finite barriers also diffract around their vertical end edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideDiffractionMode {
    /// Only for barriers shorter than `side_diffraction_max_length`.
    Auto,
    On,
    Off,
}

/// Tracer switches. Field defaults follow the serde `default_*` functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracerConfig {
    #[serde(default = "default_true")]
    pub ground_reflection: bool,
    #[serde(default = "default_true")]
    pub wall_reflections: bool,
    #[serde(default = "default_true")]
    pub barrier_diffraction: bool,
    /// A barrier that does not block line of sight is still considered when
    /// its detour exceeds the direct path by less than this, meters
    /// (≈ one wavelength at 63 Hz). ≤ 0 disables the proximity case.
    #[serde(default = "default_diffraction_proximity")]
    pub diffraction_proximity: f64,
    #[serde(default = "default_side_diffraction")]
    pub side_diffraction: SideDiffractionMode,
    /// Barrier length below which `Auto` side diffraction kicks in, meters.
    #[serde(default = "default_side_diffraction_max_length")]
    pub side_diffraction_max_length: f64,
    /// Paths longer than this are marked invalid (inaudible), meters.
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
}

fn default_true() -> bool {
    true
}
fn default_diffraction_proximity() -> f64 {
    5.0
}
fn default_side_diffraction() -> SideDiffractionMode {
    SideDiffractionMode::Auto
}
fn default_side_diffraction_max_length() -> f64 {
    50.0
}
fn default_max_distance() -> f64 {
    2000.0
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            ground_reflection: true,
            wall_reflections: true,
            barrier_diffraction: true,
            diffraction_proximity: default_diffraction_proximity(),
            side_diffraction: SideDiffractionMode::Auto,
            side_diffraction_max_length: default_side_diffraction_max_length(),
            max_distance: default_max_distance(),
        }
    }
}

/// Enumerate all candidate paths from `source` to `receiver`.
///
/// Surfaces are the flattened edges of every obstacle (barriers and
/// building walls); `buildings` carries the closed footprints needed for
/// roof and corner diffraction. Both are read-only and shared across a
/// batch. Every building and barrier is evaluated independently.
pub fn trace_paths(
    source: Point3D,
    receiver: Point3D,
    surfaces: &[ReflectingSurface],
    buildings: &[BuildingFootprint],
    config: &TracerConfig,
) -> Vec<RayPath> {
    let mut paths = Vec::new();

    paths.push(trace_direct(source, receiver, surfaces, config));

    if config.ground_reflection {
        if let Some(p) = trace_ground(source, receiver, surfaces, config) {
            paths.push(p);
        }
    }

    if config.wall_reflections {
        for surface in surfaces {
            if let Some(p) = trace_wall(source, receiver, surface, surfaces, config) {
                paths.push(p);
            }
        }
    }

    if config.barrier_diffraction {
        for surface in surfaces {
            if surface.role != SurfaceRole::Barrier {
                continue;
            }
            trace_barrier(source, receiver, surface, config, &mut paths);
        }
        for building in buildings {
            trace_building(source, receiver, building, config, &mut paths);
        }
    }

    debug_assert!(paths.iter().all(|p| p.path_difference >= 0.0));
    trace!(
        "traced {} candidates ({} valid) for {:?} -> {:?}",
        paths.len(),
        paths.iter().filter(|p| p.valid).count(),
        source,
        receiver
    );
    paths
}

fn trace_direct(
    source: Point3D,
    receiver: Point3D,
    surfaces: &[ReflectingSurface],
    config: &TracerConfig,
) -> RayPath {
    let distance = source.distance_to(&receiver);
    let blocked = is_path_blocked(source.xy(), receiver.xy(), surfaces, None);
    RayPath::new(
        PathKind::Direct,
        distance,
        distance,
        vec![source, receiver],
        1.0,
        0.0,
        !blocked && distance <= config.max_distance,
        None,
    )
}

/// Ground reflection: only meaningful when both endpoints are above the
/// plane. The specular point at z = 0 follows from similar triangles.
fn trace_ground(
    source: Point3D,
    receiver: Point3D,
    surfaces: &[ReflectingSurface],
    config: &TracerConfig,
) -> Option<RayPath> {
    if source.z <= 0.0 || receiver.z <= 0.0 {
        return None;
    }
    let s2 = source.xy();
    let r2 = receiver.xy();
    let t = source.z / (source.z + receiver.z);
    let reflection = Point3D::new(s2.x + t * (r2.x - s2.x), s2.y + t * (r2.y - s2.y), 0.0);

    let d2d = s2.distance_to(&r2);
    let hsum = source.z + receiver.z;
    let total = (d2d * d2d + hsum * hsum).sqrt();
    let direct = source.distance_to(&receiver);

    let refl2 = reflection.xy();
    let unblocked = !is_path_blocked(s2, refl2, surfaces, None)
        && !is_path_blocked(refl2, r2, surfaces, None);

    Some(RayPath::new(
        PathKind::Ground { reflection },
        total,
        direct,
        vec![source, reflection, receiver],
        1.0,
        0.0,
        unblocked && total <= config.max_distance,
        None,
    ))
}

/// First-order specular reflection off one wall, via the image source.
fn trace_wall(
    source: Point3D,
    receiver: Point3D,
    surface: &ReflectingSurface,
    surfaces: &[ReflectingSurface],
    config: &TracerConfig,
) -> Option<RayPath> {
    if surface.absorption >= 1.0 - EPSILON {
        return None;
    }

    let image = surface.image_source(source);
    let r2 = receiver.xy();
    let img2 = image.position.xy();

    // The reflection point is where the receiver→image line crosses the
    // wall segment; no crossing within the span means no specular path.
    let ip = segment_intersection(r2, img2, surface.segment.p1, surface.segment.p2)?;

    let span = r2.distance_to(&img2);
    if span < EPSILON {
        return None;
    }
    let t = r2.distance_to(&ip) / span;

    // Height of the 3D reflection point by geometric interpolation along
    // the receiver→image line (the unfolded ray), not an arbitrary clamp.
    let z_refl = receiver.z + t * (image.position.z - receiver.z);
    let reflection = Point3D::new(ip.x, ip.y, z_refl);

    let direct = source.distance_to(&receiver);
    let total = image.position.distance_to(&receiver);

    // A ray above the wall top misses the wall; below ground it never
    // existed. Both are reported invalid rather than clamped valid.
    let geometry_ok = z_refl <= surface.height + EPSILON && z_refl >= -EPSILON;

    let s2 = source.xy();
    let unblocked = !is_path_blocked(s2, ip, surfaces, surface.id)
        && !is_path_blocked(ip, r2, surfaces, surface.id);

    Some(RayPath::new(
        PathKind::Wall { reflection },
        total,
        direct,
        vec![source, reflection, receiver],
        (1.0 - image.absorption).max(0.0).sqrt(),
        image.phase_change,
        geometry_ok && unblocked && total <= config.max_distance,
        surface.id,
    ))
}

/// Over-top and around-end diffraction for one barrier.
fn trace_barrier(
    source: Point3D,
    receiver: Point3D,
    surface: &ReflectingSurface,
    config: &TracerConfig,
    paths: &mut Vec<RayPath>,
) {
    let s2 = source.xy();
    let r2 = receiver.xy();
    let direct = source.distance_to(&receiver);

    let crossing = segment_intersection(s2, r2, surface.segment.p1, surface.segment.p2);

    // Pick the diffraction point: the blocking intersection lifted to the
    // barrier top, or (proximity case) the barrier point with the smallest
    // detour when line of sight clears the barrier.
    let edge2 = match crossing {
        Some(ip) => ip,
        None => {
            if config.diffraction_proximity <= 0.0 {
                return;
            }
            min_detour_point(source, receiver, surface)
        }
    };

    let edge = Point3D::new(edge2.x, edge2.y, surface.height);
    let total = source.distance_to(&edge) + edge.distance_to(&receiver);
    let delta = total - direct;

    // Proximity case: only barriers whose detour stays within the
    // threshold influence an unblocked path.
    if crossing.is_none() && delta > config.diffraction_proximity {
        return;
    }

    // Each barrier is evaluated independently; diffraction legs are not
    // occlusion-tested against other obstacles (unlike wall and ground
    // legs). Series screens each contribute their own candidate.
    paths.push(RayPath::new(
        PathKind::Diffracted { edge },
        total,
        direct,
        vec![source, edge, receiver],
        1.0,
        DIFFRACTION_PHASE,
        total <= config.max_distance,
        surface.id,
    ));

    // Finite barriers: paths around each end at ground level. Going around
    // a free-standing screen means down to the ground, around the end edge
    // and back up. Only meaningful when the screen blocks line of sight.
    if crossing.is_none() {
        return;
    }
    let around_ends = match config.side_diffraction {
        SideDiffractionMode::On => true,
        SideDiffractionMode::Off => false,
        SideDiffractionMode::Auto => surface.segment.length() < config.side_diffraction_max_length,
    };
    if !around_ends {
        return;
    }

    for end2 in [surface.segment.p1, surface.segment.p2] {
        let end = Point3D::new(end2.x, end2.y, 0.0);
        let total = source.distance_to(&end) + end.distance_to(&receiver);
        let kind = if cross2(s2, r2, end2) > 0.0 {
            PathKind::CornerLeft { corner: end }
        } else {
            PathKind::CornerRight { corner: end }
        };
        paths.push(RayPath::new(
            kind,
            total,
            direct,
            vec![source, end, receiver],
            1.0,
            DIFFRACTION_PHASE,
            total <= config.max_distance,
            surface.id,
        ));
    }
}

/// Roof and corner diffraction for one building footprint.
fn trace_building(
    source: Point3D,
    receiver: Point3D,
    building: &BuildingFootprint,
    config: &TracerConfig,
    paths: &mut Vec<RayPath>,
) {
    let s2 = source.xy();
    let r2 = receiver.xy();
    let direct = source.distance_to(&receiver);

    let crossing = segment_polygon_crossing(s2, r2, &building.vertices);
    if !crossing.intersects {
        return;
    }

    // Over the roof: up one edge, across the top, down the other. Both
    // crossing points must exist (endpoints inside the footprint have no
    // over-roof detour).
    if let (Some(entry2), Some(exit2)) = (crossing.entry_point, crossing.exit_point) {
        let entry = Point3D::new(entry2.x, entry2.y, building.height);
        let exit = Point3D::new(exit2.x, exit2.y, building.height);
        let total = source.distance_to(&entry)
            + entry.distance_to(&exit)
            + exit.distance_to(&receiver);
        paths.push(RayPath::new(
            PathKind::Roof { entry, exit },
            total,
            direct,
            vec![source, entry, exit, receiver],
            1.0,
            DIFFRACTION_PHASE,
            total <= config.max_distance,
            building.id,
        ));
    }

    // Around the corners: vertices visible from both endpoints, tagged
    // left/right by which side of the source→receiver line they sit on.
    let visible_from_source = find_visible_corners(s2, &building.vertices);
    let visible_from_receiver = find_visible_corners(r2, &building.vertices);
    for corner2 in visible_from_source {
        if !visible_from_receiver
            .iter()
            .any(|c| c.distance_to(&corner2) < EPSILON.sqrt())
        {
            continue;
        }
        let ds = s2.distance_to(&corner2);
        let dr = corner2.distance_to(&r2);
        let t = if ds + dr > EPSILON { ds / (ds + dr) } else { 0.5 };
        let corner = Point3D::new(
            corner2.x,
            corner2.y,
            source.z + t * (receiver.z - source.z),
        );
        let total = source.distance_to(&corner) + corner.distance_to(&receiver);
        let kind = if cross2(s2, r2, corner2) > 0.0 {
            PathKind::CornerLeft { corner }
        } else {
            PathKind::CornerRight { corner }
        };
        paths.push(RayPath::new(
            kind,
            total,
            direct,
            vec![source, corner, receiver],
            1.0,
            DIFFRACTION_PHASE,
            total <= config.max_distance,
            building.id,
        ));
    }
}

/// Barrier point minimizing the over-top detour, for the proximity case.
/// Each detour term is a norm of an affine function of the segment
/// parameter, so the sum is convex; ternary search converges.
fn min_detour_point(source: Point3D, receiver: Point3D, surface: &ReflectingSurface) -> Point2D {
    let p1 = surface.segment.p1;
    let p2 = surface.segment.p2;
    let at = |u: f64| Point2D::new(p1.x + u * (p2.x - p1.x), p1.y + u * (p2.y - p1.y));
    let detour = |u: f64| {
        let e = at(u);
        let e3 = Point3D::new(e.x, e.y, surface.height);
        source.distance_to(&e3) + e3.distance_to(&receiver)
    };

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    for _ in 0..60 {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if detour(m1) <= detour(m2) {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    at(0.5 * (lo + hi))
}

/// Among the valid diffraction candidates of each obstacle, the one with
/// the minimum positive path difference dominates (shortest detour, least
/// shielding). Returns the dominant candidate per obstacle id.
pub fn dominant_diffraction(paths: &[RayPath]) -> Vec<&RayPath> {
    let mut best: Vec<(Option<u32>, &RayPath)> = Vec::new();
    for path in paths {
        if !path.valid || !path.kind.is_diffraction() || path.path_difference <= 0.0 {
            continue;
        }
        match best.iter_mut().find(|(id, _)| *id == path.surface_id) {
            Some((_, slot)) => {
                if path.path_difference < slot.path_difference {
                    *slot = path;
                }
            }
            None => best.push((path.surface_id, path)),
        }
    }
    best.into_iter().map(|(_, p)| p).collect()
}

/// Legacy scalar view: when a single "blocked + delta" answer is needed,
/// the strongest screen wins, i.e. the maximum over obstacles of each
/// obstacle's dominant (minimum) path difference.
pub fn strongest_screen_delta(paths: &[RayPath]) -> Option<f64> {
    dominant_diffraction(paths)
        .into_iter()
        .map(|p| p.path_difference)
        .max_by(f64::total_cmp)
}
