//! 2D/3D geometry kernel: segment intersection, point-in-polygon, mirroring,
//! polygon entry/exit and line-of-sight tests.
//!
//! All functions are total. Ambiguous or degenerate geometry (zero-length
//! segments, parallel lines, points coincident within [`EPSILON`]) resolves
//! to a conservative "no interaction" result: no intersection, not blocked,
//! not inside.

use serde::{Deserialize, Serialize};

use crate::EPSILON;
use crate::surface::ReflectingSurface;

/// Distance below which two intersection points count as the same point,
/// meters. Coarser than [`EPSILON`]: it merges the duplicate hits produced
/// when a segment crosses a polygon exactly at a shared vertex.
const VERTEX_MERGE_TOLERANCE: f64 = 1e-6;

/// 2D point in the local planar frame, meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 3D point; z is height above ground (the ground plane is z = 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Point3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Horizontal (plan-view) projection.
    pub fn xy(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Ordered pair of 2D points. Direction matters for normal computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub p1: Point2D,
    pub p2: Point2D,
}

impl Segment {
    pub fn new(p1: Point2D, p2: Point2D) -> Self {
        Self { p1, p2 }
    }

    pub fn length(&self) -> f64 {
        self.p1.distance_to(&self.p2)
    }
}

/// Intersection of two segments [p1,p2] and [q1,q2].
///
/// Parametric line intersection. Returns `None` when the cross product of
/// the direction vectors has magnitude below [`EPSILON`] (parallel or
/// collinear, including near-grazing incidence) or when either parameter
/// falls outside [-ε, 1+ε]. The ε slack keeps intersections exactly at
/// segment endpoints from flickering due to floating-point noise.
pub fn segment_intersection(
    p1: Point2D,
    p2: Point2D,
    q1: Point2D,
    q2: Point2D,
) -> Option<Point2D> {
    let dx1 = p2.x - p1.x;
    let dy1 = p2.y - p1.y;
    let dx2 = q2.x - q1.x;
    let dy2 = q2.y - q1.y;

    let denom = dx1 * dy2 - dy1 * dx2;
    if denom.abs() < EPSILON {
        return None;
    }

    let qx = q1.x - p1.x;
    let qy = q1.y - p1.y;
    let t = (qx * dy2 - qy * dx2) / denom;
    let u = (qx * dy1 - qy * dx1) / denom;

    if t < -EPSILON || t > 1.0 + EPSILON || u < -EPSILON || u > 1.0 + EPSILON {
        return None;
    }

    Some(Point2D::new(p1.x + t * dx1, p1.y + t * dy1))
}

/// Even-odd (ray casting) point-in-polygon test. O(n) in vertex count.
pub fn point_in_polygon(point: Point2D, vertices: &[Point2D]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = vertices[i];
        let vj = vertices[j];
        if (vi.y > point.y) != (vj.y > point.y) {
            let x_cross = vj.x + (point.y - vj.y) / (vi.y - vj.y) * (vi.x - vj.x);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Reflect `point` across the infinite line through `segment`.
///
/// Projection onto the line, then 2·proj − point. A degenerate segment
/// (length² below ε) reflects nothing: the original point is returned.
pub fn mirror_point(point: Point2D, segment: &Segment) -> Point2D {
    let dx = segment.p2.x - segment.p1.x;
    let dy = segment.p2.y - segment.p1.y;
    let len2 = dx * dx + dy * dy;
    if len2 < EPSILON {
        return point;
    }
    let t = ((point.x - segment.p1.x) * dx + (point.y - segment.p1.y) * dy) / len2;
    let proj_x = segment.p1.x + t * dx;
    let proj_y = segment.p1.y + t * dy;
    Point2D::new(2.0 * proj_x - point.x, 2.0 * proj_y - point.y)
}

/// Result of intersecting a segment with a polygon outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonCrossing {
    pub intersects: bool,
    /// Where the segment enters the polygon (None if `from` starts inside).
    pub entry_point: Option<Point2D>,
    /// Where the segment leaves the polygon (None if `to` ends inside).
    pub exit_point: Option<Point2D>,
}

impl PolygonCrossing {
    fn none() -> Self {
        Self {
            intersects: false,
            entry_point: None,
            exit_point: None,
        }
    }
}

/// Intersect the segment [from,to] with a polygon's edges and resolve
/// entry/exit points.
///
/// All edge intersections are collected and sorted by parametric distance
/// from `from`; whether `from`/`to` lie inside the polygon disambiguates the
/// four cases: both outside crossing twice, either endpoint inside crossing
/// once, or no crossing at all.
pub fn segment_polygon_crossing(
    from: Point2D,
    to: Point2D,
    vertices: &[Point2D],
) -> PolygonCrossing {
    if vertices.len() < 3 {
        return PolygonCrossing::none();
    }

    let seg_len = from.distance_to(&to);
    if seg_len < EPSILON {
        return PolygonCrossing::none();
    }

    let mut hits: Vec<(f64, Point2D)> = Vec::new();
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        if let Some(ip) = segment_intersection(from, to, vertices[j], vertices[i]) {
            let t = from.distance_to(&ip) / seg_len;
            // Drop duplicates from a crossing exactly at a shared vertex.
            if !hits.iter().any(|(_, p)| p.distance_to(&ip) < VERTEX_MERGE_TOLERANCE) {
                hits.push((t, ip));
            }
        }
        j = i;
    }

    if hits.is_empty() {
        return PolygonCrossing::none();
    }
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));

    let from_inside = point_in_polygon(from, vertices);
    let to_inside = point_in_polygon(to, vertices);

    match (from_inside, to_inside) {
        (false, false) => PolygonCrossing {
            intersects: true,
            entry_point: Some(hits[0].1),
            exit_point: Some(hits[hits.len() - 1].1),
        },
        (true, false) => PolygonCrossing {
            intersects: true,
            entry_point: None,
            exit_point: Some(hits[hits.len() - 1].1),
        },
        (false, true) => PolygonCrossing {
            intersects: true,
            entry_point: Some(hits[0].1),
            exit_point: None,
        },
        (true, true) => PolygonCrossing {
            intersects: true,
            entry_point: None,
            exit_point: None,
        },
    }
}

/// True iff any non-excluded surface crosses the segment strictly between
/// its endpoints. An intersection coincident with either endpoint does not
/// block: a path leaving a wall is not blocked by that wall.
pub fn is_path_blocked(
    from: Point2D,
    to: Point2D,
    surfaces: &[ReflectingSurface],
    exclude_id: Option<u32>,
) -> bool {
    for surface in surfaces {
        if exclude_id.is_some() && surface.id == exclude_id {
            continue;
        }
        if let Some(ip) = segment_intersection(from, to, surface.segment.p1, surface.segment.p2) {
            if ip.distance_to(&from) > EPSILON && ip.distance_to(&to) > EPSILON {
                return true;
            }
        }
    }
    false
}

/// Polygon corners visible from `point`: a vertex is visible when no edge
/// of the polygon (excluding the two edges touching that vertex) occludes
/// the open segment from `point` to the vertex.
pub fn find_visible_corners(point: Point2D, vertices: &[Point2D]) -> Vec<Point2D> {
    let n = vertices.len();
    if n < 3 {
        return Vec::new();
    }

    let mut visible = Vec::new();
    for i in 0..n {
        let corner = vertices[i];
        let mut occluded = false;
        for j in 0..n {
            let k = (j + 1) % n;
            // Skip the two edges meeting at this corner.
            if j == i || k == i {
                continue;
            }
            if let Some(ip) = segment_intersection(point, corner, vertices[j], vertices[k]) {
                if ip.distance_to(&point) > EPSILON && ip.distance_to(&corner) > EPSILON {
                    occluded = true;
                    break;
                }
            }
        }
        if !occluded {
            visible.push(corner);
        }
    }
    visible
}

/// 2D cross product of (b−a) and (c−a). Sign gives the side of c relative
/// to the directed line a→b.
pub fn cross2(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{SurfaceRole, SurfaceType};

    fn surface(p1: (f64, f64), p2: (f64, f64), id: u32) -> ReflectingSurface {
        ReflectingSurface {
            segment: Segment::new(Point2D::new(p1.0, p1.1), Point2D::new(p2.0, p2.1)),
            height: 3.0,
            surface_type: SurfaceType::Hard,
            absorption: 0.0,
            role: SurfaceRole::Barrier,
            id: Some(id),
        }
    }

    #[test]
    fn test_segment_intersection_crossing() {
        let ip = segment_intersection(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(5.0, -5.0),
            Point2D::new(5.0, 5.0),
        )
        .expect("segments cross");
        assert!((ip.x - 5.0).abs() < 1e-9);
        assert!(ip.y.abs() < 1e-9);
    }

    #[test]
    fn test_segment_intersection_parallel_is_none() {
        let ip = segment_intersection(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(10.0, 1.0),
        );
        assert!(ip.is_none());
    }

    #[test]
    fn test_segment_intersection_outside_span_is_none() {
        let ip = segment_intersection(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(20.0, -5.0),
            Point2D::new(20.0, 5.0),
        );
        assert!(ip.is_none());
    }

    #[test]
    fn test_segment_intersection_at_endpoint() {
        // Touches exactly at (10, 0); the ±ε slack must accept it.
        let ip = segment_intersection(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, -5.0),
            Point2D::new(10.0, 5.0),
        );
        assert!(ip.is_some());
    }

    #[test]
    fn test_point_in_polygon_square() {
        let square = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Point2D::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Point2D::new(15.0, 5.0), &square));
        assert!(!point_in_polygon(Point2D::new(-1.0, -1.0), &square));
    }

    #[test]
    fn test_point_in_polygon_degenerate() {
        let line = vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)];
        assert!(!point_in_polygon(Point2D::new(0.5, 0.0), &line));
    }

    #[test]
    fn test_mirror_point_across_x_axis() {
        let seg = Segment::new(Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0));
        let m = mirror_point(Point2D::new(3.0, 4.0), &seg);
        assert!((m.x - 3.0).abs() < 1e-9);
        assert!((m.y + 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_mirror_point_degenerate_segment() {
        let seg = Segment::new(Point2D::new(1.0, 1.0), Point2D::new(1.0, 1.0));
        let p = Point2D::new(3.0, 4.0);
        assert_eq!(mirror_point(p, &seg), p);
    }

    #[test]
    fn test_mirror_is_involution() {
        let seg = Segment::new(Point2D::new(-2.0, 5.0), Point2D::new(7.0, -1.0));
        let p = Point2D::new(3.3, 4.7);
        let m = mirror_point(mirror_point(p, &seg), &seg);
        assert!((m.x - p.x).abs() < 1e-9);
        assert!((m.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_crossing_both_outside() {
        let square = vec![
            Point2D::new(4.0, -2.0),
            Point2D::new(6.0, -2.0),
            Point2D::new(6.0, 2.0),
            Point2D::new(4.0, 2.0),
        ];
        let c = segment_polygon_crossing(Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0), &square);
        assert!(c.intersects);
        let entry = c.entry_point.expect("entry");
        let exit = c.exit_point.expect("exit");
        assert!((entry.x - 4.0).abs() < 1e-9);
        assert!((exit.x - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_crossing_from_inside() {
        let square = vec![
            Point2D::new(-1.0, -1.0),
            Point2D::new(1.0, -1.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(-1.0, 1.0),
        ];
        let c = segment_polygon_crossing(Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0), &square);
        assert!(c.intersects);
        assert!(c.entry_point.is_none());
        assert!((c.exit_point.expect("exit").x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_crossing_through_shared_vertices() {
        // A diamond crossed exactly through its left and right vertices:
        // each vertex belongs to two edges, so the raw intersection list
        // holds duplicates that must merge into one entry and one exit.
        let diamond = vec![
            Point2D::new(5.0, 0.0),
            Point2D::new(6.0, 1.0),
            Point2D::new(7.0, 0.0),
            Point2D::new(6.0, -1.0),
        ];
        let c = segment_polygon_crossing(Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0), &diamond);
        assert!(c.intersects);
        let entry = c.entry_point.expect("entry");
        let exit = c.exit_point.expect("exit");
        assert!((entry.x - 5.0).abs() < 1e-9);
        assert!((exit.x - 7.0).abs() < 1e-9);
        assert!(entry.y.abs() < 1e-9 && exit.y.abs() < 1e-9);
    }

    #[test]
    fn test_polygon_crossing_miss() {
        let square = vec![
            Point2D::new(4.0, 5.0),
            Point2D::new(6.0, 5.0),
            Point2D::new(6.0, 8.0),
            Point2D::new(4.0, 8.0),
        ];
        let c = segment_polygon_crossing(Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0), &square);
        assert!(!c.intersects);
    }

    #[test]
    fn test_is_path_blocked() {
        let surfaces = vec![surface((5.0, -5.0), (5.0, 5.0), 1)];
        assert!(is_path_blocked(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            &surfaces,
            None
        ));
        // Moved aside: no longer crosses.
        let surfaces = vec![surface((5.0, 2.0), (5.0, 5.0), 1)];
        assert!(!is_path_blocked(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            &surfaces,
            None
        ));
    }

    #[test]
    fn test_is_path_blocked_respects_exclusion() {
        let surfaces = vec![surface((5.0, -5.0), (5.0, 5.0), 7)];
        assert!(!is_path_blocked(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            &surfaces,
            Some(7)
        ));
    }

    #[test]
    fn test_find_visible_corners_square() {
        let square = vec![
            Point2D::new(4.0, -2.0),
            Point2D::new(6.0, -2.0),
            Point2D::new(6.0, 2.0),
            Point2D::new(4.0, 2.0),
        ];
        // From the left, the two x=4 corners are visible; the far corners
        // are occluded by the near edges.
        let visible = find_visible_corners(Point2D::new(0.0, 0.0), &square);
        assert!(visible.iter().any(|p| (p.x - 4.0).abs() < 1e-9 && (p.y + 2.0).abs() < 1e-9));
        assert!(visible.iter().any(|p| (p.x - 4.0).abs() < 1e-9 && (p.y - 2.0).abs() < 1e-9));
        assert!(!visible.iter().any(|p| (p.x - 6.0).abs() < 1e-9 && (p.y + 2.0).abs() < 1e-9));
    }

    #[test]
    fn test_cross2_sign() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 0.0);
        assert!(cross2(a, b, Point2D::new(5.0, 3.0)) > 0.0);
        assert!(cross2(a, b, Point2D::new(5.0, -3.0)) < 0.0);
    }
}
