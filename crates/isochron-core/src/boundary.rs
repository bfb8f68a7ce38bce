//! Boundary extraction: find the outline edges of a point cloud.
//!
//! This module defines the [`BoundaryExtractor`] trait for pluggable
//! boundary algorithms and the [`BoundaryExtractorKind`] enum for
//! selecting one at runtime. Output is an unordered edge set; turning it
//! into a loop is [`stitch`](crate::stitch)'s job.
//!
//! Geometry is planar with `x = lng` and `y = lat`. Returned edges
//! always reuse the exact input coordinates so the stitcher can match
//! endpoints without a tolerance.

use geo::{ConvexHull, MultiPoint};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};

use crate::types::{Point, PointKey, Segment};

/// Relative shrink applied to the empty-circle probe so points lying
/// exactly on the circle (the edge's own endpoints, or cocircular
/// neighbours) do not count as inside it.
const PROBE_SHRINK: f64 = 1e-9;

/// Selects which boundary extraction algorithm to use.
///
/// Ships with [`AlphaShape`](Self::AlphaShape) only; other variants can
/// be added without changing the pipeline configuration shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryExtractorKind {
    /// Alpha shape with probe radius `1 / alpha`; `alpha <= 0` gives the
    /// convex hull.
    #[default]
    AlphaShape,
}

/// Trait for boundary extraction strategies.
///
/// Input: a finite set of points and a shape parameter.
/// Output: the boundary edges, in no particular order.
pub trait BoundaryExtractor {
    /// Extract boundary edges from `points`.
    fn extract_boundary(&self, points: &[Point], alpha: f64) -> Vec<Segment>;
}

impl BoundaryExtractor for BoundaryExtractorKind {
    fn extract_boundary(&self, points: &[Point], alpha: f64) -> Vec<Segment> {
        match *self {
            Self::AlphaShape => alpha_shape(points, alpha),
        }
    }
}

/// Alpha-shape boundary of `points`.
///
/// An edge `(p, q)` belongs to the boundary when some circle of radius
/// `1 / alpha` passing through both `p` and `q` contains no other input
/// point. Smaller `alpha` means a larger probe circle and a smoother,
/// more convex outline; `alpha <= 0` returns the convex hull.
///
/// Non-finite points are ignored and duplicates are merged.
#[must_use]
pub fn alpha_shape(points: &[Point], alpha: f64) -> Vec<Segment> {
    let points = distinct_finite(points);
    if points.len() < 2 {
        return Vec::new();
    }
    if alpha <= 0.0 || !alpha.is_finite() {
        return convex_hull(&points);
    }
    empty_circle_edges(&points, alpha.recip())
}

/// Convex hull edges via `geo`.
fn convex_hull(points: &[Point]) -> Vec<Segment> {
    let cloud: MultiPoint<f64> = points
        .iter()
        .map(|p| geo::Point::new(p.lng, p.lat))
        .collect();
    cloud
        .convex_hull()
        .exterior()
        .lines()
        .map(|line| {
            Segment::new(
                Point::new(line.start.y, line.start.x),
                Point::new(line.end.y, line.end.x),
            )
        })
        .filter(|s| !s.is_degenerate())
        .collect()
}

/// A point position tagged with its index, for R*-tree insertion.
type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Edges with an empty probe circle of `radius` on at least one side.
fn empty_circle_edges(points: &[Point], radius: f64) -> Vec<Segment> {
    let tree = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint::new([p.lng, p.lat], i))
            .collect(),
    );
    let reach_sq = (2.0 * radius).powi(2);
    let probe_sq = radius * radius * (1.0 - PROBE_SHRINK);

    let mut edges = Vec::new();
    for (i, &p) in points.iter().enumerate() {
        let mut neighbours: Vec<usize> = tree
            .locate_within_distance([p.lng, p.lat], reach_sq)
            .map(|entry| entry.data)
            .filter(|&j| j > i)
            .collect();
        neighbours.sort_unstable();

        for j in neighbours {
            let q = points[j];
            let Some(centers) = probe_centers(p, q, radius) else {
                continue;
            };
            let is_boundary = centers.iter().any(|&center| {
                tree.locate_within_distance(center, probe_sq)
                    .all(|entry| entry.data == i || entry.data == j)
            });
            if is_boundary {
                edges.push(Segment::new(p, q));
            }
        }
    }
    edges
}

/// Centers `[x, y]` of the two circles of `radius` through `p` and `q`.
///
/// Returns `None` if the points coincide or are more than a diameter
/// apart.
fn probe_centers(p: Point, q: Point, radius: f64) -> Option<[[f64; 2]; 2]> {
    let dx = q.lng - p.lng;
    let dy = q.lat - p.lat;
    let chord_sq = dx.mul_add(dx, dy * dy);
    if chord_sq == 0.0 || chord_sq > 4.0 * radius * radius {
        return None;
    }
    let chord = chord_sq.sqrt();
    let offset = (radius * radius - chord_sq / 4.0).max(0.0).sqrt();
    let (mx, my) = (f64::midpoint(p.lng, q.lng), f64::midpoint(p.lat, q.lat));
    // Unit normal to the chord, scaled to the center offset.
    let (nx, ny) = (-dy / chord * offset, dx / chord * offset);
    Some([[mx + nx, my + ny], [mx - nx, my - ny]])
}

/// Drop non-finite points and exact duplicates, keeping first-seen order.
fn distinct_finite(points: &[Point]) -> Vec<Point> {
    let mut seen = std::collections::HashSet::with_capacity(points.len());
    points
        .iter()
        .copied()
        .filter(|p| p.is_finite() && seen.insert(PointKey::from(*p)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::stitch;

    fn grid(n: i32) -> Vec<Point> {
        let mut pts = Vec::new();
        for lat in 0..n {
            for lng in 0..n {
                pts.push(Point::new(f64::from(lat), f64::from(lng)));
            }
        }
        pts
    }

    fn on_grid_perimeter(p: Point, n: i32) -> bool {
        let max = f64::from(n - 1);
        p.lat == 0.0 || p.lng == 0.0 || p.lat == max || p.lng == max
    }

    #[test]
    fn default_is_alpha_shape() {
        assert_eq!(
            BoundaryExtractorKind::default(),
            BoundaryExtractorKind::AlphaShape
        );
    }

    #[test]
    fn fewer_than_two_points_has_no_boundary() {
        assert!(alpha_shape(&[], 1.0).is_empty());
        assert!(alpha_shape(&[Point::new(1.0, 1.0)], 1.0).is_empty());
        assert!(alpha_shape(&[Point::new(1.0, 1.0), Point::new(1.0, 1.0)], 0.0).is_empty());
    }

    #[test]
    fn zero_alpha_is_convex_hull() {
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 0.0),
        ];
        let mut pts = corners.to_vec();
        pts.extend([Point::new(2.0, 2.0), Point::new(1.0, 3.0), Point::new(3.5, 0.5)]);

        let edges = BoundaryExtractorKind::AlphaShape.extract_boundary(&pts, 0.0);
        assert_eq!(edges.len(), 4);
        for edge in &edges {
            assert!(corners.contains(&edge.a) && corners.contains(&edge.b));
        }

        let cycle = stitch(&edges).unwrap();
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn unit_probe_traces_grid_perimeter() {
        // With a probe radius of one grid step, only the outer ring of a
        // square grid has an empty circle on its outside.
        let pts = grid(5);
        let edges = BoundaryExtractorKind::AlphaShape.extract_boundary(&pts, 1.0);
        assert_eq!(edges.len(), 16);
        for edge in &edges {
            assert!(on_grid_perimeter(edge.a, 5) && on_grid_perimeter(edge.b, 5));
            assert!((edge.a.distance(edge.b) - 1.0).abs() < 1e-12);
        }

        let cycle = stitch(&edges).unwrap();
        assert_eq!(cycle.len(), 16);
    }

    #[test]
    fn notch_is_followed_with_small_probe() {
        // A 5x5 grid with the middle of the top row removed: a radius-1
        // probe reaches into the notch, so the outline follows it.
        let mut pts = grid(5);
        pts.retain(|p| *p != Point::new(4.0, 2.0));
        let edges = alpha_shape(&pts, 1.0);
        assert!(
            edges
                .iter()
                .any(|e| e.a == Point::new(3.0, 2.0) || e.b == Point::new(3.0, 2.0)),
            "notch floor should be on the boundary"
        );

        // A huge probe ignores the notch and bridges it.
        let hull_like = alpha_shape(&pts, 0.01);
        assert!(
            hull_like
                .iter()
                .all(|e| e.a != Point::new(3.0, 2.0) && e.b != Point::new(3.0, 2.0))
        );
    }

    #[test]
    fn tiny_probe_finds_no_edges_in_sparse_cloud() {
        let pts = grid(3);
        assert!(alpha_shape(&pts, 100.0).is_empty());
    }

    #[test]
    fn edges_reuse_input_coordinates() {
        let pts = vec![
            Point::new(44.123_456_789, -123.987_654_321),
            Point::new(44.2, -123.9),
            Point::new(44.15, -123.7),
            Point::new(44.05, -123.8),
        ];
        for edge in alpha_shape(&pts, 0.0) {
            assert!(pts.contains(&edge.a));
            assert!(pts.contains(&edge.b));
        }
    }

    #[test]
    fn non_finite_points_are_ignored() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 1.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, f64::INFINITY),
            Point::new(1.0, 0.0),
        ];
        let edges = alpha_shape(&pts, 0.0);
        assert_eq!(edges.len(), 3);
        for edge in edges {
            assert!(edge.a.is_finite() && edge.b.is_finite());
        }
    }

    #[test]
    fn probe_centers_are_equidistant() {
        let p = Point::new(0.0, 0.0);
        let q = Point::new(0.0, 1.0);
        let [c1, c2] = probe_centers(p, q, 1.0).unwrap();
        for c in [c1, c2] {
            let dp = c[0].hypot(c[1]);
            let dq = (c[0] - 1.0).hypot(c[1]);
            assert!((dp - 1.0).abs() < 1e-12);
            assert!((dq - 1.0).abs() < 1e-12);
        }
        assert!(probe_centers(p, Point::new(0.0, 3.0), 1.0).is_none());
        assert!(probe_centers(p, p, 1.0).is_none());
    }
}
