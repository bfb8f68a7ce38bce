//! Shared value types for sampling and contour reconstruction.

use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude (south-north axis).
    pub lat: f64,
    /// Longitude (east-west axis).
    pub lng: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Squared planar distance to another point, in squared degrees.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dlat = self.lat - other.lat;
        let dlng = self.lng - other.lng;
        dlat.mul_add(dlat, dlng * dlng)
    }

    /// Planar distance to another point, in degrees.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Hashable identity of a point: its exact bit pattern, with `-0.0`
/// folded into `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct PointKey(u64, u64);

impl From<Point> for PointKey {
    fn from(p: Point) -> Self {
        Self((p.lat + 0.0).to_bits(), (p.lng + 0.0).to_bits())
    }
}

/// A closed interval `[min, max]` on one axis.
///
/// Built from a pair of bounds in either order; the constructor sorts
/// them. Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Interval {
    min: f64,
    max: f64,
}

impl Interval {
    /// Create an interval from two bounds given in any order.
    #[must_use]
    pub const fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Lower bound.
    #[must_use]
    pub const fn min(self) -> f64 {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub const fn max(self) -> f64 {
        self.max
    }

    /// Length of the interval.
    #[must_use]
    pub fn span(self) -> f64 {
        self.max - self.min
    }

    /// Map a fraction in `[0, 1]` onto the interval.
    #[must_use]
    pub fn lerp(self, t: f64) -> f64 {
        self.span().mul_add(t, self.min)
    }

    /// Returns `true` if `value` lies within the closed interval.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl From<[f64; 2]> for Interval {
    fn from([a, b]: [f64; 2]) -> Self {
        Self::new(a, b)
    }
}

impl From<Interval> for [f64; 2] {
    fn from(interval: Interval) -> Self {
        [interval.min, interval.max]
    }
}

/// The rectangular region being sampled: one closed interval per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// South-north extent.
    pub lat: Interval,
    /// East-west extent.
    pub lng: Interval,
}

impl BoundingBox {
    /// Create a bounding box from its two axis intervals.
    #[must_use]
    pub const fn new(lat: Interval, lng: Interval) -> Self {
        Self { lat, lng }
    }

    /// Point at fractional position `(u, v)`, where `u` runs along
    /// latitude and `v` along longitude, both in `[0, 1]`.
    #[must_use]
    pub fn at(&self, u: f64, v: f64) -> Point {
        Point::new(self.lat.lerp(u), self.lng.lerp(v))
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point {
        self.at(0.5, 0.5)
    }

    /// Returns `true` if `point` lies inside the box (boundary included).
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.lat.contains(point.lat) && self.lng.contains(point.lng)
    }

    /// Returns `true` if all four bounds are finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lat.min.is_finite()
            && self.lat.max.is_finite()
            && self.lng.min.is_finite()
            && self.lng.max.is_finite()
    }
}

/// A named destination every sampled point is measured against.
///
/// The name is the log column heading; the location is where a
/// [`Measurer`](crate::Measurer) routes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Column name, e.g. `"Salem, OR"`.
    pub name: String,
    /// Geographic location of the destination.
    #[serde(flatten)]
    pub location: Point,
}

impl Reference {
    /// Create a new reference location.
    #[must_use]
    pub fn new(name: impl Into<String>, location: Point) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// An undirected boundary edge between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// One endpoint.
    pub a: Point,
    /// The other endpoint.
    pub b: Point,
}

impl Segment {
    /// Create a new segment.
    #[must_use]
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Returns `true` if both endpoints are the same point.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    /// Given one endpoint, return the opposite one.
    ///
    /// Returns `None` if `endpoint` is not on this segment.
    #[must_use]
    pub fn other(&self, endpoint: Point) -> Option<Point> {
        if self.a == endpoint {
            Some(self.b)
        } else if self.b == endpoint {
            Some(self.a)
        } else {
            None
        }
    }
}

/// An ordered closed loop of points.
///
/// Closure is implicit: the last point connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle(Vec<Point>);

impl Cycle {
    /// Create a cycle from its vertices in traversal order.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the cycle has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of vertices (equal to the number of edges).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Vertices in traversal order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the cycle and returns its vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Edges of the loop, including the closing edge from the last
    /// vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.0.len();
        (0..n).map(move |i| Segment::new(self.0[i], self.0[(i + 1) % n]))
    }
}
