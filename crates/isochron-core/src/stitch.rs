//! Contour stitching: turn an unordered set of undirected boundary edges
//! into one ordered closed loop.
//!
//! A well-formed input is a single simple cycle: every point touches
//! exactly two edges and all edges are connected. The walk starts at the
//! first endpoint of the first edge, steps to its second endpoint, and
//! from there repeatedly follows the one unused edge touching the
//! current point until every edge has been consumed. Anything else
//! (dangling endpoints, branches, several separate loops) is rejected
//! with a [`MalformedTopology`] error rather than a partial result.
//!
//! Points are matched by exact coordinate equality. Boundary extractors
//! return copies of their input points, so no tolerance is applied.

use std::collections::{HashMap, HashSet};

use crate::types::{Cycle, Point, PointKey, Segment};

/// Reasons an edge set cannot be stitched into a single loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedTopology {
    /// There were no edges to stitch.
    #[error("no boundary segments to stitch")]
    Empty,

    /// An edge starts and ends at the same point.
    #[error("zero-length segment at ({}, {})", .0.lat, .0.lng)]
    DegenerateSegment(Point),

    /// A point touches only one edge, so the boundary is an open path.
    #[error("dangling endpoint at ({}, {})", .0.lat, .0.lng)]
    DanglingEndpoint(Point),

    /// A point touches more than two edges, so the next step is ambiguous.
    #[error("{degree} segments meet at ({}, {})", .point.lat, .point.lng)]
    Branch {
        /// The shared point.
        point: Point,
        /// Number of distinct edges touching it.
        degree: usize,
    },

    /// The walk closed its loop before consuming every edge.
    #[error("boundary has more than one component: {unused} of {total} segments not reached")]
    Disconnected {
        /// Edges left over once the first loop closed.
        unused: usize,
        /// Distinct edges in the input.
        total: usize,
    },
}

/// Reconstruct the ordered loop traced by `segments`.
///
/// Duplicate edges (in either direction) are collapsed before
/// stitching. The returned cycle starts at the first endpoint of the
/// first input edge and has exactly one vertex per distinct edge.
///
/// Runs in linear time using a point-to-edge adjacency index.
///
/// # Errors
///
/// Returns a [`MalformedTopology`] variant if the edges do not form
/// exactly one simple closed loop.
///
/// # Examples
///
/// ```
/// use isochron_core::{Point, Segment, stitch};
///
/// let a = Point::new(0.0, 0.0);
/// let b = Point::new(0.0, 1.0);
/// let c = Point::new(1.0, 1.0);
/// let cycle = stitch(&[Segment::new(b, c), Segment::new(a, b), Segment::new(c, a)]).unwrap();
/// assert_eq!(cycle.points(), &[b, c, a]);
/// ```
pub fn stitch(segments: &[Segment]) -> Result<Cycle, MalformedTopology> {
    let edges = distinct_edges(segments)?;
    let first = edges.first().ok_or(MalformedTopology::Empty)?;

    let adjacency = index_endpoints(&edges)?;

    let mut used = vec![false; edges.len()];
    used[0] = true;
    let start = first.a;
    let mut current = first.b;
    let mut points = Vec::with_capacity(edges.len());
    points.push(start);

    for _ in 1..edges.len() {
        let key = PointKey::from(current);
        let next_edge = adjacency
            .get(&key)
            .and_then(|incident| incident.iter().copied().find(|&e| !used[e]));
        let Some(edge_idx) = next_edge else {
            // Every point has degree two, so the only way to run out of
            // unused edges here is to have closed a loop early.
            let unused = used.iter().filter(|u| !**u).count();
            return Err(MalformedTopology::Disconnected {
                unused,
                total: edges.len(),
            });
        };
        used[edge_idx] = true;
        points.push(current);
        current = edges[edge_idx]
            .other(current)
            .ok_or(MalformedTopology::DanglingEndpoint(current))?;
    }

    // The last edge must bring the walk back to where it started.
    if PointKey::from(current) != PointKey::from(start) {
        return Err(MalformedTopology::DanglingEndpoint(current));
    }

    Ok(Cycle::new(points))
}

/// Drop repeated edges, keeping first-seen order, and reject
/// zero-length ones.
fn distinct_edges(segments: &[Segment]) -> Result<Vec<Segment>, MalformedTopology> {
    let mut seen = HashSet::with_capacity(segments.len());
    let mut edges = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.is_degenerate() {
            return Err(MalformedTopology::DegenerateSegment(segment.a));
        }
        let (ka, kb) = (PointKey::from(segment.a), PointKey::from(segment.b));
        let unordered = if ka <= kb { (ka, kb) } else { (kb, ka) };
        if seen.insert(unordered) {
            edges.push(*segment);
        }
    }
    Ok(edges)
}

/// Map every point to the edges touching it, checking that each point
/// has degree exactly two.
fn index_endpoints(edges: &[Segment]) -> Result<HashMap<PointKey, Vec<usize>>, MalformedTopology> {
    let mut adjacency: HashMap<PointKey, Vec<usize>> = HashMap::with_capacity(edges.len());
    let mut representative: HashMap<PointKey, Point> = HashMap::with_capacity(edges.len());
    for (i, edge) in edges.iter().enumerate() {
        for p in [edge.a, edge.b] {
            let key = PointKey::from(p);
            adjacency.entry(key).or_default().push(i);
            representative.entry(key).or_insert(p);
        }
    }

    // Report the first offending point in input order so errors are
    // reproducible.
    for edge in edges {
        for p in [edge.a, edge.b] {
            let key = PointKey::from(p);
            let degree = adjacency.get(&key).map_or(0, Vec::len);
            let point = representative.get(&key).copied().unwrap_or(p);
            match degree {
                2 => {}
                0 | 1 => return Err(MalformedTopology::DanglingEndpoint(point)),
                _ => return Err(MalformedTopology::Branch { point, degree }),
            }
        }
    }
    Ok(adjacency)
}
