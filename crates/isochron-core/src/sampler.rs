//! Deterministic index-to-point subdivision of the sampling region.
//!
//! The box is treated as a quadtree. Level `L` partitions it into
//! `2^L x 2^L` equal cells; indices are assigned level by level, so
//! index 0 is the center of the whole box, indices 1..=4 are the
//! centers of its four quadrants, indices 5..=20 the centers of the 16
//! level-2 cells, and so on.
//!
//! Within a level, the cell for local offset `k` is found by reading the
//! base-4 digits of `k` least-significant first and using each digit to
//! choose a quadrant one level deeper. Consecutive indices therefore
//! land in different top-level quadrants, which is what keeps every
//! prefix of the sequence spread evenly over the box (a 2-D analogue
//! of the van der Corput sequence).
//!
//! Cell centers at level `L` have odd numerators over `2^(L+1)`, so no
//! two indices ever map to the same point until `f64` precision runs
//! out.

use crate::types::{BoundingBox, Point};

/// Quadrant chosen by each base-4 digit, as `(lat bit, lng bit)`.
///
/// Diagonal quadrants come first so the first two children of any
/// cell are as far apart as possible.
const QUADRANTS: [(u64, u64); 4] = [(0, 0), (1, 1), (1, 0), (0, 1)];

/// Maps sample indices to coordinates inside a fixed bounding box.
///
/// Pure and stateless apart from the box: [`locate`](Self::locate)
/// returns the same point for the same index on every call and in
/// every process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceSampler {
    bounds: BoundingBox,
}

impl SpaceSampler {
    /// Create a sampler over `bounds`.
    #[must_use]
    pub const fn new(bounds: BoundingBox) -> Self {
        Self { bounds }
    }

    /// The region being sampled.
    #[must_use]
    pub const fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Coordinate for sample `index`.
    #[must_use]
    pub fn locate(&self, index: u64) -> Point {
        let (u, v) = unit_square(index);
        self.bounds.at(u, v)
    }
}

/// Position of sample `index` in the unit square, as `(u, v)` with
/// `u` on the latitude axis and `v` on the longitude axis.
#[must_use]
pub fn unit_square(index: u64) -> (f64, f64) {
    let (level, local) = level_and_offset(index);

    let mut row: u64 = 0;
    let mut col: u64 = 0;
    let mut rest = local;
    for _ in 0..level {
        #[allow(clippy::cast_possible_truncation)]
        let (dr, dc) = QUADRANTS[(rest & 3) as usize];
        rest >>= 2;
        row = (row << 1) | dr;
        col = (col << 1) | dc;
    }

    #[allow(clippy::cast_possible_wrap)]
    let cells = 2f64.powi(level as i32);
    #[allow(clippy::cast_precision_loss)]
    let u = (row as f64 + 0.5) / cells;
    #[allow(clippy::cast_precision_loss)]
    let v = (col as f64 + 0.5) / cells;
    (u, v)
}

/// Split an index into its quadtree level and its offset within that
/// level.
///
/// Level `L` holds `4^L` indices starting at `(4^L - 1) / 3`.
fn level_and_offset(index: u64) -> (u32, u128) {
    let index = u128::from(index);
    let mut level = 0;
    let mut start: u128 = 0;
    let mut cells: u128 = 1;
    while index >= start + cells {
        start += cells;
        cells *= 4;
        level += 1;
    }
    (level, index - start)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::types::Interval;

    fn square(size: f64) -> SpaceSampler {
        SpaceSampler::new(BoundingBox::new(
            Interval::new(0.0, size),
            Interval::new(0.0, size),
        ))
    }

    fn min_pairwise_distance(points: &[Point]) -> f64 {
        let mut best = f64::INFINITY;
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                best = best.min(a.distance(*b));
            }
        }
        best
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(level_and_offset(0), (0, 0));
        assert_eq!(level_and_offset(1), (1, 0));
        assert_eq!(level_and_offset(4), (1, 3));
        assert_eq!(level_and_offset(5), (2, 0));
        assert_eq!(level_and_offset(20), (2, 15));
        assert_eq!(level_and_offset(21), (3, 0));
    }

    #[test]
    fn index_zero_is_box_center() {
        let sampler = SpaceSampler::new(BoundingBox::new(
            Interval::new(42.0, 46.291_719),
            Interval::new(-116.463_761, -124.565_233),
        ));
        assert_eq!(sampler.locate(0), sampler.bounds().center());
    }

    #[test]
    fn first_level_visits_all_quadrants() {
        let sampler = square(8.0);
        let level_one: Vec<Point> = (1..=4).map(|i| sampler.locate(i)).collect();
        assert_eq!(
            level_one,
            vec![
                Point::new(2.0, 2.0),
                Point::new(6.0, 6.0),
                Point::new(6.0, 2.0),
                Point::new(2.0, 6.0),
            ]
        );
    }

    #[test]
    fn locate_is_deterministic() {
        let a = square(8.0);
        let b = square(8.0);
        for i in [0, 1, 7, 63, 1_000, 123_456_789, u64::MAX] {
            assert_eq!(a.locate(i), a.locate(i));
            assert_eq!(a.locate(i), b.locate(i));
        }
    }

    #[test]
    fn points_stay_inside_box() {
        let sampler = SpaceSampler::new(BoundingBox::new(
            Interval::new(42.0, 46.291_719),
            Interval::new(-124.565_233, -116.463_761),
        ));
        for i in (0..2_000).chain([u64::MAX - 1, u64::MAX]) {
            let p = sampler.locate(i);
            assert!(sampler.bounds().contains(p), "index {i} -> {p:?}");
        }
    }

    #[test]
    fn small_indices_never_collide() {
        let sampler = square(8.0);
        let mut seen = HashSet::new();
        for i in 0..20_000 {
            let p = sampler.locate(i);
            assert!(
                seen.insert((p.lat.to_bits(), p.lng.to_bits())),
                "index {i} repeats {p:?}"
            );
        }
    }

    #[test]
    fn coverage_threshold_holds_for_every_prefix() {
        // Minimum pairwise spacing shrinks as the prefix grows, but stays
        // above 2 / sqrt(n) on an 8x8 box.
        let sampler = square(8.0);
        let points: Vec<Point> = (0..64).map(|i| sampler.locate(i)).collect();

        let mut previous = f64::INFINITY;
        for n in 2..=points.len() {
            let spacing = min_pairwise_distance(&points[..n]);
            #[allow(clippy::cast_precision_loss)]
            let threshold = 2.0 / (n as f64).sqrt();
            assert!(
                spacing > threshold,
                "prefix {n}: spacing {spacing} <= threshold {threshold}"
            );
            assert!(spacing <= previous, "spacing grew at prefix {n}");
            previous = spacing;
        }
    }

    #[test]
    fn complete_level_covers_every_cell() {
        // Indices 0..21 complete level 2: one point in each 2x2 cell.
        let sampler = square(8.0);
        let mut cells = HashSet::new();
        for i in 5..21 {
            let p = sampler.locate(i);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            cells.insert(((p.lat / 2.0) as u32, (p.lng / 2.0) as u32));
        }
        assert_eq!(cells.len(), 16);
    }
}
