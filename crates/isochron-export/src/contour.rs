//! Contour artifact serializer.
//!
//! A contour artifact is tab-separated text with a `lat\tlng` header and
//! one row per [`Cycle`] vertex in traversal order. The closing edge is
//! implicit: the first vertex is not repeated at the end.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt::Write;

use isochron_core::{Cycle, Point};

/// Header line of a contour artifact.
pub const CONTOUR_HEADER: &str = "lat\tlng";

/// Errors from parsing a contour artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContourParseError {
    /// The first line is not [`CONTOUR_HEADER`].
    #[error("expected header {CONTOUR_HEADER:?}, found {found:?}")]
    Header {
        /// The first line as read.
        found: String,
    },

    /// A vertex row is not two numbers separated by a tab.
    #[error("line {line}: malformed vertex {row:?}")]
    Row {
        /// One-based line number.
        line: usize,
        /// The raw row.
        row: String,
    },
}

/// Serialize a cycle into contour artifact text.
///
/// Every line, including the last, ends with `\n`. Coordinates use the
/// shortest representation that parses back to the same `f64`.
///
/// # Examples
///
/// ```
/// use isochron_core::{Cycle, Point};
/// use isochron_export::to_contour_tsv;
///
/// let cycle = Cycle::new(vec![
///     Point::new(44.5, -123.0),
///     Point::new(45.0, -122.5),
///     Point::new(44.0, -122.0),
/// ]);
/// assert_eq!(
///     to_contour_tsv(&cycle),
///     "lat\tlng\n44.5\t-123\n45\t-122.5\n44\t-122\n",
/// );
/// ```
#[must_use]
pub fn to_contour_tsv(cycle: &Cycle) -> String {
    let mut out = String::with_capacity(16 * (cycle.len() + 1));
    out.push_str(CONTOUR_HEADER);
    out.push('\n');
    for p in cycle.points() {
        let _ = writeln!(out, "{}\t{}", p.lat, p.lng);
    }
    out
}

/// Parse contour artifact text back into a cycle.
///
/// Blank lines are skipped. A file with only a header yields an empty
/// cycle.
///
/// # Errors
///
/// Returns [`ContourParseError::Header`] if the header is missing or
/// wrong, or [`ContourParseError::Row`] for a malformed vertex row.
pub fn parse_contour_tsv(text: &str) -> Result<Cycle, ContourParseError> {
    let mut lines = text.lines().enumerate();
    let header = lines.next().map_or("", |(_, line)| line);
    if header.trim_end() != CONTOUR_HEADER {
        return Err(ContourParseError::Header {
            found: header.to_string(),
        });
    }

    let mut points = Vec::new();
    for (i, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let point = parse_vertex(line).ok_or_else(|| ContourParseError::Row {
            line: i + 1,
            row: line.to_string(),
        })?;
        points.push(point);
    }
    Ok(Cycle::new(points))
}

fn parse_vertex(line: &str) -> Option<Point> {
    let (lat, lng) = line.trim_end().split_once('\t')?;
    Some(Point::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn triangle() -> Cycle {
        Cycle::new(vec![
            Point::new(44.942_9, -123.035_1),
            Point::new(45.515_2, -122.678_4),
            Point::new(44.052_1, -123.086_8),
        ])
    }

    #[test]
    fn empty_cycle_is_header_only() {
        assert_eq!(to_contour_tsv(&Cycle::new(Vec::new())), "lat\tlng\n");
    }

    #[test]
    fn one_row_per_vertex_without_repeating_first() {
        let tsv = to_contour_tsv(&triangle());
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CONTOUR_HEADER);
        assert_eq!(lines[1], "44.9429\t-123.0351");
        assert_eq!(lines[3], "44.0521\t-123.0868");
        assert!(tsv.ends_with('\n'));
    }

    #[test]
    fn parse_reads_back_serialized_cycle() {
        let cycle = triangle();
        assert_eq!(parse_contour_tsv(&to_contour_tsv(&cycle)).unwrap(), cycle);
    }

    #[test]
    fn parse_preserves_full_precision() {
        let cycle = Cycle::new(vec![
            Point::new(0.1 + 0.2, -1.0 / 3.0),
            Point::new(43.123_456_789_012_34, -121.0),
        ]);
        assert_eq!(parse_contour_tsv(&to_contour_tsv(&cycle)).unwrap(), cycle);
    }

    #[test]
    fn parse_tolerates_crlf_and_blank_lines() {
        let cycle = parse_contour_tsv("lat\tlng\r\n1\t2\r\n\r\n3\t4\r\n").unwrap();
        assert_eq!(
            cycle.points(),
            &[Point::new(1.0, 2.0), Point::new(3.0, 4.0)]
        );
    }

    #[test]
    fn parse_rejects_wrong_header() {
        let err = parse_contour_tsv("lng\tlat\n1\t2\n").unwrap_err();
        assert_eq!(
            err,
            ContourParseError::Header {
                found: "lng\tlat".to_string()
            }
        );
        assert!(matches!(
            parse_contour_tsv(""),
            Err(ContourParseError::Header { .. })
        ));
    }

    #[test]
    fn parse_reports_line_of_bad_row() {
        let err = parse_contour_tsv("lat\tlng\n1\t2\n3 4\n").unwrap_err();
        assert_eq!(
            err,
            ContourParseError::Row {
                line: 3,
                row: "3 4".to_string()
            }
        );
    }
}
