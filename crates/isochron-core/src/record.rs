//! Sample records and the tab-separated row format of the sampling log.
//!
//! A log row is
//!
//! ```text
//! point  lat  lng  <reference>...  min  max  sum
//! ```
//!
//! with one distance column per reference location. A distance that
//! could not be measured, or is not a finite number, is written as
//! [`SENTINEL`]. The three aggregate
//! columns are only meaningful when every distance was measured, so a
//! record with any sentinel writes the sentinel in all three.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Column value recorded in place of a missing measurement.
pub const SENTINEL: &str = "NA";

/// Column delimiter.
pub const DELIMITER: char = '\t';

const LEADING_COLUMNS: [&str; 3] = ["point", "lat", "lng"];
const TRAILING_COLUMNS: [&str; 3] = ["min", "max", "sum"];

/// One sampled point and its measurement to every reference location.
///
/// `distances[i]` belongs to reference `i`; `None` means the
/// measurement failed or timed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Position in the sampling sequence.
    pub index: u64,
    /// Where the sample was taken.
    pub point: Point,
    /// One entry per reference location, in reference order.
    pub distances: Vec<Option<f64>>,
}

/// Summary of a fully measured record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    /// Smallest distance.
    pub min: f64,
    /// Largest distance.
    pub max: f64,
    /// Sum of all distances.
    pub sum: f64,
}

impl SampleRecord {
    /// Create a new record.
    #[must_use]
    pub const fn new(index: u64, point: Point, distances: Vec<Option<f64>>) -> Self {
        Self {
            index,
            point,
            distances,
        }
    }

    /// Returns `true` if any distance is missing or non-finite, i.e.
    /// would be written as [`SENTINEL`].
    #[must_use]
    pub fn has_sentinel(&self) -> bool {
        self.distances
            .iter()
            .any(|d| d.is_none_or(|v| !v.is_finite()))
    }

    /// `min`, `max` and `sum` over the distances.
    ///
    /// Returns `None` if any distance is missing or non-finite, or there
    /// are no distances at all.
    #[must_use]
    pub fn aggregates(&self) -> Option<Aggregates> {
        let values: Option<Vec<f64>> = self
            .distances
            .iter()
            .map(|d| d.filter(|v| v.is_finite()))
            .collect();
        let values = values?;
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;
        Some(Aggregates {
            min,
            max,
            sum: values.iter().sum(),
        })
    }
}

/// Errors from decoding a log row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The row does not have one column per header column.
    #[error("expected {expected} columns, found {found}")]
    ColumnCount {
        /// Columns required by the schema.
        expected: usize,
        /// Columns present in the row.
        found: usize,
    },

    /// A column could not be parsed.
    #[error("invalid {column} value {value:?}")]
    InvalidValue {
        /// Header name of the offending column.
        column: String,
        /// The raw text.
        value: String,
    },
}

/// The column layout of one sampling log.
///
/// Built from the ordered reference names. The names and their order
/// are fixed for the lifetime of a log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSchema {
    references: Vec<String>,
}

impl LogSchema {
    /// Create a schema for the given reference names.
    #[must_use]
    pub fn new<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            references: references.into_iter().map(Into::into).collect(),
        }
    }

    /// Reference names, in column order.
    #[must_use]
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Number of distance columns.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Total number of columns in a row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        LEADING_COLUMNS.len() + self.references.len() + TRAILING_COLUMNS.len()
    }

    /// All column names, in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        LEADING_COLUMNS
            .into_iter()
            .chain(self.references.iter().map(String::as_str))
            .chain(TRAILING_COLUMNS)
    }

    /// The canonical header line (no trailing newline).
    #[must_use]
    pub fn header(&self) -> String {
        let mut header = String::new();
        for (i, column) in self.columns().enumerate() {
            if i > 0 {
                header.push(DELIMITER);
            }
            header.push_str(column);
        }
        header
    }

    /// Returns `true` if `line` is this schema's header, ignoring
    /// trailing whitespace.
    #[must_use]
    pub fn matches_header(&self, line: &str) -> bool {
        line.trim_end() == self.header()
    }

    /// Serialize a record as one row (no trailing newline).
    ///
    /// Does not check the distance count; callers that persist rows
    /// must reject records whose shape does not match the schema.
    #[must_use]
    pub fn encode(&self, record: &SampleRecord) -> String {
        let mut row = String::new();
        let _ = write!(
            row,
            "{}{DELIMITER}{}{DELIMITER}{}",
            record.index, record.point.lat, record.point.lng
        );
        for distance in &record.distances {
            row.push(DELIMITER);
            push_optional(&mut row, *distance);
        }
        let aggregates = record.aggregates();
        for value in [
            aggregates.map(|a| a.min),
            aggregates.map(|a| a.max),
            aggregates.map(|a| a.sum),
        ] {
            row.push(DELIMITER);
            push_optional(&mut row, value);
        }
        row
    }

    /// Parse one row back into a record.
    ///
    /// The aggregate columns are derived data and are not read back.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ColumnCount`] if the row is the wrong
    /// width, or [`RecordError::InvalidValue`] if a column does not parse.
    pub fn decode(&self, row: &str) -> Result<SampleRecord, RecordError> {
        let fields: Vec<&str> = row.trim_end_matches(['\r', '\n']).split(DELIMITER).collect();
        if fields.len() != self.column_count() {
            return Err(RecordError::ColumnCount {
                expected: self.column_count(),
                found: fields.len(),
            });
        }

        let index = fields[0]
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid("point", fields[0]))?;
        let lat = parse_number("lat", fields[1])?;
        let lng = parse_number("lng", fields[2])?;

        let distances = self
            .references
            .iter()
            .zip(&fields[LEADING_COLUMNS.len()..])
            .map(|(name, field)| parse_optional(name, field))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SampleRecord::new(index, Point::new(lat, lng), distances))
    }
}

fn push_optional(out: &mut String, value: Option<f64>) {
    match value {
        Some(v) if v.is_finite() => {
            let _ = write!(out, "{v}");
        }
        _ => out.push_str(SENTINEL),
    }
}

fn invalid(column: &str, value: &str) -> RecordError {
    RecordError::InvalidValue {
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn parse_number(column: &str, field: &str) -> Result<f64, RecordError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid(column, field))
}

fn parse_optional(column: &str, field: &str) -> Result<Option<f64>, RecordError> {
    if field.trim() == SENTINEL {
        Ok(None)
    } else {
        parse_number(column, field).map(Some)
    }
}
