//! The append-only sampling log, which is also the resume cursor.
//!
//! There is no separate counter file: the next sample index is the
//! number of data rows already in the log. Every read and append opens
//! the file, does its work and closes it again, so nothing is held open
//! between iterations and a crash can lose at most the row being
//! written. A last row that does not decode as the record at its
//! position was cut short by such a crash: it is not counted, and the
//! next cursor read removes it so that index is sampled again.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use isochron_core::{LogSchema, RecordError, SampleRecord};

/// Errors from reading or appending to the sampling log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log's header is not the one the configured references imply.
    ///
    /// Fatal: an existing log is never reinterpreted or migrated.
    #[error("log header in {path} does not match the configured references\n  expected: {expected:?}\n  found:    {found:?}")]
    SchemaMismatch {
        /// The log file.
        path: PathBuf,
        /// Header the schema requires.
        expected: String,
        /// Header found in the file.
        found: String,
    },

    /// A record's distance count differs from the reference count.
    #[error("record {index} has {found} distances but the log has {expected} references")]
    RecordShape {
        /// Index of the rejected record.
        index: u64,
        /// Reference count.
        expected: usize,
        /// Distances in the record.
        found: usize,
    },

    /// A committed row could not be decoded.
    #[error("{path}:{line}: {source}")]
    MalformedRow {
        /// The log file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The decoding failure.
        source: RecordError,
    },

    /// Reading or writing the log failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The log file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Result of reading the log: its header and where sampling resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// The header line as stored in the file.
    pub header: String,
    /// Index of the next sample to take; equal to the number of data
    /// rows already committed.
    pub next_index: u64,
}

/// Counts over the committed records, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    /// The log file.
    pub path: PathBuf,
    /// Index of the next sample to take.
    pub next_index: u64,
    /// Committed records.
    pub records: u64,
    /// Records with at least one missing measurement.
    pub incomplete: u64,
    /// Missing measurements per reference, in column order.
    pub missing_by_reference: Vec<(String, u64)>,
}

/// Handle to one sampling log file.
#[derive(Debug, Clone)]
pub struct CheckpointLog {
    path: PathBuf,
    schema: LogSchema,
}

impl CheckpointLog {
    /// Create a handle. Nothing is read or written until the first call.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, schema: LogSchema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    /// The log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The column layout rows are written in.
    #[must_use]
    pub const fn schema(&self) -> &LogSchema {
        &self.schema
    }

    /// Read the resume position, initialising the log if needed.
    ///
    /// A missing or empty (whitespace-only) file is (re)written with
    /// just the header, giving `next_index = 0`. Otherwise the first
    /// line must equal the header, ignoring trailing whitespace, and
    /// `next_index` is the number of committed rows after it. An
    /// incomplete last row is truncated from the file.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::SchemaMismatch`] if the header differs, or
    /// [`LogError::Io`] if the file cannot be read, initialised or
    /// truncated.
    pub fn read_cursor(&self) -> Result<Cursor, LogError> {
        let Some(content) = self.read_initialised()? else {
            return Ok(Cursor {
                header: self.schema.header(),
                next_index: 0,
            });
        };
        let (header, rows) = self.split_checked(&content)?;
        let mut next_index = 0;
        let mut last = None;
        for row in rows {
            next_index += 1;
            last = Some(row);
        }

        if let Some((line, row)) = last
            && !self.is_committed(next_index - 1, row)
        {
            self.truncate_last_row(&content, row)?;
            warn!(
                path = %self.path.display(),
                line,
                index = next_index - 1,
                "discarded incomplete last row"
            );
            next_index -= 1;
        }

        Ok(Cursor {
            header: header.to_string(),
            next_index,
        })
    }

    /// Append one record as a new row.
    ///
    /// The row is preceded by a newline, so a previous row without a
    /// trailing newline is never joined onto. Once this returns the
    /// record is committed and counted by the next
    /// [`read_cursor`](Self::read_cursor).
    ///
    /// # Errors
    ///
    /// Returns [`LogError::RecordShape`] if the record's distance count
    /// does not match the schema (nothing is written), or
    /// [`LogError::Io`] if the log is missing or the write fails.
    pub fn append(&self, record: &SampleRecord) -> Result<(), LogError> {
        let expected = self.schema.reference_count();
        if record.distances.len() != expected {
            return Err(LogError::RecordShape {
                index: record.index,
                expected,
                found: record.distances.len(),
            });
        }

        let row = format!("\n{}", self.schema.encode(record));
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        file.write_all(row.as_bytes()).map_err(|e| self.io_err(e))?;
        file.sync_data().map_err(|e| self.io_err(e))
    }

    /// Read back every committed record, in log order.
    ///
    /// A missing log has no records and is not created. An incomplete
    /// last row is skipped but left in place.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::SchemaMismatch`] if the header differs,
    /// [`LogError::MalformedRow`] for a row that does not decode, or
    /// [`LogError::Io`] if the file cannot be read.
    pub fn records(&self) -> Result<Vec<SampleRecord>, LogError> {
        let Some(content) = self.read_existing()? else {
            return Ok(Vec::new());
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let (_, rows) = self.split_checked(&content)?;
        let rows: Vec<(usize, &str)> = rows.collect();
        let committed = match rows.split_last() {
            Some((&(_, last), earlier)) if !self.is_committed(earlier.len() as u64, last) => {
                earlier
            }
            _ => &rows[..],
        };
        committed
            .iter()
            .map(|&(line, row)| {
                self.schema
                    .decode(row)
                    .map_err(|source| LogError::MalformedRow {
                        path: self.path.clone(),
                        line,
                        source,
                    })
            })
            .collect()
    }

    /// Summarise the committed records.
    ///
    /// # Errors
    ///
    /// Same as [`records`](Self::records).
    pub fn summary(&self) -> Result<LogSummary, LogError> {
        let records = self.records()?;
        let mut missing = vec![0u64; self.schema.reference_count()];
        let mut incomplete = 0;
        for record in &records {
            if record.has_sentinel() {
                incomplete += 1;
            }
            for (count, distance) in missing.iter_mut().zip(&record.distances) {
                if distance.is_none() {
                    *count += 1;
                }
            }
        }
        Ok(LogSummary {
            path: self.path.clone(),
            next_index: records.len() as u64,
            records: records.len() as u64,
            incomplete,
            missing_by_reference: self
                .schema
                .references()
                .iter()
                .cloned()
                .zip(missing)
                .collect(),
        })
    }

    /// File contents, or `None` if the file does not exist.
    fn read_existing(&self) -> Result<Option<String>, LogError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// File contents, or `None` after writing a fresh header to a
    /// missing or blank log.
    fn read_initialised(&self) -> Result<Option<String>, LogError> {
        if let Some(content) = self.read_existing()? {
            if !content.trim().is_empty() {
                return Ok(Some(content));
            }
        }
        fs::write(&self.path, self.schema.header()).map_err(|e| self.io_err(e))?;
        info!(path = %self.path.display(), "initialised sampling log");
        Ok(None)
    }

    /// Check the header and return it with the non-blank data rows,
    /// each paired with its one-based line number.
    fn split_checked<'a>(
        &self,
        content: &'a str,
    ) -> Result<(&'a str, impl Iterator<Item = (usize, &'a str)>), LogError> {
        let mut lines = content.lines();
        let header = lines.next().unwrap_or_default();
        if !self.schema.matches_header(header) {
            return Err(LogError::SchemaMismatch {
                path: self.path.clone(),
                expected: self.schema.header(),
                found: header.trim_end().to_string(),
            });
        }
        let rows = lines
            .enumerate()
            .map(|(i, row)| (i + 2, row))
            .filter(|(_, row)| !row.trim().is_empty());
        Ok((header, rows))
    }

    /// Returns `true` if `row` decodes as the record for `position`.
    fn is_committed(&self, position: u64, row: &str) -> bool {
        self.schema
            .decode(row)
            .is_ok_and(|record| record.index == position)
    }

    /// Cut the file back to the end of the line before `row`, which must
    /// be the last non-blank line of `content`.
    fn truncate_last_row(&self, content: &str, row: &str) -> Result<(), LogError> {
        let kept = content.trim_end();
        let start = kept.len() - row.trim_end().len();
        let len = kept[..start].trim_end_matches(['\r', '\n']).len();

        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        file.set_len(len as u64).map_err(|e| self.io_err(e))?;
        file.sync_data().map_err(|e| self.io_err(e))
    }

    fn io_err(&self, source: std::io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
