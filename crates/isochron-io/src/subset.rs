//! Point subsets: discovery by file name and loading from TSV.
//!
//! A subset file is named `<prefix><id><suffix>`, e.g. `decile_7.tsv`,
//! and holds tab-separated rows whose header names a `lat` and a `lng`
//! column. Other columns are ignored, so a filtered copy of the
//! sampling log is itself a valid subset file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use isochron_core::Point;

/// Errors from discovering or loading subset files.
#[derive(Debug, thiserror::Error)]
pub enum SubsetError {
    /// Directory listing or file read failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The directory or file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The header does not name a required column.
    #[error("{path}: header has no {column:?} column")]
    MissingColumn {
        /// The subset file.
        path: PathBuf,
        /// The absent column name.
        column: &'static str,
    },

    /// A data row is too short or holds a non-numeric coordinate.
    #[error("{path}:{line}: malformed row {row:?}")]
    MalformedRow {
        /// The subset file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The raw row.
        row: String,
    },
}

/// File name pattern `<prefix><id><suffix>` for numbered subsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetNaming {
    /// Text before the identifier.
    pub prefix: String,
    /// Text after the identifier, usually an extension.
    pub suffix: String,
}

impl SubsetNaming {
    /// Create a naming pattern.
    #[must_use]
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Extract the identifier from a file name matching this pattern.
    ///
    /// The part between prefix and suffix must be ASCII digits only.
    ///
    /// # Examples
    ///
    /// ```
    /// use isochron_io::SubsetNaming;
    ///
    /// let naming = SubsetNaming::new("decile_", ".tsv");
    /// assert_eq!(naming.identifier("decile_7.tsv"), Some(7));
    /// assert_eq!(naming.identifier("decile_x.tsv"), None);
    /// assert_eq!(naming.file_name(7), "decile_7.tsv");
    /// ```
    #[must_use]
    pub fn identifier(&self, file_name: &str) -> Option<u32> {
        self.digits(file_name)?.parse().ok()
    }

    /// The identifier text of a matching file name, before it is parsed.
    fn digits<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let digits = file_name
            .strip_prefix(&self.prefix)?
            .strip_suffix(&self.suffix)?;
        (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
    }

    /// Build the file name for `id`.
    #[must_use]
    pub fn file_name(&self, id: u32) -> String {
        format!("{}{id}{}", self.prefix, self.suffix)
    }
}

/// List the identifiers of all files in `dir` matching `naming`, in
/// ascending order.
///
/// Subdirectories and non-UTF-8 names are skipped. A matching name
/// whose identifier does not fit in a `u32` is skipped with a warning.
///
/// # Errors
///
/// Returns [`SubsetError::Io`] if the directory cannot be listed.
pub fn discover_subsets(dir: &Path, naming: &SubsetNaming) -> Result<Vec<u32>, SubsetError> {
    let io_err = |source| SubsetError::Io {
        path: dir.to_owned(),
        source,
    };

    let mut ids = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(digits) = file_name.to_str().and_then(|n| naming.digits(n)) else {
            continue;
        };
        match digits.parse::<u32>() {
            Ok(id) => ids.push(id),
            Err(_) => warn!(
                path = %entry.path().display(),
                "subset identifier out of range, skipping"
            ),
        }
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Read the points of one subset file.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`SubsetError::Io`] if the file cannot be read,
/// [`SubsetError::MissingColumn`] if the header lacks `lat` or `lng`,
/// or [`SubsetError::MalformedRow`] for a row whose coordinates do not
/// parse.
pub fn load_subset(path: &Path) -> Result<Vec<Point>, SubsetError> {
    let text = fs::read_to_string(path).map_err(|source| SubsetError::Io {
        path: path.to_owned(),
        source,
    })?;
    parse_subset(&text, path)
}

fn parse_subset(text: &str, path: &Path) -> Result<Vec<Point>, SubsetError> {
    let mut lines = text.lines().enumerate();
    let header: Vec<&str> = lines
        .next()
        .map_or("", |(_, line)| line)
        .split('\t')
        .map(str::trim)
        .collect();
    let column = |name: &'static str| {
        header
            .iter()
            .position(|&h| h == name)
            .ok_or_else(|| SubsetError::MissingColumn {
                path: path.to_owned(),
                column: name,
            })
    };
    let lat_col = column("lat")?;
    let lng_col = column("lng")?;

    let mut points = Vec::new();
    for (i, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let coordinate = |col: usize| fields.get(col).and_then(|f| f.trim().parse::<f64>().ok());
        match (coordinate(lat_col), coordinate(lng_col)) {
            (Some(lat), Some(lng)) => points.push(Point::new(lat, lng)),
            _ => {
                return Err(SubsetError::MalformedRow {
                    path: path.to_owned(),
                    line: i + 1,
                    row: line.to_string(),
                });
            }
        }
    }
    Ok(points)
}
