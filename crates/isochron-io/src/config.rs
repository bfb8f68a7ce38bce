//! Configuration for a sampling run and for contour reconstruction.
//!
//! A [`Config`] is read once at process start from a TOML file and
//! passed explicitly to every component constructor. Every field has a
//! default, so an empty file (or no file at all) reproduces the stock
//! deployment: three Oregon cities sampled over most of the state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use isochron_core::{
    BoundaryExtractorKind, BoundingBox, Interval, LogSchema, Point, Reference, SpaceSampler,
    StraightLineEstimate,
};

use crate::subset::SubsetNaming;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling region, reference set and log location.
    pub sampling: SamplingConfig,

    /// Offline travel-time estimator.
    pub estimator: StraightLineEstimate,

    /// Contour reconstruction inputs and outputs.
    pub contours: ContourConfig,
}

/// Settings for the sampling loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Region to sample.
    pub bounds: BoundingBox,

    /// Reference locations, in log column order.
    ///
    /// Changing the names or their order makes an existing log
    /// unreadable.
    pub references: Vec<Reference>,

    /// Path of the append-only sampling log.
    pub log_file: PathBuf,

    /// Wall-clock limit for one batch of measurements, in seconds.
    pub timeout_secs: u64,

    /// Departure time passed to every measurement (Unix seconds).
    pub departure_time: u64,
}

impl SamplingConfig {
    /// Default batch timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// 2018-01-01T00:00:00Z.
    pub const DEFAULT_DEPARTURE_TIME: u64 = 1_514_764_800;

    /// The batch timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Log column layout for the configured references.
    #[must_use]
    pub fn schema(&self) -> LogSchema {
        LogSchema::new(self.references.iter().map(|r| r.name.as_str()))
    }

    /// Sampler over the configured bounds.
    #[must_use]
    pub const fn sampler(&self) -> SpaceSampler {
        SpaceSampler::new(self.bounds)
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::new(
                Interval::new(42.0, 46.291_719),
                Interval::new(-124.565_233, -116.463_761),
            ),
            references: vec![
                Reference::new("Salem, OR", Point::new(44.942_9, -123.035_1)),
                Reference::new("Portland, OR", Point::new(45.515_2, -122.678_4)),
                Reference::new("Eugene, OR", Point::new(44.052_1, -123.086_8)),
            ],
            log_file: PathBuf::from("distances.log"),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            departure_time: Self::DEFAULT_DEPARTURE_TIME,
        }
    }
}

/// Settings for the contour pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Directory holding subset files.
    pub input_dir: PathBuf,

    /// Directory contour artifacts are written to.
    pub output_dir: PathBuf,

    /// Subset file name pattern.
    pub input: SubsetNaming,

    /// Contour artifact file name pattern.
    pub output: SubsetNaming,

    /// Boundary extraction algorithm.
    pub extractor: BoundaryExtractorKind,

    /// Shape parameter; the probe radius is `1 / alpha` degrees and
    /// `0` gives the convex hull.
    pub alpha: f64,
}

impl ContourConfig {
    /// Default shape parameter: a half-degree probe radius.
    pub const DEFAULT_ALPHA: f64 = 2.0;
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            input: SubsetNaming::new("decile_", ".tsv"),
            output: SubsetNaming::new("contour_", ".tsv"),
            extractor: BoundaryExtractorKind::default(),
            alpha: Self::DEFAULT_ALPHA,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("at least one reference location is required")]
    NoReferences,

    #[error("reference {0:?} is listed more than once")]
    DuplicateReference(String),

    #[error("reference name {0:?} must be non-empty and free of tabs and newlines")]
    InvalidReferenceName(String),

    #[error("reference {0:?} has a non-finite location")]
    InvalidReferenceLocation(String),

    #[error("sampling bounds must be finite")]
    NonFiniteBounds,

    #[error("batch timeout must be at least one second")]
    ZeroTimeout,

    #[error("estimator speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),

    #[error("alpha must be non-negative and finite, got {0}")]
    InvalidAlpha(f64),
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be read or
    /// [`ConfigError::Parse`] if it is not valid configuration TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file), except for `NotFound`.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::from_file(path) {
            Err(ConfigError::FileRead { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sampling = &self.sampling;
        if sampling.references.is_empty() {
            return Err(ConfigError::NoReferences);
        }
        let mut seen = HashSet::new();
        for reference in &sampling.references {
            let name = &reference.name;
            if name.is_empty() || name.contains(['\t', '\n', '\r']) {
                return Err(ConfigError::InvalidReferenceName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateReference(name.clone()));
            }
            if !reference.location.is_finite() {
                return Err(ConfigError::InvalidReferenceLocation(name.clone()));
            }
        }
        if !sampling.bounds.is_finite() {
            return Err(ConfigError::NonFiniteBounds);
        }
        if sampling.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let speed = self.estimator.speed_kmh;
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ConfigError::InvalidSpeed(speed));
        }

        let alpha = self.contours.alpha;
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(ConfigError::InvalidAlpha(alpha));
        }
        Ok(())
    }
}

/// A commented configuration file equal to [`Config::default`].
pub const EXAMPLE_CONFIG: &str = r#"# isochron configuration. Every key is optional.

[sampling]
# Region to sample, as [min, max] per axis in decimal degrees.
bounds = { lat = [42.0, 46.291719], lng = [-124.565233, -116.463761] }
# Append-only log; its row count is the resume position.
log_file = "distances.log"
# Wall-clock limit for one batch of measurements.
timeout_secs = 10
# Departure time for every measurement (Unix seconds).
departure_time = 1514764800

# Reference locations, in log column order. Renaming or reordering
# them makes an existing log unreadable.
[[sampling.references]]
name = "Salem, OR"
lat = 44.9429
lng = -123.0351

[[sampling.references]]
name = "Portland, OR"
lat = 45.5152
lng = -122.6784

[[sampling.references]]
name = "Eugene, OR"
lat = 44.0521
lng = -123.0868

[estimator]
# Straight-line travel speed used when no routing service is wired in.
speed_kmh = 80.0
# Farther destinations are recorded as unreachable.
# max_km = 400.0

[contours]
input_dir = "."
output_dir = "."
input = { prefix = "decile_", suffix = ".tsv" }
output = { prefix = "contour_", suffix = ".tsv" }
extractor = "alpha_shape"
# Probe radius is 1 / alpha degrees; 0 gives the convex hull.
alpha = 2.0
"#;
