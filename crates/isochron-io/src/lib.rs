//! isochron-io: the filesystem and orchestration layer.
//!
//! - [`CheckpointLog`]: the append-only sampling log, whose row count is
//!   the resume cursor.
//! - [`SamplingLoop`]: cursor, point, timed measurement batch, append;
//!   repeated until stopped.
//! - [`ContourPipeline`]: subset files in, contour artifacts out.
//! - [`Config`]: the TOML configuration every component is built from.
//!
//! Library code only emits `tracing` events; installing a subscriber
//! is the binary's job.

pub mod checkpoint;
pub mod config;
pub mod pipeline;
pub mod sampling;
pub mod subset;

pub use checkpoint::{CheckpointLog, Cursor, LogError, LogSummary};
pub use config::{Config, ConfigError, ContourConfig, EXAMPLE_CONFIG, SamplingConfig};
pub use pipeline::{ContourArtifact, ContourError, ContourPipeline, SubsetOutcome};
pub use sampling::SamplingLoop;
pub use subset::{SubsetError, SubsetNaming, discover_subsets, load_subset};
