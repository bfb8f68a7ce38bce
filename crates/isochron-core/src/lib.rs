//! isochron-core: sampling order, log rows and contour geometry (sans-IO).
//!
//! Two halves share these types:
//!
//! - **Sampling.** [`SpaceSampler`] maps an integer index to a point in a
//!   bounding box so that every prefix of the sequence covers the box
//!   evenly. [`LogSchema`] turns a [`SampleRecord`] into one tab-separated
//!   log row and back.
//! - **Contours.** A [`BoundaryExtractor`] finds the outline edges of a
//!   point cloud, and [`stitch`] orders those edges into a single closed
//!   [`Cycle`].
//!
//! This crate has **no I/O dependencies**. Files, timeouts and the
//! measurement loop live in `isochron-io`.

pub mod boundary;
pub mod measure;
pub mod record;
pub mod sampler;
pub mod stitch;
pub mod types;

pub use boundary::{BoundaryExtractor, BoundaryExtractorKind, alpha_shape};
pub use measure::{Measurer, StraightLineEstimate, haversine_km};
pub use record::{Aggregates, LogSchema, RecordError, SENTINEL, SampleRecord};
pub use sampler::SpaceSampler;
pub use stitch::{MalformedTopology, stitch};
pub use types::{BoundingBox, Cycle, Interval, Point, Reference, Segment};
