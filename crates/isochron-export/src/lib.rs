//! isochron-export: Pure contour serializers (sans-IO)
//!
//! Converts stitched [`Cycle`](isochron_core::Cycle)s into output
//! formats: the tab-separated contour artifact and an SVG preview.

pub mod contour;
pub mod svg;

pub use contour::{CONTOUR_HEADER, ContourParseError, parse_contour_tsv, to_contour_tsv};
pub use svg::{SvgMetadata, to_svg};
