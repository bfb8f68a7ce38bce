//! Batch contour reconstruction over numbered point subsets.
//!
//! For each subset: load its points, extract boundary edges, stitch them
//! into one closed cycle and write the contour artifact (plus an
//! optional SVG preview). Subsets are processed from the highest
//! identifier down and share no state, so one malformed subset never
//! affects another.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use isochron_core::{BoundaryExtractor, BoundaryExtractorKind, Cycle, MalformedTopology, stitch};
use isochron_export::{SvgMetadata, to_contour_tsv, to_svg};

use crate::config::ContourConfig;
use crate::subset::{SubsetError, SubsetNaming, discover_subsets, load_subset};

/// Why one subset produced no contour.
#[derive(Debug, thiserror::Error)]
pub enum ContourError {
    /// The subset file could not be read.
    #[error(transparent)]
    Subset(#[from] SubsetError),

    /// The boundary edges do not form a single closed loop.
    #[error("boundary of subset {id} is not a single closed loop: {source}")]
    Topology {
        /// Subset identifier.
        id: u32,
        /// What the stitcher found.
        source: MalformedTopology,
    },

    /// An artifact could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The artifact being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Files written for one subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContourArtifact {
    /// The contour TSV.
    pub contour: PathBuf,
    /// The SVG preview, when enabled.
    pub svg: Option<PathBuf>,
    /// Number of cycle vertices.
    pub vertices: usize,
}

/// Result of processing one subset.
#[derive(Debug)]
pub struct SubsetOutcome {
    /// Subset identifier.
    pub id: u32,
    /// Written artifact, or why there is none.
    pub result: Result<ContourArtifact, ContourError>,
}

impl SubsetOutcome {
    /// Returns `true` if a contour was written.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Turns subset files into contour artifacts.
#[derive(Debug, Clone)]
pub struct ContourPipeline<E = BoundaryExtractorKind> {
    input_dir: PathBuf,
    output_dir: PathBuf,
    input: SubsetNaming,
    output: SubsetNaming,
    extractor: E,
    alpha: f64,
    write_svg: bool,
}

impl ContourPipeline {
    /// Create a pipeline from configuration, using the configured
    /// boundary extractor.
    #[must_use]
    pub fn from_config(config: &ContourConfig) -> Self {
        Self::new(config, config.extractor)
    }
}

impl<E: BoundaryExtractor> ContourPipeline<E> {
    /// Create a pipeline with a custom boundary extractor.
    #[must_use]
    pub fn new(config: &ContourConfig, extractor: E) -> Self {
        Self {
            input_dir: config.input_dir.clone(),
            output_dir: config.output_dir.clone(),
            input: config.input.clone(),
            output: config.output.clone(),
            extractor,
            alpha: config.alpha,
            write_svg: false,
        }
    }

    /// Also write an SVG preview next to each contour, named after the
    /// contour file with `.svg` appended.
    #[must_use]
    pub const fn with_svg(mut self, write_svg: bool) -> Self {
        self.write_svg = write_svg;
        self
    }

    /// Identifiers of the subset files present in the input directory.
    ///
    /// # Errors
    ///
    /// Returns [`SubsetError::Io`] if the directory cannot be listed.
    pub fn discover(&self) -> Result<Vec<u32>, SubsetError> {
        discover_subsets(&self.input_dir, &self.input)
    }

    /// Process every subset in `ids`, highest identifier first.
    ///
    /// Duplicate identifiers are processed once. A failure is recorded
    /// in that subset's outcome and processing continues.
    pub fn process_all(&self, ids: impl IntoIterator<Item = u32>) -> Vec<SubsetOutcome> {
        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.dedup();

        ids.into_iter()
            .map(|id| {
                let result = self.process(id);
                match &result {
                    Ok(artifact) => info!(
                        subset = id,
                        vertices = artifact.vertices,
                        path = %artifact.contour.display(),
                        "contour written"
                    ),
                    Err(e) => warn!(subset = id, error = %e, "contour failed"),
                }
                SubsetOutcome { id, result }
            })
            .collect()
    }

    /// Process a single subset.
    ///
    /// # Errors
    ///
    /// See [`ContourError`].
    pub fn process(&self, id: u32) -> Result<ContourArtifact, ContourError> {
        let points = load_subset(&self.input_dir.join(self.input.file_name(id)))?;
        let edges = self.extractor.extract_boundary(&points, self.alpha);
        let cycle = stitch(&edges).map_err(|source| ContourError::Topology { id, source })?;

        fs::create_dir_all(&self.output_dir).map_err(|source| ContourError::Write {
            path: self.output_dir.clone(),
            source,
        })?;

        let file_name = self.output.file_name(id);
        let contour = self.output_dir.join(&file_name);
        write_artifact(&contour, &to_contour_tsv(&cycle))?;

        let svg = if self.write_svg {
            let path = self.output_dir.join(format!("{file_name}.svg"));
            write_artifact(&path, &self.preview(id, points.len(), &cycle))?;
            Some(path)
        } else {
            None
        };

        Ok(ContourArtifact {
            contour,
            svg,
            vertices: cycle.len(),
        })
    }

    fn preview(&self, id: u32, point_count: usize, cycle: &Cycle) -> String {
        let title = self.output.file_name(id);
        let description = format!(
            "subset {id}: {point_count} points, alpha {}, {} boundary vertices",
            self.alpha,
            cycle.len()
        );
        to_svg(
            std::slice::from_ref(cycle),
            &SvgMetadata {
                title: Some(&title),
                description: Some(&description),
            },
        )
    }
}

fn write_artifact(path: &Path, content: &str) -> Result<(), ContourError> {
    fs::write(path, content).map_err(|source| ContourError::Write {
        path: path.to_owned(),
        source,
    })
}
