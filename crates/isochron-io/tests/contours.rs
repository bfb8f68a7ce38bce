//! From sampling log to contour artifacts.

#![allow(clippy::unwrap_used)]

use std::fs;

use isochron_core::BoundaryExtractorKind;
use isochron_export::parse_contour_tsv;
use isochron_io::{Config, ContourError, ContourPipeline, SamplingLoop, load_subset};

/// Indices 0..85 fill quadtree levels 0 through 3.
const THREE_LEVELS: u64 = 1 + 4 + 16 + 64;

#[tokio::test]
async fn sampling_log_is_a_valid_subset_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.sampling.log_file = dir.path().join("distances.log");
    config.contours.input_dir = dir.path().join("subsets");
    config.contours.output_dir = dir.path().join("contours");
    config.contours.alpha = 0.0;

    SamplingLoop::from_config(&config.sampling, config.estimator)
        .run(Some(THREE_LEVELS))
        .await
        .unwrap();

    fs::create_dir_all(&config.contours.input_dir).unwrap();
    let subset = config
        .contours
        .input_dir
        .join(config.contours.input.file_name(9));
    fs::copy(&config.sampling.log_file, &subset).unwrap();

    let points = load_subset(&subset).unwrap();
    assert_eq!(points.len() as u64, THREE_LEVELS);

    let pipeline = ContourPipeline::from_config(&config.contours).with_svg(true);
    let outcomes = pipeline.process_all(pipeline.discover().unwrap());
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].id, 9);
    let artifact = outcomes[0].result.as_ref().unwrap();
    assert!(artifact.svg.as_ref().unwrap().exists());

    // With alpha 0 the contour is the convex hull: every vertex sits on
    // the outermost ring of sampled cell centers.
    let cycle = parse_contour_tsv(&fs::read_to_string(&artifact.contour).unwrap()).unwrap();
    assert!(cycle.len() >= 4);
    let min_lat = points.iter().map(|p| p.lat).fold(f64::INFINITY, f64::min);
    let max_lat = points.iter().map(|p| p.lat).fold(f64::NEG_INFINITY, f64::max);
    let min_lng = points.iter().map(|p| p.lng).fold(f64::INFINITY, f64::min);
    let max_lng = points.iter().map(|p| p.lng).fold(f64::NEG_INFINITY, f64::max);
    for p in cycle.points() {
        assert!(points.contains(p));
        assert!(p.lat == min_lat || p.lat == max_lat || p.lng == min_lng || p.lng == max_lng);
    }
}

#[test]
fn every_subset_is_attempted_even_after_failures() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.contours.input_dir = dir.path().to_owned();
    config.contours.output_dir = dir.path().join("out");
    config.contours.extractor = BoundaryExtractorKind::AlphaShape;
    config.contours.alpha = 0.0;

    let naming = &config.contours.input;
    // A single point has no boundary to stitch.
    fs::write(dir.path().join(naming.file_name(2)), "lat\tlng\n0\t0\n").unwrap();
    fs::write(dir.path().join(naming.file_name(1)), "lat\tlng\n0\t0\nbad\t1\n").unwrap();
    fs::write(
        dir.path().join(naming.file_name(0)),
        "lat\tlng\n0\t0\n0\t1\n1\t1\n1\t0\n",
    )
    .unwrap();

    let pipeline = ContourPipeline::from_config(&config.contours);
    let outcomes = pipeline.process_all(pipeline.discover().unwrap());
    let ids: Vec<u32> = outcomes.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![2, 1, 0]);

    assert!(matches!(
        outcomes[0].result,
        Err(ContourError::Topology { id: 2, .. })
    ));
    assert!(matches!(outcomes[1].result, Err(ContourError::Subset(_))));
    let square = outcomes[2].result.as_ref().unwrap();
    assert_eq!(square.vertices, 4);
}
