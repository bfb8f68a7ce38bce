//! SVG preview serializer.
//!
//! Renders contour cycles into an SVG string with one closed `<path>`
//! per cycle, using the [`svg`] crate for document construction, XML
//! escaping, and path data formatting.
//!
//! Longitude runs along the x axis and latitude is flipped onto the y
//! axis so north is up. The `viewBox` is fitted to the bounding box of
//! all cycles, scaled so the longer side spans [`CANVAS_SIZE`] units.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Path, Title};
use svg::node::{Text, Value};

use isochron_core::{Cycle, Point};

/// Length of the longer `viewBox` side, margins included.
pub const CANVAS_SIZE: f64 = 1000.0;

/// Blank border around the drawing, in `viewBox` units.
const MARGIN: f64 = 10.0;

/// Metadata to embed in the SVG document.
///
/// Both fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the contour artifact name.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,
}

/// Maps geographic coordinates into `viewBox` space.
#[derive(Debug, Clone, Copy)]
struct Projection {
    min_lng: f64,
    max_lat: f64,
    scale: f64,
    width: f64,
    height: f64,
}

impl Projection {
    /// Fit the finite points of `cycles`; falls back to an empty extent
    /// at the origin when there are none.
    fn fit(cycles: &[Cycle]) -> Self {
        let mut points = cycles
            .iter()
            .flat_map(Cycle::points)
            .copied()
            .filter(|p| p.is_finite());

        let (mut min_lat, mut max_lat, mut min_lng, mut max_lng) = points
            .next()
            .map_or((0.0, 0.0, 0.0, 0.0), |p| (p.lat, p.lat, p.lng, p.lng));
        for p in points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }

        let lat_span = max_lat - min_lat;
        let lng_span = max_lng - min_lng;
        let longer = lat_span.max(lng_span);
        let scale = if longer > 0.0 {
            (CANVAS_SIZE - 2.0 * MARGIN) / longer
        } else {
            1.0
        };

        Self {
            min_lng,
            max_lat,
            scale,
            width: lng_span.mul_add(scale, 2.0 * MARGIN),
            height: lat_span.mul_add(scale, 2.0 * MARGIN),
        }
    }

    fn project(&self, p: Point) -> (f64, f64) {
        (
            (p.lng - self.min_lng).mul_add(self.scale, MARGIN),
            (self.max_lat - p.lat).mul_add(self.scale, MARGIN),
        )
    }
}

/// Build the closed SVG path `d` attribute for one cycle.
///
/// Returns an empty string for cycles with fewer than 2 points.
fn build_path_data(cycle: &Cycle, projection: &Projection) -> String {
    let points = cycle.points();
    if points.len() < 2 {
        return String::new();
    }

    let mut data = Data::new().move_to(projection.project(points[0]));
    for p in &points[1..] {
        data = data.line_to(projection.project(*p));
    }
    String::from(Value::from(data.close()))
}

/// Serialize contour cycles into an SVG document string.
///
/// Each cycle becomes one `<path>` element closed back to its first
/// vertex. Cycles with fewer than 2 points are skipped.
#[must_use]
pub fn to_svg(cycles: &[Cycle], metadata: &SvgMetadata<'_>) -> String {
    let projection = Projection::fit(cycles);
    let (width, height) = (projection.width, projection.height);

    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", format!("0 0 {width} {height}"));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    for cycle in cycles {
        let d = build_path_data(cycle, &projection);
        if d.is_empty() {
            continue;
        }

        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1);
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
