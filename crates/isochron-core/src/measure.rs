//! Travel-time measurement: the seam to an external routing service.
//!
//! The sampling loop only knows the [`Measurer`] trait. A networked
//! routing client implements it outside this crate; the built-in
//! [`StraightLineEstimate`] lets the system run offline by turning
//! great-circle distance into a duration at a fixed speed.

use std::future::Future;

use geo::{Distance, Haversine};
use serde::{Deserialize, Serialize};

use crate::types::{Point, Reference};

/// Measures a travel-time-like scalar from a point to a reference.
pub trait Measurer {
    /// Measure from `origin` to `destination`, departing at `at_time`
    /// (Unix seconds).
    ///
    /// Resolves to `None` when no route is available.
    fn measure(
        &self,
        origin: Point,
        destination: &Reference,
        at_time: u64,
    ) -> impl Future<Output = Option<f64>>;
}

/// Great-circle distance between two points, in kilometres, on a
/// sphere of the mean Earth radius.
#[must_use]
pub fn haversine_km(a: Point, b: Point) -> f64 {
    Haversine.distance(geo::Point::new(a.lng, a.lat), geo::Point::new(b.lng, b.lat)) / 1000.0
}

/// Offline estimate: straight-line distance at constant speed.
///
/// Ignores departure time. Destinations farther than `max_km` are
/// reported as unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StraightLineEstimate {
    /// Assumed travel speed in km/h.
    pub speed_kmh: f64,
    /// Distance beyond which no route is reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_km: Option<f64>,
}

impl StraightLineEstimate {
    /// Default travel speed, roughly highway driving.
    pub const DEFAULT_SPEED_KMH: f64 = 80.0;

    /// Duration in seconds, or `None` if out of range.
    #[must_use]
    pub fn estimate(&self, origin: Point, destination: Point) -> Option<f64> {
        let km = haversine_km(origin, destination);
        if self.max_km.is_some_and(|max| km > max) {
            return None;
        }
        Some(km / self.speed_kmh * 3600.0)
    }
}

impl Default for StraightLineEstimate {
    fn default() -> Self {
        Self {
            speed_kmh: Self::DEFAULT_SPEED_KMH,
            max_km: None,
        }
    }
}

impl Measurer for StraightLineEstimate {
    async fn measure(&self, origin: Point, destination: &Reference, _at_time: u64) -> Option<f64> {
        self.estimate(origin, destination.location)
    }
}
