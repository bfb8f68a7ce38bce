//! The resumable sampling loop.
//!
//! Each iteration reads the cursor from the log, locates the next point,
//! measures it against every reference under one wall-clock timeout and
//! appends the result. Nothing is kept between iterations, so stopping
//! the process at any moment and starting it again continues from the
//! first index not yet in the log.

use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use isochron_core::{LogSchema, Measurer, Point, Reference, SampleRecord, SpaceSampler};

use crate::checkpoint::{CheckpointLog, LogError};
use crate::config::SamplingConfig;

/// Drives sampling: cursor, point, measurements, append.
#[derive(Debug)]
pub struct SamplingLoop<M> {
    sampler: SpaceSampler,
    log: CheckpointLog,
    references: Vec<Reference>,
    measurer: M,
    timeout: Duration,
    departure_time: u64,
}

impl<M: Measurer> SamplingLoop<M> {
    /// Create a loop writing to `log_path`.
    ///
    /// The log schema is derived from `references`, so the two can
    /// never disagree. Timeout and departure time start at the
    /// [`SamplingConfig`] defaults.
    pub fn new(
        sampler: SpaceSampler,
        log_path: impl Into<PathBuf>,
        references: Vec<Reference>,
        measurer: M,
    ) -> Self {
        let schema = LogSchema::new(references.iter().map(|r| r.name.as_str()));
        Self {
            sampler,
            log: CheckpointLog::new(log_path, schema),
            references,
            measurer,
            timeout: Duration::from_secs(SamplingConfig::DEFAULT_TIMEOUT_SECS),
            departure_time: SamplingConfig::DEFAULT_DEPARTURE_TIME,
        }
    }

    /// Create a loop from configuration.
    pub fn from_config(config: &SamplingConfig, measurer: M) -> Self {
        Self::new(
            config.sampler(),
            config.log_file.clone(),
            config.references.clone(),
            measurer,
        )
        .with_timeout(config.timeout())
        .with_departure_time(config.departure_time)
    }

    /// Set the wall-clock limit for one batch of measurements.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the departure time passed to every measurement.
    #[must_use]
    pub const fn with_departure_time(mut self, departure_time: u64) -> Self {
        self.departure_time = departure_time;
        self
    }

    /// The log this loop appends to.
    #[must_use]
    pub const fn log(&self) -> &CheckpointLog {
        &self.log
    }

    /// Run one iteration and return the committed record.
    ///
    /// # Errors
    ///
    /// Returns a [`LogError`] if the cursor cannot be read (including a
    /// schema mismatch) or the append fails. A measurement timeout is
    /// not an error: it is recorded as missing distances.
    #[allow(clippy::future_not_send)] // single-threaded runtime; the measurer need not be Send
    pub async fn step(&self) -> Result<SampleRecord, LogError> {
        let index = self.log.read_cursor()?.next_index;
        let point = self.sampler.locate(index);
        let distances = self.measure_all(index, point).await;

        let record = SampleRecord::new(index, point, distances);
        self.log.append(&record)?;
        debug!(
            index,
            lat = point.lat,
            lng = point.lng,
            missing = record.distances.iter().filter(|d| d.is_none()).count(),
            "sample committed"
        );
        Ok(record)
    }

    /// Run `limit` iterations, or forever if `limit` is `None`.
    ///
    /// Returns the number of records committed.
    ///
    /// # Errors
    ///
    /// Stops at the first [`LogError`].
    #[allow(clippy::future_not_send)]
    pub async fn run(&self, limit: Option<u64>) -> Result<u64, LogError> {
        self.announce_resume()?;
        let mut committed = 0;
        while limit.is_none_or(|limit| committed < limit) {
            self.step().await?;
            committed += 1;
        }
        Ok(committed)
    }

    /// Sample until a fatal error.
    ///
    /// # Errors
    ///
    /// Only ever returns the [`LogError`] that stopped the loop.
    #[allow(clippy::future_not_send)]
    pub async fn run_forever(&self) -> Result<Infallible, LogError> {
        self.announce_resume()?;
        loop {
            self.step().await?;
        }
    }

    fn announce_resume(&self) -> Result<(), LogError> {
        let next_index = self.log.read_cursor()?.next_index;
        info!(
            path = %self.log.path().display(),
            next_index,
            references = self.references.len(),
            "resuming sampling"
        );
        Ok(())
    }

    /// Measure `point` against every reference within one timeout.
    ///
    /// Non-finite results count as missing. On timeout the whole batch is discarded, so a record is either
    /// fully measured or marks every reference as missing.
    #[allow(clippy::future_not_send)]
    async fn measure_all(&self, index: u64, point: Point) -> Vec<Option<f64>> {
        let batch = async {
            let mut distances = Vec::with_capacity(self.references.len());
            for reference in &self.references {
                let distance = self
                    .measurer
                    .measure(point, reference, self.departure_time)
                    .await;
                if let Some(value) = distance.filter(|v| !v.is_finite()) {
                    warn!(
                        index,
                        reference = %reference.name,
                        value,
                        "discarding non-finite measurement"
                    );
                }
                distances.push(distance.filter(|v| v.is_finite()));
            }
            distances
        };

        if let Ok(distances) = tokio::time::timeout(self.timeout, batch).await {
            distances
        } else {
            warn!(
                index,
                timeout_secs = self.timeout.as_secs_f64(),
                "measurement batch timed out"
            );
            vec![None; self.references.len()]
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::fs;

    use isochron_core::{BoundingBox, Interval};

    use super::*;

    /// Reports 100 times the destination latitude after `delay`, `None`
    /// for the `unreachable` reference and NaN for the `garbled` one.
    /// Remembers the last departure time it was given.
    struct Scripted {
        unreachable: &'static str,
        garbled: &'static str,
        delay: Duration,
        last_departure: Cell<u64>,
    }

    impl Scripted {
        fn instant() -> Self {
            Self {
                unreachable: "",
                garbled: "",
                delay: Duration::ZERO,
                last_departure: Cell::new(0),
            }
        }
    }

    impl Measurer for Scripted {
        async fn measure(&self, _origin: Point, destination: &Reference, at_time: u64) -> Option<f64> {
            self.last_departure.set(at_time);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if destination.name == self.unreachable {
                return None;
            }
            if destination.name == self.garbled {
                return Some(f64::NAN);
            }
            Some(destination.location.lat * 100.0)
        }
    }

    fn references() -> Vec<Reference> {
        vec![
            Reference::new("A", Point::new(1.0, 0.0)),
            Reference::new("B", Point::new(2.0, 0.0)),
            Reference::new("C", Point::new(3.0, 0.0)),
        ]
    }

    fn sampler() -> SpaceSampler {
        SpaceSampler::new(BoundingBox::new(
            Interval::new(0.0, 8.0),
            Interval::new(0.0, 8.0),
        ))
    }

    fn looper(dir: &tempfile::TempDir, measurer: Scripted) -> SamplingLoop<Scripted> {
        SamplingLoop::new(
            sampler(),
            dir.path().join("distances.log"),
            references(),
            measurer,
        )
    }

    #[tokio::test]
    async fn first_step_initialises_log_and_samples_center() {
        let dir = tempfile::tempdir().unwrap();
        let sampling = looper(&dir, Scripted::instant());

        let record = sampling.step().await.unwrap();
        assert_eq!(record.index, 0);
        assert_eq!(record.point, Point::new(4.0, 4.0));
        assert_eq!(record.distances, vec![Some(100.0), Some(200.0), Some(300.0)]);

        let content = fs::read_to_string(sampling.log().path()).unwrap();
        assert_eq!(
            content,
            "point\tlat\tlng\tA\tB\tC\tmin\tmax\tsum\n0\t4\t4\t100\t200\t300\t100\t300\t600"
        );
    }

    #[tokio::test]
    async fn run_with_limit_commits_consecutive_indices() {
        let dir = tempfile::tempdir().unwrap();
        let sampling = looper(&dir, Scripted::instant());

        assert_eq!(sampling.run(Some(6)).await.unwrap(), 6);
        let records = sampling.log().records().unwrap();
        let indices: Vec<u64> = records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        for r in &records {
            assert_eq!(r.point, sampler().locate(r.index));
        }
    }

    #[tokio::test]
    async fn run_with_zero_limit_only_initialises() {
        let dir = tempfile::tempdir().unwrap();
        let sampling = looper(&dir, Scripted::instant());
        assert_eq!(sampling.run(Some(0)).await.unwrap(), 0);
        assert_eq!(sampling.log().read_cursor().unwrap().next_index, 0);
    }

    #[tokio::test]
    async fn unavailable_route_is_recorded_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let measurer = Scripted {
            unreachable: "B",
            ..Scripted::instant()
        };
        let sampling = looper(&dir, measurer);

        let record = sampling.step().await.unwrap();
        assert_eq!(record.distances, vec![Some(100.0), None, Some(300.0)]);
        let content = fs::read_to_string(sampling.log().path()).unwrap();
        assert!(content.ends_with("100\tNA\t300\tNA\tNA\tNA"));
    }

    #[tokio::test]
    async fn nan_measurement_is_recorded_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let measurer = Scripted {
            garbled: "A",
            ..Scripted::instant()
        };
        let sampling = looper(&dir, measurer);

        let record = sampling.step().await.unwrap();
        assert_eq!(record.distances, vec![None, Some(200.0), Some(300.0)]);
        assert_eq!(record.aggregates(), None);
        let content = fs::read_to_string(sampling.log().path()).unwrap();
        assert!(content.ends_with("\tNA\t200\t300\tNA\tNA\tNA"));
        assert!(!content.contains("NaN"));
    }

    #[tokio::test]
    async fn departure_time_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let sampling = looper(&dir, Scripted::instant()).with_departure_time(1_600_000_000);
        sampling.step().await.unwrap();
        assert_eq!(sampling.measurer.last_departure.get(), 1_600_000_000);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_batch_times_out_as_all_missing() {
        let dir = tempfile::tempdir().unwrap();
        // Each call fits in the timeout on its own; the batch does not.
        let measurer = Scripted {
            delay: Duration::from_secs(4),
            ..Scripted::instant()
        };
        let sampling = looper(&dir, measurer).with_timeout(Duration::from_secs(10));

        let record = sampling.step().await.unwrap();
        assert_eq!(record.distances, vec![None, None, None]);
        assert_eq!(sampling.log().read_cursor().unwrap().next_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_within_timeout_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let measurer = Scripted {
            delay: Duration::from_secs(3),
            ..Scripted::instant()
        };
        let sampling = looper(&dir, measurer).with_timeout(Duration::from_secs(10));

        let record = sampling.step().await.unwrap();
        assert_eq!(record.distances, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[tokio::test]
    async fn schema_mismatch_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distances.log");
        fs::write(&path, "point\tlat\tlng\tA\tB\tmin\tmax\tsum").unwrap();
        let sampling = SamplingLoop::new(sampler(), &path, references(), Scripted::instant());

        let err = sampling.run(Some(3)).await.unwrap_err();
        assert!(matches!(err, LogError::SchemaMismatch { .. }));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "point\tlat\tlng\tA\tB\tmin\tmax\tsum"
        );
    }

    #[tokio::test]
    async fn run_forever_surfaces_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distances.log");
        fs::write(&path, "not a header").unwrap();
        let sampling = SamplingLoop::new(sampler(), &path, references(), Scripted::instant());

        let Err(err) = sampling.run_forever().await;
        assert!(matches!(err, LogError::SchemaMismatch { .. }));
    }
}
