//! Benchmarker - The Measurement API
//!
//! Benchmark bodies receive a [`Benchmarker`] and record named measurements
//! into it. The same benchmarker is handed to every sample of one example, so
//! each named measurement ends up with one value per sample.

use serde::Serialize;
use std::time::{Duration, Instant};

/// Name under which the runner records the duration of each sample body
pub const RUNTIME_MEASUREMENT: &str = "runtime";

/// What a measurement's values represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeasurementKind {
    /// Durations, in nanoseconds
    Duration,
    /// Arbitrary user values
    Value,
}

/// All values recorded under one name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Measurement name
    pub name: String,
    /// Value kind
    pub kind: MeasurementKind,
    /// Recorded values in recording order
    pub samples: Vec<f64>,
}

impl Measurement {
    /// Summary statistics over the recorded values
    pub fn summary(&self) -> MeasurementSummary {
        summarize(&self.samples)
    }
}

/// Summary statistics for one measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementSummary {
    /// Number of recorded values
    pub sample_count: usize,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
}

/// Compute summary statistics; all zero for an empty slice
pub fn summarize(samples: &[f64]) -> MeasurementSummary {
    if samples.is_empty() {
        return MeasurementSummary {
            sample_count: 0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            std_dev: 0.0,
        };
    }

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let std_dev = if samples.len() < 2 {
        0.0
    } else {
        let variance =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
        variance.sqrt()
    };
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    MeasurementSummary {
        sample_count: samples.len(),
        min,
        max,
        mean,
        std_dev,
    }
}

/// Collects named measurements for a benchmark example
#[derive(Debug, Default)]
pub struct Benchmarker {
    measurements: Vec<Measurement>,
}

impl Benchmarker {
    /// Create an empty benchmarker
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, recording its wall-clock time under `name`
    pub fn time<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let value = std::hint::black_box(f());
        self.record_duration(name, start.elapsed());
        value
    }

    /// Record a duration under `name`
    pub fn record_duration(&mut self, name: &str, duration: Duration) {
        self.entry(name, MeasurementKind::Duration)
            .samples
            .push(duration.as_nanos() as f64);
    }

    /// Record an arbitrary value under `name`
    pub fn record_value(&mut self, name: &str, value: f64) {
        self.entry(name, MeasurementKind::Value).samples.push(value);
    }

    /// Look up a measurement by name
    pub fn measurement(&self, name: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.name == name)
    }

    /// Measurements in first-recorded order
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Consume the benchmarker, returning its measurements
    pub fn into_measurements(self) -> Vec<Measurement> {
        self.measurements
    }

    fn entry(&mut self, name: &str, kind: MeasurementKind) -> &mut Measurement {
        let index = match self.measurements.iter().position(|m| m.name == name) {
            Some(index) => index,
            None => {
                self.measurements.push(Measurement {
                    name: name.to_string(),
                    kind,
                    samples: Vec::new(),
                });
                self.measurements.len() - 1
            }
        };
        &mut self.measurements[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize() {
        let summary = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(summary.sample_count, 8);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
        assert_eq!(summary.mean, 5.0);
        assert!((summary.std_dev - 2.138).abs() < 0.001);
    }

    #[test]
    fn test_summarize_edge_cases() {
        assert_eq!(summarize(&[]).sample_count, 0);
        let single = summarize(&[3.0]);
        assert_eq!(single.mean, 3.0);
        assert_eq!(single.std_dev, 0.0);
    }

    #[test]
    fn test_records_group_by_name() {
        let mut b = Benchmarker::new();
        b.record_value("size", 10.0);
        let out = b.time("sort", || 42);
        b.record_value("size", 20.0);

        assert_eq!(out, 42);
        assert_eq!(b.measurements().len(), 2);
        assert_eq!(b.measurement("size").unwrap().samples, vec![10.0, 20.0]);
        assert_eq!(b.measurement("sort").unwrap().kind, MeasurementKind::Duration);
        assert_eq!(b.measurements()[0].name, "size");
    }
}
