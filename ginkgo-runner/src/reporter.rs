//! Reporting
//!
//! A [`Reporter`] observes a run through four callbacks. Summaries are plain
//! data; rendering them is up to the reporter. [`TracingReporter`] turns each
//! callback into a structured `tracing` event.

use crate::RunConfig;
use ginkgo_core::{CodeLocation, FailureData, Measurement};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExampleState {
    /// Declared pending; never run
    Pending,
    /// Excluded by focus, skip, partitioning or fail-fast
    Skipped,
    /// Ran without failure
    Passed,
    /// Failed through `fail` (or a benchmark exceeded its maximum duration)
    Failed,
    /// A body panicked
    Panicked,
    /// An async body did not signal completion in time
    TimedOut,
}

impl ExampleState {
    /// Whether this state fails the suite
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ExampleState::Failed | ExampleState::Panicked | ExampleState::TimedOut
        )
    }
}

/// Report for a single example
#[derive(Debug, Clone, Serialize)]
pub struct ExampleSummary {
    /// Container texts followed by the subject text
    pub component_texts: Vec<String>,
    /// Locations matching `component_texts`
    pub component_locations: Vec<CodeLocation>,
    /// Current state; `Pending`/`Skipped` before it runs, if it never does
    pub state: ExampleState,
    /// Wall-clock time spent running the example
    pub run_time: Duration,
    /// First failure recorded for the example
    pub failure: Option<FailureData>,
    /// Whether the subject is a benchmark
    pub is_benchmark: bool,
    /// Benchmark measurements, empty for specs
    pub measurements: Vec<Measurement>,
}

impl ExampleSummary {
    /// Space-joined component texts
    pub fn full_text(&self) -> String {
        self.component_texts.join(" ")
    }
}

/// Report for a whole suite run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteSummary {
    /// Suite description given to `run`
    pub description: String,
    /// Whether the suite passed; only meaningful once the suite has ended
    pub succeeded: bool,
    /// Seed the run used
    pub random_seed: i64,
    /// One-indexed partition of this run
    pub parallel_node: i64,
    /// Total partitions
    pub parallel_total: i64,
    /// Examples in the whole suite
    pub examples_before_parallelization: usize,
    /// Examples in this partition
    pub total_examples: usize,
    /// Examples in this partition that are neither pending nor skipped
    pub examples_that_will_run: usize,
    /// Pending examples
    pub pending: usize,
    /// Skipped examples
    pub skipped: usize,
    /// Passed examples
    pub passed: usize,
    /// Failed, panicked or timed-out examples
    pub failed: usize,
    /// Wall-clock time of the run
    pub run_time: Duration,
}

/// Observer of a suite run
pub trait Reporter: Send {
    /// Called once before any example runs
    fn suite_will_begin(&mut self, config: &RunConfig, summary: &SuiteSummary);

    /// Called before each example that will run
    fn example_will_run(&mut self, summary: &ExampleSummary);

    /// Called after each example, including pending and skipped ones
    fn example_did_complete(&mut self, summary: &ExampleSummary);

    /// Called once after the last example
    fn suite_did_end(&mut self, summary: &SuiteSummary);
}

/// Reporter that logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn suite_will_begin(&mut self, config: &RunConfig, summary: &SuiteSummary) {
        info!(
            "Running suite '{}': {} of {} examples (seed {}, node {}/{})",
            summary.description,
            summary.examples_that_will_run,
            summary.examples_before_parallelization,
            config.random_seed,
            config.parallel_node,
            config.parallel_total
        );
    }

    fn example_will_run(&mut self, summary: &ExampleSummary) {
        debug!("Running: {}", summary.full_text());
    }

    fn example_did_complete(&mut self, summary: &ExampleSummary) {
        match (&summary.state, &summary.failure) {
            (state, Some(failure)) if state.is_failure() => {
                warn!(
                    "{:?}: {} ({}) at {}",
                    state,
                    summary.full_text(),
                    failure.message(),
                    failure.location()
                );
            }
            (ExampleState::Passed, _) => {
                debug!("Passed: {} in {:?}", summary.full_text(), summary.run_time);
                for measurement in &summary.measurements {
                    let stats = measurement.summary();
                    debug!(
                        "  {}: mean {:.1} (min {:.1}, max {:.1}, stddev {:.1}) over {} samples",
                        measurement.name,
                        stats.mean,
                        stats.min,
                        stats.max,
                        stats.std_dev,
                        stats.sample_count
                    );
                }
            }
            (state, _) => debug!("{:?}: {}", state, summary.full_text()),
        }
    }

    fn suite_did_end(&mut self, summary: &SuiteSummary) {
        let outcome = if summary.succeeded { "passed" } else { "FAILED" };
        info!(
            "Suite '{}' {}: {} passed, {} failed, {} pending, {} skipped in {:?}",
            summary.description,
            outcome,
            summary.passed,
            summary.failed,
            summary.pending,
            summary.skipped,
            summary.run_time
        );
    }
}
