//! Example Execution
//!
//! Runs one flattened example: its setup hooks, its subject and its teardown
//! hooks, recording at most one failure.
//!
//! ## Chain
//!
//! ```text
//! before_each (root → leaf)
//!        │  stops at the first failure
//!        ▼
//! just_before_each (root → leaf)
//!        │
//!        ▼
//!     subject        benchmarks repeat the whole chain per sample
//!        │
//!        ▼
//! after_each (leaf → root)   always runs
//! ```
//!
//! Failures reach the example through a [`FailureSlot`]: `fail` records an
//! assertion there before unwinding, recovered panics and timeouts are
//! recorded here. The first failure wins.

use crate::reporter::ExampleState;
use ginkgo_core::{
    AssertionSentinel, BenchmarkBody, BenchmarkNode, Benchmarker, Body, CodeLocation, Completion,
    Done, Example, FailureData, HookNode, Measurement, RUNTIME_MEASUREMENT, SubjectNode,
};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SlotState {
    open: bool,
    failure: Option<FailureData>,
}

/// Failure record of the example currently running
#[derive(Debug, Default)]
pub(crate) struct FailureSlot {
    state: Mutex<SlotState>,
}

impl FailureSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start accepting failures for a new example
    pub(crate) fn open(&self) {
        let mut state = self.lock();
        state.open = true;
        state.failure = None;
    }

    /// Stop accepting failures, returning the recorded one
    pub(crate) fn close(&self) -> Option<FailureData> {
        let mut state = self.lock();
        state.open = false;
        state.failure.take()
    }

    /// Record `failure` unless one is already recorded.
    ///
    /// Returns false when no example is running.
    pub(crate) fn record(&self, failure: FailureData) -> bool {
        let mut state = self.lock();
        if !state.open {
            return false;
        }
        if state.failure.is_none() {
            state.failure = Some(failure);
        } else {
            debug!("dropping secondary failure: {}", failure.message());
        }
        true
    }

    /// Whether a failure has been recorded for the running example
    pub(crate) fn has_failure(&self) -> bool {
        self.lock().failure.is_some()
    }
}

/// Result of executing one example
#[derive(Debug)]
pub(crate) struct ExampleRun {
    pub(crate) state: ExampleState,
    pub(crate) failure: Option<FailureData>,
    pub(crate) measurements: Vec<Measurement>,
    pub(crate) run_time: Duration,
}

/// Execute `example`, recording failures into `slot`
pub(crate) fn run_example(example: &Example, slot: &FailureSlot) -> ExampleRun {
    slot.open();
    let start = Instant::now();

    let measurements = match &example.subject {
        SubjectNode::Spec(spec) => {
            run_chain(example, slot, || {
                run_body(&spec.body, &spec.location, spec.timeout, slot)
            });
            Vec::new()
        }
        SubjectNode::Benchmark(bench) => run_benchmark(example, bench, slot),
    };

    let run_time = start.elapsed();
    let failure = slot.close();
    let state = match &failure {
        None => ExampleState::Passed,
        Some(FailureData::Assertion { .. }) => ExampleState::Failed,
        Some(FailureData::UnexpectedPanic { .. }) => ExampleState::Panicked,
        Some(FailureData::Timeout { .. }) => ExampleState::TimedOut,
    };

    ExampleRun {
        state,
        failure,
        measurements,
        run_time,
    }
}

/// Run setup hooks, `subject` and teardown hooks; returns false if anything failed
fn run_chain(example: &Example, slot: &FailureSlot, subject: impl FnOnce() -> bool) -> bool {
    let setup_ok = example
        .before_each
        .iter()
        .chain(&example.just_before_each)
        .all(|hook| run_hook(hook, slot));

    if setup_ok {
        subject();
    }

    for hook in &example.after_each {
        run_hook(hook, slot);
    }

    !slot.has_failure()
}

fn run_hook(hook: &HookNode, slot: &FailureSlot) -> bool {
    run_body(&hook.body, &hook.location, hook.timeout, slot)
}

/// Sample a benchmark `sample_count` times, then check its maximum duration
fn run_benchmark(example: &Example, bench: &BenchmarkNode, slot: &FailureSlot) -> Vec<Measurement> {
    let mut benchmarker = Benchmarker::new();

    for sample in 0..bench.sample_count {
        let ok = run_chain(example, slot, || {
            let start = Instant::now();
            let ok = run_benchmark_body(&bench.body, &mut benchmarker, &bench.location, slot);
            if ok {
                benchmarker.record_duration(RUNTIME_MEASUREMENT, start.elapsed());
            }
            ok
        });
        if !ok {
            debug!("benchmark '{}' stopped at sample {}", bench.text, sample);
            break;
        }
    }

    if !slot.has_failure() && !bench.maximum_duration.is_zero() {
        if let Some(runtime) = benchmarker.measurement(RUNTIME_MEASUREMENT) {
            let mean = Duration::from_nanos(runtime.summary().mean as u64);
            if mean > bench.maximum_duration {
                slot.record(FailureData::assertion(
                    format!(
                        "mean runtime {:?} exceeded maximum duration {:?}",
                        mean, bench.maximum_duration
                    ),
                    bench.location.clone(),
                ));
            }
        }
    }

    benchmarker.into_measurements()
}

fn run_benchmark_body(
    body: &BenchmarkBody,
    benchmarker: &mut Benchmarker,
    location: &CodeLocation,
    slot: &FailureSlot,
) -> bool {
    let result = panic::catch_unwind(AssertUnwindSafe(|| body(benchmarker)));
    settle(result, location, slot)
}

/// Run one body; returns false if it failed
pub(crate) fn run_body(
    body: &Body,
    location: &CodeLocation,
    timeout: Duration,
    slot: &FailureSlot,
) -> bool {
    match body {
        Body::Sync(f) => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| f()));
            settle(result, location, slot)
        }
        Body::Async(f) => run_async(Arc::clone(f), location, timeout, slot),
    }
}

/// Run an async body on its own thread and wait for [`Done`] or the timeout.
///
/// A body that times out keeps running detached; whatever it does afterwards
/// is not attributed to this node.
fn run_async(
    f: Arc<dyn Fn(Done) + Send + Sync>,
    location: &CodeLocation,
    timeout: Duration,
    slot: &FailureSlot,
) -> bool {
    let (done, rx) = Done::channel();
    let notifier = done.clone();

    let spawned = thread::Builder::new()
        .name("ginkgo-async".to_string())
        .spawn(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(done))) {
                notifier.unwound(payload);
            }
        });

    if let Err(e) = spawned {
        slot.record(FailureData::assertion(
            format!("failed to spawn async body: {e}"),
            location.clone(),
        ));
        return false;
    }

    match rx.recv_timeout(timeout) {
        Ok(Completion::Done) => !slot.has_failure(),
        Ok(Completion::Unwound(payload)) => settle(Err(payload), location, slot),
        Err(RecvTimeoutError::Timeout) => {
            warn!("async body at {} timed out after {:?}", location, timeout);
            slot.record(FailureData::timeout(timeout, location.clone()));
            false
        }
        Err(RecvTimeoutError::Disconnected) => {
            slot.record(FailureData::assertion(
                "async body finished without calling done",
                location.clone(),
            ));
            false
        }
    }
}

/// Classify the outcome of a body
fn settle(
    result: Result<(), Box<dyn Any + Send>>,
    location: &CodeLocation,
    slot: &FailureSlot,
) -> bool {
    match result {
        Ok(()) => !slot.has_failure(),
        Err(payload) if payload.is::<AssertionSentinel>() => {
            // `fail` records its assertion before unwinding
            if !slot.has_failure() {
                slot.record(FailureData::assertion("failed", location.clone()));
            }
            false
        }
        Err(payload) => {
            let backtrace = Backtrace::capture();
            let backtrace = match backtrace.status() {
                BacktraceStatus::Captured => Some(backtrace.to_string()),
                _ => None,
            };
            slot.record(FailureData::unexpected_panic(
                payload.as_ref(),
                location.clone(),
                backtrace,
            ));
            false
        }
    }
}
