#![warn(missing_docs)]
//! # Ginkgo
//!
//! Behavior-driven spec framework for Rust.
//!
//! - **Nested containers**: `describe`/`context` blocks with `before_each`,
//!   `just_before_each` and `after_each` hooks inherited by every spec below
//! - **Seeded shuffling**: containers and specs run in a random order that a
//!   seed reproduces exactly
//! - **Focus and pending**: `fdescribe`/`fit` run a subset, `pdescribe`/`pit`
//!   park specs, `--ginkgo.focus`/`--ginkgo.skip` filter by regex
//! - **Parallel partitions**: `--ginkgo.parallel.node`/`--ginkgo.parallel.total`
//!   select a disjoint slice of the suite per process
//! - **Benchmarks**: sampled specs with named measurements
//!
//! ## Quick Start
//!
//! ```ignore
//! use ginkgo::prelude::*;
//!
//! #[test]
//! fn books() {
//!     describe("Book", || {
//!         before_each(|| { /* set up */ });
//!
//!         it("can be loaded from JSON", || {
//!             if 1 + 1 != 2 {
//!                 fail("arithmetic is broken");
//!             }
//!         });
//!     });
//!
//!     run_specs("Books").unwrap();
//! }
//! ```
//!
//! Declarations go to one process-wide suite, so each test binary holds a
//! single suite run by a single `#[test]`.

use ginkgo_core::AssertionSentinel;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

// Re-export core types
pub use ginkgo_core::{
    Benchmarker, Body, CodeLocation, DEFAULT_TIMEOUT, Done, FailureData, Flag, Measurement,
    MeasurementSummary, RUNTIME_MEASUREMENT,
};

// Re-export runner types
pub use ginkgo_runner::{
    ConfigError, ExampleState, ExampleSummary, Reporter, RunArgs, RunConfig, Suite, SuiteError,
    SuiteSummary, TestHandle, TestingT, TracingReporter,
};

static SUITE: LazyLock<Suite> = LazyLock::new(Suite::new);

/// The process-wide suite the free functions declare into
pub fn global_suite() -> &'static Suite {
    &SUITE
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Benchmarker, Done, after_each, after_each_async, before_each, before_each_async,
        benchmark, context, describe, fail, fbenchmark, fcontext, fdescribe, fit, it, it_async,
        it_async_with_timeout, just_before_each, just_before_each_async, pbenchmark, pcontext,
        pdescribe, pit, run_specs,
    };
}

// ============================================================================
// Containers
// ============================================================================

/// Declare a container; `body` runs immediately to declare its contents
#[track_caller]
pub fn describe(text: &str, body: impl FnOnce()) {
    SUITE.push_container_node(text, body, Flag::None, CodeLocation::caller());
}

/// Focused [`describe`]
#[track_caller]
pub fn fdescribe(text: &str, body: impl FnOnce()) {
    SUITE.push_container_node(text, body, Flag::Focused, CodeLocation::caller());
}

/// Pending [`describe`]
#[track_caller]
pub fn pdescribe(text: &str, body: impl FnOnce()) {
    SUITE.push_container_node(text, body, Flag::Pending, CodeLocation::caller());
}

/// Alias of [`describe`]
#[track_caller]
pub fn context(text: &str, body: impl FnOnce()) {
    SUITE.push_container_node(text, body, Flag::None, CodeLocation::caller());
}

/// Focused [`context`]
#[track_caller]
pub fn fcontext(text: &str, body: impl FnOnce()) {
    SUITE.push_container_node(text, body, Flag::Focused, CodeLocation::caller());
}

/// Pending [`context`]
#[track_caller]
pub fn pcontext(text: &str, body: impl FnOnce()) {
    SUITE.push_container_node(text, body, Flag::Pending, CodeLocation::caller());
}

// ============================================================================
// Specs
// ============================================================================

/// Declare a spec
#[track_caller]
pub fn it(text: &str, body: impl Fn() + Send + Sync + 'static) {
    SUITE.push_it_node(
        text,
        Body::sync(body),
        Flag::None,
        CodeLocation::caller(),
        DEFAULT_TIMEOUT,
    );
}

/// Focused [`it`]
#[track_caller]
pub fn fit(text: &str, body: impl Fn() + Send + Sync + 'static) {
    SUITE.push_it_node(
        text,
        Body::sync(body),
        Flag::Focused,
        CodeLocation::caller(),
        DEFAULT_TIMEOUT,
    );
}

/// Pending [`it`]
#[track_caller]
pub fn pit(text: &str, body: impl Fn() + Send + Sync + 'static) {
    SUITE.push_it_node(
        text,
        Body::sync(body),
        Flag::Pending,
        CodeLocation::caller(),
        DEFAULT_TIMEOUT,
    );
}

/// Declare a spec that completes by calling [`Done::done`], within [`DEFAULT_TIMEOUT`]
#[track_caller]
pub fn it_async(text: &str, body: impl Fn(Done) + Send + Sync + 'static) {
    it_async_with_timeout(text, DEFAULT_TIMEOUT, body);
}

/// Declare a spec that must call [`Done::done`] within `timeout`
#[track_caller]
pub fn it_async_with_timeout(
    text: &str,
    timeout: Duration,
    body: impl Fn(Done) + Send + Sync + 'static,
) {
    SUITE.push_it_node(
        text,
        Body::with_done(body),
        Flag::None,
        CodeLocation::caller(),
        timeout,
    );
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Declare a benchmark sampled `samples` times.
///
/// The example fails when the mean sample runtime exceeds
/// `maximum_duration`; pass [`Duration::ZERO`] for no limit.
#[track_caller]
pub fn benchmark(
    text: &str,
    samples: usize,
    maximum_duration: Duration,
    body: impl Fn(&mut Benchmarker) + Send + Sync + 'static,
) {
    push_benchmark(text, Flag::None, samples, maximum_duration, body);
}

/// Focused [`benchmark`]
#[track_caller]
pub fn fbenchmark(
    text: &str,
    samples: usize,
    maximum_duration: Duration,
    body: impl Fn(&mut Benchmarker) + Send + Sync + 'static,
) {
    push_benchmark(text, Flag::Focused, samples, maximum_duration, body);
}

/// Pending [`benchmark`]
#[track_caller]
pub fn pbenchmark(
    text: &str,
    samples: usize,
    maximum_duration: Duration,
    body: impl Fn(&mut Benchmarker) + Send + Sync + 'static,
) {
    push_benchmark(text, Flag::Pending, samples, maximum_duration, body);
}

#[track_caller]
fn push_benchmark(
    text: &str,
    flag: Flag,
    samples: usize,
    maximum_duration: Duration,
    body: impl Fn(&mut Benchmarker) + Send + Sync + 'static,
) {
    SUITE.push_benchmark_node(
        text,
        Arc::new(body),
        flag,
        CodeLocation::caller(),
        DEFAULT_TIMEOUT,
        samples,
        maximum_duration,
    );
}

// ============================================================================
// Hooks
// ============================================================================

/// Run `body` before every spec in the current container
#[track_caller]
pub fn before_each(body: impl Fn() + Send + Sync + 'static) {
    SUITE.push_before_each_node(Body::sync(body), CodeLocation::caller(), DEFAULT_TIMEOUT);
}

/// Async [`before_each`]
#[track_caller]
pub fn before_each_async(body: impl Fn(Done) + Send + Sync + 'static) {
    SUITE.push_before_each_node(Body::with_done(body), CodeLocation::caller(), DEFAULT_TIMEOUT);
}

/// Run `body` after every `before_each` of the spec, right before the spec
#[track_caller]
pub fn just_before_each(body: impl Fn() + Send + Sync + 'static) {
    SUITE.push_just_before_each_node(Body::sync(body), CodeLocation::caller(), DEFAULT_TIMEOUT);
}

/// Async [`just_before_each`]
#[track_caller]
pub fn just_before_each_async(body: impl Fn(Done) + Send + Sync + 'static) {
    SUITE.push_just_before_each_node(
        Body::with_done(body),
        CodeLocation::caller(),
        DEFAULT_TIMEOUT,
    );
}

/// Run `body` after every spec in the current container, even a failed one
#[track_caller]
pub fn after_each(body: impl Fn() + Send + Sync + 'static) {
    SUITE.push_after_each_node(Body::sync(body), CodeLocation::caller(), DEFAULT_TIMEOUT);
}

/// Async [`after_each`]
#[track_caller]
pub fn after_each_async(body: impl Fn(Done) + Send + Sync + 'static) {
    SUITE.push_after_each_node(Body::with_done(body), CodeLocation::caller(), DEFAULT_TIMEOUT);
}

// ============================================================================
// Running
// ============================================================================

/// Fail the running spec and stop its body.
///
/// Panics when no example is running.
#[track_caller]
pub fn fail(message: impl Into<String>) -> ! {
    if let Err(e) = SUITE.fail(message, 0) {
        panic!("{e}");
    }
    std::panic::resume_unwind(Box::new(AssertionSentinel))
}

/// Run the global suite with configuration from `ginkgo.toml` and `--ginkgo.*` flags.
///
/// Returns an error when the configuration is invalid or the suite fails.
pub fn run_specs(description: &str) -> anyhow::Result<SuiteSummary> {
    let config = RunConfig::resolve()?;
    tracing::debug!("run configuration: {:?}", config);
    let handle = Arc::new(TestHandle::new());
    let summary = run_specs_with(handle.clone(), description, Box::new(TracingReporter), &config)?;

    if handle.failed() {
        anyhow::bail!(
            "suite '{}' failed: {} failed, {} passed, {} pending (seed {})",
            summary.description,
            summary.failed,
            summary.passed,
            summary.pending,
            summary.random_seed
        );
    }
    Ok(summary)
}

/// Run the global suite with an explicit test context, reporter and configuration
pub fn run_specs_with(
    t: Arc<dyn TestingT>,
    description: &str,
    reporter: Box<dyn Reporter>,
    config: &RunConfig,
) -> anyhow::Result<SuiteSummary> {
    let summary = SUITE.run(t, description, reporter, config)?;
    Ok(summary)
}

/// Install a `tracing` subscriber for ginkgo's log events.
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging(verbose: bool) {
    let filter = if verbose { "ginkgo=debug" } else { "ginkgo=info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
