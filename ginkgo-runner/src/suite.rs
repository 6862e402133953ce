//! Suite - Tree Construction and Run Lifecycle
//!
//! A [`Suite`] owns the spec tree while it is declared and the active
//! [`ExampleCollection`] while it runs. Every operation takes `&self`, so a
//! suite can live in a process-wide static and be reached from test bodies on
//! any thread.
//!
//! ## Lifecycle
//!
//! ```text
//! push_* (declaration, cursor moves in and out of containers)
//!        │
//!        ▼
//!      run ── seed → shuffle → validate → flatten → ExampleCollection
//!        │
//!        ▼
//!   fail(...) forwarded to the active collection while examples run
//! ```

use crate::collection::ExampleCollection;
use crate::reporter::{Reporter, SuiteSummary};
use crate::testing::TestingT;
use crate::{ConfigError, RunConfig};
use ginkgo_core::{
    BacktraceLocator, BenchmarkBody, BenchmarkNode, Body, CodeLocation, CodeLocator,
    ContainerNode, FailureData, Flag, HookNode, SpecNode, SpecTree, SubjectNode,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from suite operations; none of them are test failures
#[derive(Debug, Error)]
pub enum SuiteError {
    /// Invalid run configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `run` called while the suite is already running
    #[error("the suite is already running")]
    AlreadyRunning,

    /// `run` called from inside a container body
    #[error("cannot run the suite while a container is being declared")]
    NestedRun,

    /// `fail` called while no run is active
    #[error("fail called outside of a running suite: {message} at {location}")]
    NoActiveRun {
        /// Message given to `fail`
        message: String,
        /// Where `fail` was called
        location: CodeLocation,
    },

    /// `fail` called during a run but between examples
    #[error("fail called while no example is running: {message} at {location}")]
    NoRunningExample {
        /// Message given to `fail`
        message: String,
        /// Where `fail` was called
        location: CodeLocation,
    },
}

/// Spec tree plus run lifecycle
pub struct Suite {
    tree: Mutex<SpecTree>,
    active: Mutex<Option<Arc<ExampleCollection>>>,
    running: AtomicBool,
    locator: Box<dyn CodeLocator>,
}

impl Default for Suite {
    fn default() -> Self {
        Self::new()
    }
}

impl Suite {
    /// Create an empty suite that locates failures from backtraces
    pub fn new() -> Self {
        Self::with_locator(BacktraceLocator)
    }

    /// Create an empty suite with a custom failure locator
    pub fn with_locator(locator: impl CodeLocator + 'static) -> Self {
        Self {
            tree: Mutex::new(SpecTree::new()),
            active: Mutex::new(None),
            running: AtomicBool::new(false),
            locator: Box::new(locator),
        }
    }

    fn tree(&self) -> MutexGuard<'_, SpecTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> MutexGuard<'_, Option<Arc<ExampleCollection>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declare a container and run `body` with the cursor inside it.
    ///
    /// The cursor is restored when `body` returns or unwinds.
    pub fn push_container_node(
        &self,
        text: impl Into<String>,
        body: impl FnOnce(),
        flag: Flag,
        location: CodeLocation,
    ) {
        self.tree().enter(ContainerNode::new(text, flag, location));
        let _cursor = CursorGuard { tree: &self.tree };
        body();
    }

    /// Declare a spec in the current container
    pub fn push_it_node(
        &self,
        text: impl Into<String>,
        body: Body,
        flag: Flag,
        location: CodeLocation,
        timeout: Duration,
    ) {
        self.tree()
            .current_mut()
            .push_subject_node(SubjectNode::Spec(SpecNode {
                text: text.into(),
                body,
                flag,
                location,
                timeout,
            }));
    }

    /// Declare a benchmark in the current container
    #[allow(clippy::too_many_arguments)]
    pub fn push_benchmark_node(
        &self,
        text: impl Into<String>,
        body: BenchmarkBody,
        flag: Flag,
        location: CodeLocation,
        timeout: Duration,
        sample_count: usize,
        maximum_duration: Duration,
    ) {
        self.tree()
            .current_mut()
            .push_subject_node(SubjectNode::Benchmark(BenchmarkNode {
                text: text.into(),
                body,
                flag,
                location,
                timeout,
                sample_count,
                maximum_duration,
            }));
    }

    /// Add a before-each hook to the current container
    pub fn push_before_each_node(&self, body: Body, location: CodeLocation, timeout: Duration) {
        self.tree()
            .current_mut()
            .push_before_each_node(HookNode::new(body, location, timeout));
    }

    /// Add a just-before-each hook to the current container
    pub fn push_just_before_each_node(&self, body: Body, location: CodeLocation, timeout: Duration) {
        self.tree()
            .current_mut()
            .push_just_before_each_node(HookNode::new(body, location, timeout));
    }

    /// Add an after-each hook to the current container
    pub fn push_after_each_node(&self, body: Body, location: CodeLocation, timeout: Duration) {
        self.tree()
            .current_mut()
            .push_after_each_node(HookNode::new(body, location, timeout));
    }

    /// Shuffle, validate, flatten and run the suite.
    ///
    /// Configuration errors are returned before any example runs. Blocks until
    /// every selected example has completed.
    pub fn run(
        &self,
        t: Arc<dyn TestingT>,
        description: &str,
        reporter: Box<dyn Reporter>,
        config: &RunConfig,
    ) -> Result<SuiteSummary, SuiteError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SuiteError::AlreadyRunning);
        }
        let _running = RunningGuard {
            running: &self.running,
        };

        let examples = {
            let mut tree = self.tree();
            if tree.depth() > 0 {
                return Err(SuiteError::NestedRun);
            }
            let mut rng = StdRng::seed_from_u64(config.random_seed as u64);
            tree.shuffle(&mut rng);
            config.validate()?;
            tree.root().generate_examples()
        };
        debug!(
            "flattened {} examples with seed {}",
            examples.len(),
            config.random_seed
        );

        let collection = Arc::new(ExampleCollection::new(
            t,
            description,
            examples,
            reporter,
            config.clone(),
        )?);

        *self.active() = Some(Arc::clone(&collection));
        let _active = ActiveGuard {
            active: &self.active,
        };

        info!("running suite '{}'", description);
        Ok(collection.run())
    }

    /// Record an assertion failure for the running example.
    ///
    /// A failure that arrives outside of an example (from a reporter callback
    /// or between examples) is discarded and reported as an error.
    /// `caller_skip` counts frames above the caller of this method; the
    /// locator is asked for frame `caller_skip + 2`.
    pub fn fail(&self, message: impl Into<String>, caller_skip: usize) -> Result<(), SuiteError> {
        let message = message.into();
        let location = self.locator.locate(caller_skip + 2);
        let active = self.active().clone();

        match active {
            Some(collection) => {
                if collection.fail(FailureData::assertion(message.clone(), location.clone())) {
                    Ok(())
                } else {
                    Err(SuiteError::NoRunningExample { message, location })
                }
            }
            None => Err(SuiteError::NoActiveRun { message, location }),
        }
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Inspect the spec tree
    pub fn with_tree<R>(&self, f: impl FnOnce(&SpecTree) -> R) -> R {
        f(&self.tree())
    }
}

struct CursorGuard<'a> {
    tree: &'a Mutex<SpecTree>,
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        self.tree
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .exit();
    }
}

struct RunningGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

struct ActiveGuard<'a> {
    active: &'a Mutex<Option<Arc<ExampleCollection>>>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{ExampleState, ExampleSummary};
    use crate::testing::TestHandle;
    use ginkgo_core::{AssertionSentinel, DEFAULT_TIMEOUT, TOP_LEVEL_TEXT};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default, Clone)]
    struct Recorder {
        completed: Arc<Mutex<Vec<ExampleSummary>>>,
    }

    impl Reporter for Recorder {
        fn suite_will_begin(&mut self, _config: &RunConfig, _summary: &SuiteSummary) {}
        fn example_will_run(&mut self, _summary: &ExampleSummary) {}
        fn example_did_complete(&mut self, summary: &ExampleSummary) {
            self.completed.lock().unwrap().push(summary.clone());
        }
        fn suite_did_end(&mut self, _summary: &SuiteSummary) {}
    }

    struct FixedLocator {
        skips: Arc<Mutex<Vec<usize>>>,
    }

    impl CodeLocator for FixedLocator {
        fn locate(&self, skip: usize) -> CodeLocation {
            self.skips.lock().unwrap().push(skip);
            CodeLocation::new("books_test.rs", 42)
        }
    }

    fn seeded(seed: i64) -> RunConfig {
        RunConfig {
            random_seed: seed,
            ..RunConfig::default()
        }
    }

    fn here() -> CodeLocation {
        CodeLocation::new("suite.rs", 1)
    }

    fn it(suite: &Suite, text: &str) {
        suite.push_it_node(text, Body::sync(|| {}), Flag::None, here(), DEFAULT_TIMEOUT);
    }

    fn run(suite: &Suite, config: &RunConfig) -> (Result<SuiteSummary, SuiteError>, Recorder) {
        let recorder = Recorder::default();
        let result = suite.run(
            Arc::new(TestHandle::new()),
            "books",
            Box::new(recorder.clone()),
            config,
        );
        (result, recorder)
    }

    fn completed_texts(recorder: &Recorder) -> Vec<String> {
        recorder
            .completed
            .lock()
            .unwrap()
            .iter()
            .map(ExampleSummary::full_text)
            .collect()
    }

    #[test]
    fn test_cursor_follows_nesting() {
        let suite = Suite::new();
        suite.push_container_node(
            "A",
            || {
                suite.push_container_node("B", || it(&suite, "C"), Flag::None, here());
            },
            Flag::None,
            here(),
        );
        it(&suite, "D");

        suite.with_tree(|tree| {
            assert_eq!(tree.depth(), 0);
            let root = tree.root();
            assert_eq!(root.text, TOP_LEVEL_TEXT);
            assert_eq!(root.subjects()[0].text(), "D");
            let a = &root.children()[0];
            assert!(a.subjects().is_empty());
            assert_eq!(a.children()[0].subjects()[0].text(), "C");
        });
    }

    #[test]
    fn test_cursor_restored_after_panicking_body() {
        let suite = Suite::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            suite.push_container_node(
                "broken",
                || {
                    it(&suite, "inside");
                    panic!("declaration failed");
                },
                Flag::None,
                here(),
            );
        }));
        assert!(result.is_err());

        it(&suite, "sibling");
        suite.with_tree(|tree| {
            assert_eq!(tree.depth(), 0);
            assert_eq!(tree.root().subjects()[0].text(), "sibling");
        });
    }

    #[test]
    fn test_same_seed_same_order() {
        let declare = || {
            let suite = Suite::new();
            for c in 0..4 {
                suite.push_container_node(
                    format!("c{c}"),
                    || {
                        for s in 0..4 {
                            it(&suite, &format!("s{s}"));
                        }
                    },
                    Flag::None,
                    here(),
                );
            }
            suite
        };

        let (first, first_recorder) = run(&declare(), &seeded(1234));
        let (second, second_recorder) = run(&declare(), &seeded(1234));
        assert!(first.unwrap().succeeded);
        assert!(second.unwrap().succeeded);
        assert_eq!(completed_texts(&first_recorder), completed_texts(&second_recorder));
        assert_eq!(completed_texts(&first_recorder).len(), 16);
    }

    #[test]
    fn test_invalid_partition_runs_nothing() {
        let ran = Arc::new(AtomicUsize::new(0));
        let suite = Suite::new();
        let counter = Arc::clone(&ran);
        suite.push_it_node(
            "counts",
            Body::sync(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Flag::None,
            here(),
            DEFAULT_TIMEOUT,
        );

        let config = RunConfig {
            parallel_total: 0,
            ..seeded(1)
        };
        let err = run(&suite, &config).0.unwrap_err();
        assert_eq!(err.to_string(), "ginkgo.parallel.total must be >= 1");

        for node in [0, 4] {
            let config = RunConfig {
                parallel_node: node,
                parallel_total: 3,
                ..seeded(1)
            };
            let err = run(&suite, &config).0.unwrap_err();
            assert!(matches!(
                err,
                SuiteError::Config(ConfigError::ParallelNode { total: 3, .. })
            ));
        }
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(!suite.is_running());

        for node in 1..=3 {
            let config = RunConfig {
                parallel_node: node,
                parallel_total: 3,
                ..seeded(1)
            };
            assert!(run(&suite, &config).0.is_ok());
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fail_without_active_run() {
        let skips = Arc::new(Mutex::new(Vec::new()));
        let suite = Suite::with_locator(FixedLocator {
            skips: Arc::clone(&skips),
        });

        let err = suite.fail("too early", 1).unwrap_err();
        match err {
            SuiteError::NoActiveRun { message, location } => {
                assert_eq!(message, "too early");
                assert_eq!(location, CodeLocation::new("books_test.rs", 42));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*skips.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_fail_during_run_fails_example() {
        let suite = Arc::new(Suite::with_locator(FixedLocator {
            skips: Arc::new(Mutex::new(Vec::new())),
        }));

        let inner = Arc::clone(&suite);
        suite.push_it_node(
            "asserts",
            Body::sync(move || {
                inner.fail("expected 3 books", 0).unwrap();
                panic::resume_unwind(Box::new(AssertionSentinel));
            }),
            Flag::None,
            here(),
            DEFAULT_TIMEOUT,
        );
        it(&suite, "passes");

        let handle = Arc::new(TestHandle::new());
        let recorder = Recorder::default();
        let summary = suite
            .run(
                handle.clone(),
                "books",
                Box::new(recorder.clone()),
                &seeded(5),
            )
            .unwrap();

        assert!(!summary.succeeded);
        assert_eq!((summary.passed, summary.failed), (1, 1));
        assert!(handle.failed());

        let completed = recorder.completed.lock().unwrap();
        let failed = completed
            .iter()
            .find(|s| s.state == ExampleState::Failed)
            .unwrap();
        assert_eq!(failed.component_texts, vec!["asserts"]);
        assert_eq!(
            failed.failure,
            Some(FailureData::assertion(
                "expected 3 books",
                CodeLocation::new("books_test.rs", 42)
            ))
        );
        drop(completed);

        assert!(matches!(
            suite.fail("after the run", 0),
            Err(SuiteError::NoActiveRun { .. })
        ));
    }

    struct FailingReporter {
        suite: Arc<Suite>,
        outcome: Arc<Mutex<Option<Result<(), SuiteError>>>>,
    }

    impl Reporter for FailingReporter {
        fn suite_will_begin(&mut self, _config: &RunConfig, _summary: &SuiteSummary) {
            *self.outcome.lock().unwrap() = Some(self.suite.fail("from a reporter", 0));
        }
        fn example_will_run(&mut self, _summary: &ExampleSummary) {}
        fn example_did_complete(&mut self, _summary: &ExampleSummary) {}
        fn suite_did_end(&mut self, _summary: &SuiteSummary) {}
    }

    #[test]
    fn test_fail_between_examples_is_rejected() {
        let suite = Arc::new(Suite::with_locator(FixedLocator {
            skips: Arc::new(Mutex::new(Vec::new())),
        }));
        it(&suite, "passes");

        let outcome = Arc::new(Mutex::new(None));
        let reporter = FailingReporter {
            suite: Arc::clone(&suite),
            outcome: Arc::clone(&outcome),
        };
        let handle = Arc::new(TestHandle::new());
        let summary = suite
            .run(handle.clone(), "books", Box::new(reporter), &seeded(2))
            .unwrap();

        match outcome.lock().unwrap().take() {
            Some(Err(SuiteError::NoRunningExample { message, location })) => {
                assert_eq!(message, "from a reporter");
                assert_eq!(location, CodeLocation::new("books_test.rs", 42));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // the discarded failure does not leak into the example
        assert!(summary.succeeded);
        assert_eq!(summary.passed, 1);
        assert!(!handle.failed());
    }

    #[test]
    fn test_run_inside_run_is_rejected() {
        let suite = Arc::new(Suite::new());
        let nested = Arc::new(Mutex::new(None));

        let inner = Arc::clone(&suite);
        let slot = Arc::clone(&nested);
        suite.push_it_node(
            "reenters",
            Body::sync(move || {
                let result = inner.run(
                    Arc::new(TestHandle::new()),
                    "nested",
                    Box::new(Recorder::default()),
                    &seeded(1),
                );
                *slot.lock().unwrap() = Some(result.is_err_and(|e| {
                    matches!(e, SuiteError::AlreadyRunning)
                }));
            }),
            Flag::None,
            here(),
            DEFAULT_TIMEOUT,
        );

        assert!(run(&suite, &seeded(1)).0.unwrap().succeeded);
        assert_eq!(*nested.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_run_inside_container_is_rejected() {
        let suite = Suite::new();
        let mut result = None;
        suite.push_container_node(
            "declaring",
            || result = Some(run(&suite, &seeded(1)).0),
            Flag::None,
            here(),
        );
        assert!(matches!(result, Some(Err(SuiteError::NestedRun))));
        assert!(!suite.is_running());
    }
}
