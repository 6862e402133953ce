//! Execution Collection
//!
//! Owns one run of a suite: decides which flattened examples run, runs them
//! in order, reports progress and receives failures raised while they run.
//!
//! Selection, in order:
//! 1. optional reshuffle of the flat list (`randomize_all_specs`)
//! 2. programmatic focus, then `focus`/`skip` patterns
//! 3. pending flags (pending wins over focus)
//! 4. `skip_measurements`
//! 5. the contiguous slice for this parallel node

use crate::execution::{FailureSlot, run_example};
use crate::partition::parallelized_index_range;
use crate::reporter::{ExampleState, ExampleSummary, Reporter, SuiteSummary};
use crate::testing::TestingT;
use crate::{ConfigError, RunConfig};
use ginkgo_core::{Example, FailureData, Flag};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use regex::Regex;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What the collection will do with an example
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Execute it
    Run,
    /// Report it as pending
    Pending,
    /// Report it as skipped
    Skipped,
}

/// The examples of one run and the state needed to execute them
pub struct ExampleCollection {
    t: Arc<dyn TestingT>,
    description: String,
    entries: Vec<(Example, Disposition)>,
    reporter: Mutex<Box<dyn Reporter>>,
    config: RunConfig,
    examples_before_parallelization: usize,
    failures: FailureSlot,
}

impl ExampleCollection {
    /// Select examples according to `config`.
    ///
    /// Fails on invalid partition parameters or patterns; nothing has run yet.
    pub fn new(
        t: Arc<dyn TestingT>,
        description: impl Into<String>,
        mut examples: Vec<Example>,
        reporter: Box<dyn Reporter>,
        config: RunConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let focus = compile_pattern("ginkgo.focus", config.focus.as_deref())?;
        let skip = compile_pattern("ginkgo.skip", config.skip.as_deref())?;

        if config.randomize_all_specs {
            let mut rng = StdRng::seed_from_u64(config.random_seed as u64);
            examples.shuffle(&mut rng);
        }

        let has_programmatic_focus = examples.iter().any(|e| e.flag() == Flag::Focused);
        let examples_before_parallelization = examples.len();

        let mut entries: Vec<(Example, Disposition)> = examples
            .into_iter()
            .map(|example| {
                let disposition = disposition(
                    &example,
                    has_programmatic_focus,
                    focus.as_ref(),
                    skip.as_ref(),
                    config.skip_measurements,
                );
                (example, disposition)
            })
            .collect();

        if config.parallel_total > 1 {
            let (start, count) = parallelized_index_range(
                entries.len(),
                config.parallel_total as usize,
                config.parallel_node as usize,
            );
            debug!(
                "node {}/{} takes examples {}..{}",
                config.parallel_node,
                config.parallel_total,
                start,
                start + count
            );
            entries = entries.into_iter().skip(start).take(count).collect();
        }

        Ok(Self {
            t,
            description: description.into(),
            entries,
            reporter: Mutex::new(reporter),
            config,
            examples_before_parallelization,
            failures: FailureSlot::default(),
        })
    }

    /// Selected examples with their dispositions, in run order
    pub fn entries(&self) -> &[(Example, Disposition)] {
        &self.entries
    }

    /// Run every selected example and report the outcome.
    ///
    /// A failed suite also calls [`TestingT::fail`].
    pub fn run(&self) -> SuiteSummary {
        let start = Instant::now();
        let mut summary = self.initial_summary();
        let mut reporter = self.reporter.lock().unwrap_or_else(PoisonError::into_inner);

        reporter.suite_will_begin(&self.config, &summary);

        let mut suite_failed = false;
        for (example, disposition) in &self.entries {
            let mut example_summary = summarize_example(example, *disposition);

            if *disposition == Disposition::Run && self.config.fail_fast && suite_failed {
                example_summary.state = ExampleState::Skipped;
            }

            if example_summary.state == ExampleState::Passed {
                reporter.example_will_run(&example_summary);
                let run = run_example(example, &self.failures);
                example_summary.state = run.state;
                example_summary.failure = run.failure;
                example_summary.measurements = run.measurements;
                example_summary.run_time = run.run_time;
            }

            match example_summary.state {
                ExampleState::Passed => summary.passed += 1,
                ExampleState::Pending => summary.pending += 1,
                ExampleState::Skipped => summary.skipped += 1,
                ExampleState::Failed | ExampleState::Panicked | ExampleState::TimedOut => {
                    summary.failed += 1;
                    suite_failed = true;
                }
            }

            reporter.example_did_complete(&example_summary);
        }

        summary.succeeded =
            !suite_failed && !(self.config.fail_on_pending && summary.pending > 0);
        summary.run_time = start.elapsed();
        reporter.suite_did_end(&summary);
        drop(reporter);

        if !summary.succeeded {
            info!("suite '{}' failed", self.description);
            self.t.fail();
        }

        summary
    }

    /// Record a failure for the running example.
    ///
    /// Returns false, after logging it, when no example is running.
    pub fn fail(&self, failure: FailureData) -> bool {
        let accepted = self.failures.record(failure.clone());
        if !accepted {
            warn!(
                "discarding failure raised outside of an example: {} at {}",
                failure.message(),
                failure.location()
            );
        }
        accepted
    }

    fn initial_summary(&self) -> SuiteSummary {
        SuiteSummary {
            description: self.description.clone(),
            succeeded: false,
            random_seed: self.config.random_seed,
            parallel_node: self.config.parallel_node,
            parallel_total: self.config.parallel_total,
            examples_before_parallelization: self.examples_before_parallelization,
            total_examples: self.entries.len(),
            examples_that_will_run: self
                .entries
                .iter()
                .filter(|(_, d)| *d == Disposition::Run)
                .count(),
            ..SuiteSummary::default()
        }
    }
}

fn compile_pattern(flag: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern {
                flag,
                pattern: p.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn disposition(
    example: &Example,
    has_programmatic_focus: bool,
    focus: Option<&Regex>,
    skip: Option<&Regex>,
    skip_measurements: bool,
) -> Disposition {
    let flag = example.flag();
    if flag == Flag::Pending {
        return Disposition::Pending;
    }
    if has_programmatic_focus && flag != Flag::Focused {
        return Disposition::Skipped;
    }

    let full_text = example.full_text();
    if let Some(re) = focus {
        if !re.is_match(&full_text) {
            return Disposition::Skipped;
        }
    }
    if let Some(re) = skip {
        if re.is_match(&full_text) {
            return Disposition::Skipped;
        }
    }

    if skip_measurements && example.is_benchmark() {
        return Disposition::Skipped;
    }

    Disposition::Run
}

/// Summary before running; `Passed` stands for "will run"
fn summarize_example(example: &Example, disposition: Disposition) -> ExampleSummary {
    ExampleSummary {
        component_texts: example.component_texts(),
        component_locations: example.component_locations(),
        state: match disposition {
            Disposition::Run => ExampleState::Passed,
            Disposition::Pending => ExampleState::Pending,
            Disposition::Skipped => ExampleState::Skipped,
        },
        run_time: Duration::ZERO,
        failure: None,
        is_benchmark: example.is_benchmark(),
        measurements: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHandle;
    use ginkgo_core::{
        BenchmarkNode, Benchmarker, Body, CodeLocation, ContainerNode, DEFAULT_TIMEOUT, SpecNode,
        SubjectNode,
    };

    #[derive(Default)]
    struct Recorder {
        completed: Arc<Mutex<Vec<(String, ExampleState)>>>,
    }

    impl Reporter for Recorder {
        fn suite_will_begin(&mut self, _config: &RunConfig, _summary: &SuiteSummary) {}
        fn example_will_run(&mut self, _summary: &ExampleSummary) {}
        fn example_did_complete(&mut self, summary: &ExampleSummary) {
            self.completed
                .lock()
                .unwrap()
                .push((summary.full_text(), summary.state));
        }
        fn suite_did_end(&mut self, _summary: &SuiteSummary) {}
    }

    fn spec(text: &str, flag: Flag, body: Body) -> SubjectNode {
        SubjectNode::Spec(SpecNode {
            text: text.to_string(),
            body,
            flag,
            location: CodeLocation::unknown(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    fn passing(text: &str, flag: Flag) -> SubjectNode {
        spec(text, flag, Body::sync(|| {}))
    }

    fn config() -> RunConfig {
        RunConfig {
            random_seed: 1,
            ..RunConfig::default()
        }
    }

    fn dispositions(root: &ContainerNode, config: RunConfig) -> Vec<(String, Disposition)> {
        let collection = ExampleCollection::new(
            Arc::new(TestHandle::new()),
            "suite",
            root.generate_examples(),
            Box::new(Recorder::default()),
            config,
        )
        .unwrap();
        collection
            .entries()
            .iter()
            .map(|(e, d)| (e.full_text(), *d))
            .collect()
    }

    #[test]
    fn test_programmatic_focus_and_pending() {
        let mut focused = ContainerNode::new("focused", Flag::Focused, CodeLocation::unknown());
        focused.push_subject_node(passing("a", Flag::None));
        focused.push_subject_node(passing("b", Flag::Pending));

        let mut root = ContainerNode::new("[Top Level]", Flag::None, CodeLocation::unknown());
        root.push_subject_node(passing("plain", Flag::None));
        root.push_subject_node(passing("idle", Flag::Pending));
        root.push_container_node(focused);

        assert_eq!(
            dispositions(&root, config()),
            vec![
                ("plain".to_string(), Disposition::Skipped),
                ("idle".to_string(), Disposition::Pending),
                ("focused a".to_string(), Disposition::Run),
                ("focused b".to_string(), Disposition::Pending),
            ]
        );
    }

    #[test]
    fn test_regex_focus_skip_and_measurements() {
        let mut root = ContainerNode::new("[Top Level]", Flag::None, CodeLocation::unknown());
        root.push_subject_node(passing("Book loads", Flag::None));
        root.push_subject_node(passing("Book saves slowly", Flag::None));
        root.push_subject_node(passing("Shelf", Flag::None));
        root.push_subject_node(SubjectNode::Benchmark(BenchmarkNode {
            text: "Book bench".to_string(),
            body: Arc::new(|_: &mut Benchmarker| {}),
            flag: Flag::None,
            location: CodeLocation::unknown(),
            timeout: DEFAULT_TIMEOUT,
            sample_count: 1,
            maximum_duration: Duration::ZERO,
        }));

        let config = RunConfig {
            focus: Some("^Book".to_string()),
            skip: Some("slow".to_string()),
            skip_measurements: true,
            ..config()
        };
        let result: Vec<Disposition> = dispositions(&root, config)
            .into_iter()
            .map(|(_, d)| d)
            .collect();
        assert_eq!(
            result,
            vec![
                Disposition::Run,
                Disposition::Skipped,
                Disposition::Skipped,
                Disposition::Skipped,
            ]
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let config = RunConfig {
            focus: Some("(unclosed".to_string()),
            ..config()
        };
        let err = ExampleCollection::new(
            Arc::new(TestHandle::new()),
            "suite",
            Vec::new(),
            Box::new(Recorder::default()),
            config,
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ConfigError::InvalidPattern {
                flag: "ginkgo.focus",
                ..
            }
        ));
    }

    #[test]
    fn test_parallel_slice() {
        let mut root = ContainerNode::new("[Top Level]", Flag::None, CodeLocation::unknown());
        for i in 0..5 {
            root.push_subject_node(passing(&format!("s{i}"), Flag::None));
        }

        let mut seen = Vec::new();
        for node in 1..=2 {
            let config = RunConfig {
                parallel_node: node,
                parallel_total: 2,
                ..config()
            };
            seen.extend(dispositions(&root, config).into_iter().map(|(text, _)| text));
        }
        assert_eq!(seen, vec!["s0", "s1", "s2", "s3", "s4"]);
    }

    #[test]
    fn test_fail_fast_and_testing_handle() {
        let mut root = ContainerNode::new("[Top Level]", Flag::None, CodeLocation::unknown());
        root.push_subject_node(passing("first", Flag::None));
        root.push_subject_node(spec("second", Flag::None, Body::sync(|| panic!("boom"))));
        root.push_subject_node(passing("third", Flag::None));

        let recorder = Recorder::default();
        let completed = Arc::clone(&recorder.completed);
        let handle = Arc::new(TestHandle::new());
        let collection = ExampleCollection::new(
            handle.clone(),
            "suite",
            root.generate_examples(),
            Box::new(recorder),
            RunConfig {
                fail_fast: true,
                ..config()
            },
        )
        .unwrap();

        let summary = collection.run();
        assert!(!summary.succeeded);
        assert_eq!((summary.passed, summary.failed, summary.skipped), (1, 1, 1));
        assert!(handle.failed());
        assert_eq!(
            *completed.lock().unwrap(),
            vec![
                ("first".to_string(), ExampleState::Passed),
                ("second".to_string(), ExampleState::Panicked),
                ("third".to_string(), ExampleState::Skipped),
            ]
        );
    }

    #[test]
    fn test_fail_on_pending() {
        let mut root = ContainerNode::new("[Top Level]", Flag::None, CodeLocation::unknown());
        root.push_subject_node(passing("done", Flag::None));
        root.push_subject_node(passing("later", Flag::Pending));

        for (fail_on_pending, expected) in [(false, true), (true, false)] {
            let handle = Arc::new(TestHandle::new());
            let collection = ExampleCollection::new(
                handle.clone(),
                "suite",
                root.generate_examples(),
                Box::new(Recorder::default()),
                RunConfig {
                    fail_on_pending,
                    ..config()
                },
            )
            .unwrap();
            let summary = collection.run();
            assert_eq!(summary.succeeded, expected);
            assert_eq!(handle.failed(), !expected);
            assert_eq!(summary.pending, 1);
        }
    }

    #[test]
    fn test_failure_outside_example_is_discarded() {
        let collection = ExampleCollection::new(
            Arc::new(TestHandle::new()),
            "suite",
            Vec::new(),
            Box::new(Recorder::default()),
            config(),
        )
        .unwrap();
        assert!(!collection.fail(FailureData::assertion("stray", CodeLocation::unknown())));
    }
}
