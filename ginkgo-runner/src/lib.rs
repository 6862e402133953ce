#![warn(missing_docs)]
//! Ginkgo Runner
//!
//! Turns a declared spec tree into a run:
//! - [`Suite`] owns the tree while it is declared and the run while it executes
//! - [`RunConfig`] layers defaults, `ginkgo.toml` and `--ginkgo.*` flags
//! - [`ExampleCollection`] selects, partitions and executes flattened examples
//! - [`Reporter`] observes the run; [`TracingReporter`] logs it
//! - [`TestingT`] connects the suite result to the host test harness
//!
//! # Example
//!
//! ```ignore
//! use ginkgo_core::{Body, CodeLocation, DEFAULT_TIMEOUT, Flag};
//! use ginkgo_runner::{RunConfig, Suite, TestHandle, TracingReporter};
//! use std::sync::Arc;
//!
//! let suite = Suite::new();
//! suite.push_container_node("Book", || {
//!     suite.push_it_node("has a title", Body::sync(|| {}), Flag::None,
//!         CodeLocation::caller(), DEFAULT_TIMEOUT);
//! }, Flag::None, CodeLocation::caller());
//!
//! let summary = suite.run(Arc::new(TestHandle::new()), "Books",
//!     Box::new(TracingReporter), &RunConfig::resolve()?)?;
//! ```

mod collection;
mod config;
mod execution;
mod partition;
mod reporter;
mod suite;
mod testing;

pub use collection::{Disposition, ExampleCollection};
pub use config::*;
pub use partition::parallelized_index_range;
pub use reporter::{ExampleState, ExampleSummary, Reporter, SuiteSummary, TracingReporter};
pub use suite::{Suite, SuiteError};
pub use testing::{TestHandle, TestingT};
