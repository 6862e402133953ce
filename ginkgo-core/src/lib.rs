#![warn(missing_docs)]
//! Ginkgo Core - Spec Tree Model
//!
//! This crate provides the data side of a ginkgo suite:
//! - [`ContainerNode`], [`SubjectNode`] and [`HookNode`], the declaration tree
//! - [`SpecTree`], the tree plus the cursor stack used while declaring
//! - [`Body`] and [`BenchmarkBody`], the closed set of callable kinds
//! - [`Example`], a subject flattened together with its inherited hooks
//! - [`FailureData`], the structured record of one failure
//! - [`CodeLocation`] and [`CodeLocator`] for declaration and failure sites

mod benchmarker;
mod body;
mod example;
mod failure;
mod location;
mod node;
mod tree;

pub use benchmarker::{
    Benchmarker, Measurement, MeasurementKind, MeasurementSummary, RUNTIME_MEASUREMENT, summarize,
};
pub use body::{BenchmarkBody, Body, Completion, DEFAULT_TIMEOUT, Done};
pub use example::{ContainerInfo, Example};
pub use failure::{AssertionSentinel, FailureData, panic_message};
pub use location::{BacktraceLocator, CodeLocation, CodeLocator};
pub use node::{BenchmarkNode, ContainerNode, Flag, HookNode, SpecNode, SubjectNode};
pub use tree::{SpecTree, TOP_LEVEL_TEXT};
