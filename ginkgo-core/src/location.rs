//! Code Locations
//!
//! Every node in the spec tree carries the source location it was declared at.
//! Declarations use `#[track_caller]`; failures raised at run time resolve their
//! location through a [`CodeLocator`] so the caller can skip wrapper frames.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

/// Source position of a declaration or a failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeLocation {
    /// Source file path (empty when unknown)
    pub file: String,
    /// One-based line number (0 when unknown)
    pub line: u32,
}

impl CodeLocation {
    /// Create a location from a file and line
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location used when nothing better is known
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Whether this is the unknown location
    pub fn is_unknown(&self) -> bool {
        self.file.is_empty()
    }

    /// Location of the caller of the `#[track_caller]` chain this is invoked from
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&Location<'_>> for CodeLocation {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

/// Maps a stack-skip count to a source location.
///
/// `skip = 0` is the frame that called `locate`'s caller; each increment moves
/// one user frame further out.
pub trait CodeLocator: Send + Sync {
    /// Resolve the location `skip` frames above the caller
    fn locate(&self, skip: usize) -> CodeLocation;
}

/// Locator that walks a captured backtrace.
///
/// Frames from the standard library and from this module are ignored. Without
/// debug info the backtrace carries no file positions and the result is
/// [`CodeLocation::unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceLocator;

impl CodeLocator for BacktraceLocator {
    fn locate(&self, skip: usize) -> CodeLocation {
        let rendered = Backtrace::force_capture().to_string();
        user_frames(&rendered)
            .into_iter()
            .nth(skip)
            .unwrap_or_default()
    }
}

const INTERNAL_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rust",
    "rust_begin_unwind",
    "ginkgo_core::location::",
    "<ginkgo_core::location::",
];

fn is_internal(function: &str, file: &str) -> bool {
    INTERNAL_PREFIXES.iter().any(|p| function.starts_with(p))
        || file.contains("/rustc/")
        || file.contains("/library/std/")
        || file.contains("/library/core/")
}

/// Parse a rendered `std::backtrace::Backtrace` into user frame locations
fn user_frames(rendered: &str) -> Vec<CodeLocation> {
    let mut frames = Vec::new();
    let mut function: Option<&str> = None;

    for line in rendered.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(position) = line.strip_prefix("at ") {
            let Some(name) = function.take() else {
                continue;
            };
            let Some(location) = parse_position(position) else {
                continue;
            };
            if !is_internal(name, &location.file) {
                frames.push(location);
            }
        } else {
            // "12: some::function" or a bare inlined symbol name
            let name = match line.split_once(": ") {
                Some((index, rest)) if index.chars().all(|c| c.is_ascii_digit()) => rest,
                _ => line,
            };
            function = Some(name);
        }
    }

    frames
}

/// Parse `path/to/file.rs:LINE:COL`
fn parse_position(position: &str) -> Option<CodeLocation> {
    let mut parts = position.rsplitn(3, ':');
    let _column = parts.next()?;
    let line = parts.next()?.parse().ok()?;
    let file = parts.next()?;
    Some(CodeLocation::new(file, line))
}
