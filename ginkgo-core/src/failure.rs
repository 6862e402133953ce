//! Failure Records
//!
//! A failure is either an intentional assertion failure raised through `fail`,
//! an unexpected panic recovered from a body, or an async body that never
//! signalled completion.

use crate::CodeLocation;
use serde::Serialize;
use std::any::Any;
use std::time::Duration;

/// A single failure event for the running example
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FailureData {
    /// Raised deliberately by the test body
    Assertion {
        /// Message given to `fail`
        message: String,
        /// Where `fail` was called
        location: CodeLocation,
    },
    /// The body panicked without going through `fail`
    UnexpectedPanic {
        /// Message wrapping the recovered value
        message: String,
        /// Text of the recovered panic payload
        recovered: String,
        /// Location of the node whose body panicked
        location: CodeLocation,
        /// Backtrace of the runner frame that recovered the panic, when
        /// `RUST_BACKTRACE` enables capture. The panic site itself is in the
        /// default panic hook's output.
        backtrace: Option<String>,
    },
    /// An async body did not call `done` in time
    Timeout {
        /// Message naming the elapsed timeout
        message: String,
        /// Location of the node that timed out
        location: CodeLocation,
        /// Timeout that elapsed
        timeout: Duration,
    },
}

impl FailureData {
    /// Build an assertion failure
    pub fn assertion(message: impl Into<String>, location: CodeLocation) -> Self {
        FailureData::Assertion {
            message: message.into(),
            location,
        }
    }

    /// Build a failure from a recovered panic payload
    pub fn unexpected_panic(
        payload: &(dyn Any + Send),
        location: CodeLocation,
        backtrace: Option<String>,
    ) -> Self {
        let recovered = panic_message(payload);
        FailureData::UnexpectedPanic {
            message: format!("Test Panicked: {recovered}"),
            recovered,
            location,
            backtrace,
        }
    }

    /// Build a timeout failure
    pub fn timeout(timeout: Duration, location: CodeLocation) -> Self {
        FailureData::Timeout {
            message: format!("Timed out after {timeout:?}"),
            location,
            timeout,
        }
    }

    /// Human-readable failure message
    pub fn message(&self) -> &str {
        match self {
            FailureData::Assertion { message, .. }
            | FailureData::UnexpectedPanic { message, .. }
            | FailureData::Timeout { message, .. } => message,
        }
    }

    /// Where the failure happened
    pub fn location(&self) -> &CodeLocation {
        match self {
            FailureData::Assertion { location, .. }
            | FailureData::UnexpectedPanic { location, .. }
            | FailureData::Timeout { location, .. } => location,
        }
    }

    /// The recovered panic value, present only for unexpected panics
    pub fn forwarded_panic(&self) -> Option<&str> {
        match self {
            FailureData::UnexpectedPanic { recovered, .. } => Some(recovered),
            _ => None,
        }
    }
}

/// Unwind payload used by `fail` to stop the running body.
///
/// The failure itself has already been forwarded to the running collection;
/// runners recognise this payload and do not treat it as a panic.
#[derive(Debug, Clone, Copy)]
pub struct AssertionSentinel;

/// Extract a message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_panic_keeps_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let failure = FailureData::unexpected_panic(payload.as_ref(), CodeLocation::unknown(), None);
        assert_eq!(failure.forwarded_panic(), Some("boom"));
        assert_eq!(failure.message(), "Test Panicked: boom");
    }

    #[test]
    fn test_assertion_has_no_forwarded_panic() {
        let location = CodeLocation::new("specs.rs", 12);
        let failure = FailureData::assertion("expected 3", location.clone());
        assert_eq!(failure.forwarded_panic(), None);
        assert_eq!(failure.location(), &location);
        assert_eq!(failure.message(), "expected 3");
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "Unknown panic");
    }
}
