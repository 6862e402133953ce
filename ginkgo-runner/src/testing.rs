//! Native Test Context
//!
//! The host test harness sees a suite as a single test. [`TestingT`] is the
//! hook through which a failed suite marks that test as failed.

use std::sync::atomic::{AtomicBool, Ordering};

/// The native test context a suite reports its overall result to
pub trait TestingT: Send + Sync {
    /// Mark the enclosing test as failed
    fn fail(&self);
}

/// [`TestingT`] that records failure in a flag
#[derive(Debug, Default)]
pub struct TestHandle {
    failed: AtomicBool,
}

impl TestHandle {
    /// Create a handle that has not failed
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`TestingT::fail`] has been called
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

impl TestingT for TestHandle {
    fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }
}
