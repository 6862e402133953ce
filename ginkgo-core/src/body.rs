//! Runnable Bodies
//!
//! Test logic attached to hooks and subject nodes. The kind of body is chosen
//! when the node is registered:
//! - [`Body::Sync`] runs to completion on the calling thread
//! - [`Body::Async`] receives a [`Done`] handle and completes when it is
//!   signalled, or fails once the node's timeout elapses
//! - [`BenchmarkBody`] receives a [`Benchmarker`] and is sampled repeatedly

use crate::Benchmarker;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Timeout applied to async bodies when none is given
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Body of a benchmark subject
pub type BenchmarkBody = Arc<dyn Fn(&mut Benchmarker) + Send + Sync>;

/// Callable attached to a spec or hook node
#[derive(Clone)]
pub enum Body {
    /// Plain body, complete when it returns
    Sync(Arc<dyn Fn() + Send + Sync>),
    /// Body that signals completion through [`Done`]
    Async(Arc<dyn Fn(Done) + Send + Sync>),
}

impl Body {
    /// Wrap a plain closure
    pub fn sync(f: impl Fn() + Send + Sync + 'static) -> Self {
        Body::Sync(Arc::new(f))
    }

    /// Wrap a closure that completes through a [`Done`] handle
    pub fn with_done(f: impl Fn(Done) + Send + Sync + 'static) -> Self {
        Body::Async(Arc::new(f))
    }

    /// Whether the body completes through [`Done`]
    pub fn is_async(&self) -> bool {
        matches!(self, Body::Async(_))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Sync(_) => write!(f, "Body::Sync"),
            Body::Async(_) => write!(f, "Body::Async"),
        }
    }
}

/// How an async body finished
pub enum Completion {
    /// [`Done::done`] was called
    Done,
    /// The body unwound before signalling; carries the panic payload
    Unwound(Box<dyn Any + Send>),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Done => write!(f, "Completion::Done"),
            Completion::Unwound(_) => write!(f, "Completion::Unwound(..)"),
        }
    }
}

/// Completion handle passed to async bodies.
///
/// May be moved to another thread; the body is complete once any clone calls
/// [`Done::done`].
#[derive(Clone)]
pub struct Done {
    tx: Sender<Completion>,
}

impl Done {
    /// Create a handle and the receiver the runner waits on
    pub fn channel() -> (Done, Receiver<Completion>) {
        let (tx, rx) = mpsc::channel();
        (Done { tx }, rx)
    }

    /// Signal that the async body has finished
    pub fn done(self) {
        let _ = self.tx.send(Completion::Done);
    }

    /// Forward a panic payload caught on the body's thread
    #[doc(hidden)]
    pub fn unwound(self, payload: Box<dyn Any + Send>) {
        let _ = self.tx.send(Completion::Unwound(payload));
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_signals_receiver() {
        let (done, rx) = Done::channel();
        let worker = done.clone();
        std::thread::spawn(move || worker.done());
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)),
            Ok(Completion::Done)
        ));
        drop(done);
    }

    #[test]
    fn test_dropped_done_disconnects() {
        let (done, rx) = Done::channel();
        drop(done);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_body_kinds() {
        assert!(!Body::sync(|| {}).is_async());
        assert!(Body::with_done(|done| done.done()).is_async());
        assert_eq!(format!("{:?}", Body::sync(|| {})), "Body::Sync");
    }
}
