//! Deferred-frame scheduling.
//!
//! Overlay opening (and post-transaction focus) is never synchronous with
//! the event that triggers it: overlay construction is expensive, and focus
//! must land after the host's own selection side effects settle. Hosts
//! provide their "next animation frame" through this trait; tests
//! substitute an immediate or manually-drained scheduler.

use std::cell::RefCell;
use std::collections::VecDeque;

/// A "next UI tick" scheduler.
pub trait FrameScheduler {
    /// Run `f` on the next frame. Scheduled work is never cancelled;
    /// callbacks must re-check their preconditions when they run.
    fn schedule(&self, f: Box<dyn FnOnce()>);
}

/// Runs scheduled work inline. Useful for tests and for hosts without a
/// frame clock.
#[derive(Debug, Default)]
pub struct ImmediateScheduler;

impl FrameScheduler for ImmediateScheduler {
    fn schedule(&self, f: Box<dyn FnOnce()>) {
        f();
    }
}

/// Queues scheduled work until explicitly drained.
///
/// Lets tests interleave events between the trigger and its deferred
/// continuation, e.g. deselect a node before its scheduled overlay open
/// runs.
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run queued callbacks until the queue is empty, including work they
    /// schedule in turn.
    pub fn run_all(&self) {
        loop {
            let job = self.queue.borrow_mut().pop_front();
            match job {
                Some(f) => f(),
                None => break,
            }
        }
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule(&self, f: Box<dyn FnOnce()>) {
        self.queue.borrow_mut().push_back(f);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
