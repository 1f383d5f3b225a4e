//! One-Shot Signal
//!
//! A single-permit wait/notify object. One side raises it exactly once with a
//! value; the other side takes that value exactly once, blocking until it is
//! available. A waiter hands the processor back through a caller-supplied
//! relax hook on every pass, so it never burns a whole timeslice.
//!
//! # Properties
//! - A signal raised before anyone waits is kept, so no wakeup is lost
//! - The first value wins; later signals are rejected
//! - Only the first `wait` observes the value; later waits get `None`

use core::sync::atomic::{AtomicBool, Ordering};

use spin::Once;

/// A value published once by one thread of control and consumed once by
/// another.
pub struct OneShot<T> {
    value: Once<T>,
    taken: AtomicBool,
}

impl<T: Copy> OneShot<T> {
    /// Create an unsignalled one-shot.
    pub const fn new() -> Self {
        Self {
            value: Once::new(),
            taken: AtomicBool::new(false),
        }
    }

    /// Publish `value`.
    ///
    /// Returns `false` if the signal had already been raised, in which case
    /// the earlier value is kept.
    pub fn signal(&self, value: T) -> bool {
        let mut fresh = false;
        self.value.call_once(|| {
            fresh = true;
            value
        });
        fresh
    }

    /// Check whether the signal has been raised.
    #[inline]
    pub fn is_signalled(&self) -> bool {
        self.value.is_completed()
    }

    /// Read the published value without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<T> {
        self.value.poll().copied()
    }

    /// Check whether the value has already been claimed by a waiter.
    #[inline]
    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }

    /// Block until the signal is raised and take its value, calling `relax`
    /// each time it is found still pending.
    ///
    /// Returns `None` without blocking if an earlier wait already claimed it.
    pub fn wait(&self, mut relax: impl FnMut()) -> Option<T> {
        if self.taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        loop {
            if let Some(value) = self.value.poll() {
                return Some(*value);
            }
            relax();
        }
    }
}

impl<T: Copy> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + core::fmt::Debug> core::fmt::Debug for OneShot<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.peek() {
            Some(value) => write!(f, "OneShot({:?}, taken={})", value, self.is_taken()),
            None => write!(f, "OneShot(pending)"),
        }
    }
}
