//! Process Subsystem Interface
//!
//! Process records and the parent/child hand-offs built on them.
//!
//! # Design
//! - The scheduler owns records and threads; this crate only reads and
//!   signals through shared `Arc<Process>` references
//! - Children are linked to the parent that exec'd them and unlinked when
//!   reaped

pub mod lifecycle;
mod record;

use alloc::sync::Arc;

pub use record::{Pid, Process};

/// Scheduler operations consumed by the syscall layer.
pub trait ProcessControl {
    /// Start a new process from a command line.
    ///
    /// The new process's creation path must call [`Process::finish_load`]
    /// exactly once, whether or not its image loads. Returns `None` if no
    /// process could be created at all.
    fn spawn(&self, cmd_line: &str) -> Option<Pid>;

    /// Record for `pid`. Must keep resolving a spawned process at least
    /// until its parent has looked it up.
    fn lookup(&self, pid: Pid) -> Option<Arc<Process>>;

    /// Record of the process whose thread trapped into the kernel.
    fn current(&self) -> Arc<Process>;

    /// Give the processor to another runnable process.
    ///
    /// Called in a loop while the current process waits in `exec` or `wait`.
    /// The kernel should park or deschedule the caller here rather than
    /// return immediately.
    fn yield_now(&self);

    /// Tear down the current process and schedule something else.
    fn exit_current(&self) -> !;
}
