//! Process Record
//!
//! The per-process state the trap boundary reads and updates. Records are
//! created and owned by the scheduler and shared by `Arc` with parents that
//! may wait on them.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::{Mutex, MutexGuard};

use crate::fd::FdTable;
use crate::sync::OneShot;

/// Process identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(i32);

impl Pid {
    /// Wrap a scheduler-assigned identifier.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw identifier.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl core::fmt::Display for Pid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A process as seen by the syscall layer.
pub struct Process {
    pid: Pid,
    name: String,
    parent: Option<Pid>,
    files: Mutex<FdTable>,
    /// Raised once by the creation path with the load result.
    load: OneShot<bool>,
    /// Published once at teardown with the final status.
    exit: OneShot<i32>,
    children: Mutex<Vec<Arc<Process>>>,
}

impl Process {
    /// Create a record for a process that has not loaded yet.
    pub fn new(pid: Pid, name: impl Into<String>, parent: Option<Pid>) -> Self {
        Self {
            pid,
            name: name.into(),
            parent,
            files: Mutex::new(FdTable::new()),
            load: OneShot::new(),
            exit: OneShot::new(),
            children: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    /// Exclusive access to the descriptor table.
    ///
    /// Only the process's own thread of control calls this, so the lock is
    /// never contended.
    #[inline]
    pub fn files(&self) -> MutexGuard<'_, FdTable> {
        self.files.lock()
    }

    /// Report the outcome of loading the executable image.
    ///
    /// The creation path must call this exactly once, on failure too, or the
    /// parent blocked in `exec` never wakes. Returns `false` if a result was
    /// already reported.
    pub fn finish_load(&self, success: bool) -> bool {
        self.load.signal(success)
    }

    /// Load result, if reported yet.
    #[inline]
    pub fn load_result(&self) -> Option<bool> {
        self.load.peek()
    }

    /// Final exit status, once the process has terminated.
    #[inline]
    pub fn exit_status(&self) -> Option<i32> {
        self.exit.peek()
    }

    /// Check whether the process has terminated.
    #[inline]
    pub fn has_exited(&self) -> bool {
        self.exit.is_signalled()
    }

    pub(crate) fn load_signal(&self) -> &OneShot<bool> {
        &self.load
    }

    pub(crate) fn exit_signal(&self) -> &OneShot<i32> {
        &self.exit
    }

    /// Link `child` so it can later be found by pid.
    pub fn adopt(&self, child: Arc<Process>) {
        let mut children = self.children.lock();
        if !children.iter().any(|c| c.pid == child.pid) {
            children.push(child);
        }
    }

    /// Find a direct child by pid.
    pub fn child(&self, pid: Pid) -> Option<Arc<Process>> {
        self.children.lock().iter().find(|c| c.pid == pid).cloned()
    }

    /// Unlink a child, returning its record if it was linked.
    pub fn forget_child(&self, pid: Pid) -> Option<Arc<Process>> {
        let mut children = self.children.lock();
        let index = children.iter().position(|c| c.pid == pid)?;
        Some(children.swap_remove(index))
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("load", &self.load)
            .field("exit", &self.exit)
            .finish()
    }
}
