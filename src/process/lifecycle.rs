//! Process Lifecycle Synchronization
//!
//! Two hand-offs between a parent and its children:
//! - Creation: the parent blocks in `exec` until the child reports whether
//!   its image loaded
//! - Termination: the parent blocks in `wait` until the child publishes its
//!   exit status, and takes that status exactly once
//!
//! Both sides meet on one-shot signals stored in the child's record, so the
//! order in which the two threads arrive does not matter. A blocked parent
//! yields through [`ProcessControl::yield_now`] until its signal arrives.

use alloc::sync::Arc;

use log::debug;

use super::record::{Pid, Process};
use super::ProcessControl;

/// Create a child from `cmd_line` and wait until it has loaded.
///
/// Returns the child's pid if its image loaded. A child that failed to load
/// still exists and stays linked to `parent`, but `None` is returned.
pub fn spawn_and_wait_load(
    procs: &dyn ProcessControl,
    parent: &Process,
    cmd_line: &str,
) -> Option<Pid> {
    let pid = procs.spawn(cmd_line)?;
    let Some(child) = procs.lookup(pid) else {
        debug!("[PROCESS] spawned pid {} has no record", pid);
        return None;
    };
    parent.adopt(Arc::clone(&child));

    let loaded = child
        .load_signal()
        .wait(|| procs.yield_now())
        .unwrap_or(false);
    debug!(
        "[PROCESS] {} exec {:?} -> pid {} loaded={}",
        parent.name(),
        cmd_line,
        pid,
        loaded
    );
    loaded.then_some(pid)
}

/// Wait for child `pid` of `parent` to terminate and reap its status.
///
/// Returns `None` if `pid` is not a live child of `parent`, which includes
/// children that were already reaped.
pub fn wait_for_child(procs: &dyn ProcessControl, parent: &Process, pid: Pid) -> Option<i32> {
    let child = parent.child(pid)?;
    let status = child.exit_signal().wait(|| procs.yield_now());
    parent.forget_child(pid);
    debug!("[PROCESS] {} reaped pid {} status {:?}", parent.name(), pid, status);
    status
}

/// Publish the final status of `process`, waking a parent blocked in `wait`.
///
/// The first status wins; returns `false` if one was already published.
pub fn publish_exit(process: &Process, status: i32) -> bool {
    process.exit_signal().signal(status)
}
