//! Process Service Routines
//!
//! `halt`, `exit`, `exec` and `wait`, plus the termination path shared with
//! the fault handler.

use core::fmt::Write;

use log::debug;

use crate::drivers::console::ConsoleWriter;
use crate::mm::{UserAddr, UserFault};
use crate::process::{lifecycle, Pid};

use super::handler::Syscalls;

impl Syscalls<'_> {
    pub(super) fn sys_halt(&self) -> ! {
        debug!("[SYSCALL] halt");
        self.power.power_off()
    }

    pub(super) fn sys_exit(&self, status: i32) -> ! {
        self.terminate(status)
    }

    pub(super) fn sys_exec(&self, cmd_line: UserAddr) -> Result<i32, UserFault> {
        let Some(cmd_line) = self.user.read_str(cmd_line)? else {
            return Ok(-1);
        };
        let current = self.processes.current();
        let pid = lifecycle::spawn_and_wait_load(self.processes, &current, &cmd_line);
        Ok(pid.map_or(-1, Pid::as_i32))
    }

    pub(super) fn sys_wait(&self, pid: i32) -> i32 {
        let current = self.processes.current();
        lifecycle::wait_for_child(self.processes, &current, Pid::new(pid)).unwrap_or(-1)
    }

    /// Terminate the current process with `status`.
    ///
    /// Prints the termination notice, closes the process's descriptors,
    /// publishes the status to a waiting parent and hands the thread back to
    /// the scheduler.
    pub fn terminate(&self, status: i32) -> ! {
        let current = self.processes.current();

        let mut out = ConsoleWriter::new(self.console);
        let _ = writeln!(out, "{}: exit({})", current.name(), status);
        out.flush();

        self.release_descriptors(&current);
        if !lifecycle::publish_exit(&current, status) {
            debug!("[PROCESS] {} already published an exit status", current.name());
        }

        // exit_current never returns; release the record before handing off.
        drop(current);
        self.processes.exit_current()
    }
}
