//! Syscall Trap Entry
//!
//! User code requests a service with a software interrupt on
//! [`SYSCALL_VECTOR`]. The low-level stub saves state into a [`TrapFrame`]
//! and calls [`syscall_trap`].
//!
//! # Frame Layout
//! - `sp`: user stack pointer; word 0 is the request code, words 1.. are
//!   the arguments
//! - `ret`: return-value slot copied back into the user's result register
//!
//! # Security Considerations
//! - The frame's stack pointer is as untrusted as any other user word
//! - A bad address anywhere in the request terminates the process; it is
//!   never reported back as a return value

use log::warn;

use crate::mm::UserAddr;
use crate::syscall::Syscalls;

/// Interrupt vector used for system calls.
pub const SYSCALL_VECTOR: u8 = 0x30;

/// Trap frame saved on the kernel stack for one system call.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// User stack pointer at the time of the trap
    pub sp: u32,
    /// Return value slot
    pub ret: u32,
}

impl TrapFrame {
    /// Frame for a trap taken with the given user stack pointer.
    #[inline]
    pub const fn new(sp: u32) -> Self {
        Self { sp, ret: 0 }
    }

    /// User stack pointer as an address.
    #[inline]
    pub const fn user_sp(&self) -> UserAddr {
        UserAddr::new(self.sp)
    }

    /// Store a signed return value.
    #[inline]
    pub fn set_return(&mut self, value: i32) {
        self.ret = value as u32;
    }

    /// Store a boolean return value as 1 or 0.
    #[inline]
    pub fn set_bool(&mut self, value: bool) {
        self.ret = value as u32;
    }

    /// Return slot read back as a signed value.
    #[inline]
    pub const fn return_value(&self) -> i32 {
        self.ret as i32
    }
}

/// Handle a system call trap.
///
/// Runs exactly one service routine. If the request touches an address the
/// process does not own, the process is terminated with status -1 and this
/// function does not return.
pub fn syscall_trap(syscalls: &Syscalls<'_>, frame: &mut TrapFrame) {
    if let Err(fault) = syscalls.dispatch(frame) {
        warn!("[TRAP] user fault: {}", fault);
        syscalls.terminate(-1);
    }
}
