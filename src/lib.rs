//! usergate - User/Kernel Trap Boundary
//!
//! The layer between an unprivileged process and the kernel services it asks
//! for. Everything a process claims about its own memory is checked here
//! before the kernel acts on it.
//!
//! # Components
//! - Address validation and user memory access ([`syscall::AddressValidator`])
//! - Argument marshalling from the trapped user stack
//! - Syscall dispatch ([`syscall::Syscalls`])
//! - Per-process descriptor tables ([`fd::FdTable`])
//! - Filesystem serialization ([`fs::FileLock`])
//! - Process creation hand-off and exit delivery ([`process`])
//!
//! # Collaborators
//! The scheduler, filesystem, console and power controller are owned by the
//! embedding kernel and reached through the traits [`process::ProcessControl`],
//! [`fs::FileSystem`], [`drivers::console::Console`] and
//! [`drivers::power::Power`]. User memory is reached through
//! [`mm::UserMemory`], only ever with validated addresses.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod drivers;
pub mod fd;
pub mod fs;
pub mod mm;
pub mod process;
pub mod sync;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

pub use syscall::Syscalls;
pub use trap::TrapFrame;
