//! System Call Interface
//!
//! Validates, decodes and dispatches requests arriving through the syscall
//! trap.
//!
//! # Security Model
//! - Every user address passes the [`AddressValidator`] before use
//! - A bad address terminates the process with status -1
//! - Other failures are reported through the request's sentinel value
//!
//! # Syscalls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmd_line) -> pid | -1
//! - 3: wait(pid) -> status | -1
//! - 4: create(name, initial_size) -> bool
//! - 5: remove(name) -> bool
//! - 6: open(name) -> fd | -1
//! - 7: filesize(fd) -> bytes | -1
//! - 8: read(fd, buf, size) -> bytes | -1
//! - 9: write(fd, buf, size) -> bytes | -1
//! - 10: seek(fd, position)
//! - 11: tell(fd) -> position | 0
//! - 12: close(fd)

mod args;
mod file;
mod handler;
mod proc;
mod validate;


pub use args::extract;
pub use handler::{numbers, Syscall, Syscalls};
pub use validate::{regions, AddressValidator, UserAccess, MAX_IO_CHUNK, MAX_USER_STRING};
