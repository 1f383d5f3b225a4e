//! System Call Handler
//!
//! Decodes the request code and dispatches to the service routines.
//!
//! # Security Considerations
//! - The trap frame's stack pointer is validated before the request code is
//!   read
//! - Every argument word is validated before it is read
//! - Unknown request codes return -1 and are logged

use log::{trace, warn};

use crate::drivers::console::Console;
use crate::drivers::power::Power;
use crate::fs::{FileLock, FileSystem};
use crate::mm::{UserAddr, UserFault, UserMemory};
use crate::process::ProcessControl;
use crate::trap::TrapFrame;

use super::args::extract;
use super::validate::{AddressValidator, UserAccess};

/// System call numbers
pub mod numbers {
    pub const SYS_HALT: u32 = 0;
    pub const SYS_EXIT: u32 = 1;
    pub const SYS_EXEC: u32 = 2;
    pub const SYS_WAIT: u32 = 3;
    pub const SYS_CREATE: u32 = 4;
    pub const SYS_REMOVE: u32 = 5;
    pub const SYS_OPEN: u32 = 6;
    pub const SYS_FILESIZE: u32 = 7;
    pub const SYS_READ: u32 = 8;
    pub const SYS_WRITE: u32 = 9;
    pub const SYS_SEEK: u32 = 10;
    pub const SYS_TELL: u32 = 11;
    pub const SYS_CLOSE: u32 = 12;
}

/// A decoded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt,
    Exit,
    Exec,
    Wait,
    Create,
    Remove,
    Open,
    Filesize,
    Read,
    Write,
    Seek,
    Tell,
    Close,
}

impl Syscall {
    /// Decode a request code.
    pub const fn from_raw(number: u32) -> Option<Self> {
        use numbers::*;
        Some(match number {
            SYS_HALT => Self::Halt,
            SYS_EXIT => Self::Exit,
            SYS_EXEC => Self::Exec,
            SYS_WAIT => Self::Wait,
            SYS_CREATE => Self::Create,
            SYS_REMOVE => Self::Remove,
            SYS_OPEN => Self::Open,
            SYS_FILESIZE => Self::Filesize,
            SYS_READ => Self::Read,
            SYS_WRITE => Self::Write,
            SYS_SEEK => Self::Seek,
            SYS_TELL => Self::Tell,
            SYS_CLOSE => Self::Close,
            _ => return None,
        })
    }

    /// Number of argument words the request takes.
    pub const fn arity(self) -> usize {
        match self {
            Self::Halt => 0,
            Self::Create | Self::Seek => 2,
            Self::Read | Self::Write => 3,
            _ => 1,
        }
    }
}

/// Everything a syscall needs from the rest of the kernel.
///
/// Built per trap (or once per CPU) by the embedding kernel. Holds no state
/// of its own between traps.
pub struct Syscalls<'a> {
    pub(super) user: UserAccess<'a>,
    pub(super) files: &'a dyn FileSystem,
    pub(super) file_lock: &'a FileLock,
    pub(super) processes: &'a dyn ProcessControl,
    pub(super) console: &'a dyn Console,
    pub(super) power: &'a dyn Power,
}

impl<'a> Syscalls<'a> {
    /// Wire up the syscall layer. `file_lock` must be the one serializer
    /// shared by every context in the kernel.
    pub fn new(
        validator: AddressValidator,
        memory: &'a dyn UserMemory,
        files: &'a dyn FileSystem,
        file_lock: &'a FileLock,
        processes: &'a dyn ProcessControl,
        console: &'a dyn Console,
        power: &'a dyn Power,
    ) -> Self {
        Self {
            user: UserAccess::new(validator, memory),
            files,
            file_lock,
            processes,
            console,
            power,
        }
    }

    /// Dispatch one system call.
    ///
    /// Writes the service's result into `frame.ret`; services without a
    /// result leave it untouched. Returns the fault if any user address was
    /// bad; the caller must then terminate the process.
    pub fn dispatch(&self, frame: &mut TrapFrame) -> Result<(), UserFault> {
        let sp = self.user.validator().check(frame.user_sp())?;
        let number = self.user.read_word(sp)?;

        let Some(call) = Syscall::from_raw(number) else {
            warn!("[SYSCALL] Unknown syscall: {}", number);
            frame.set_return(-1);
            return Ok(());
        };
        trace!("[SYSCALL] {:?}/{}", call, call.arity());

        match call {
            Syscall::Halt => self.sys_halt(),
            Syscall::Exit => {
                let [status] = extract::<1>(&self.user, sp)?;
                self.sys_exit(status as i32)
            }
            Syscall::Exec => {
                let [cmd_line] = extract::<1>(&self.user, sp)?;
                frame.set_return(self.sys_exec(UserAddr::new(cmd_line))?);
            }
            Syscall::Wait => {
                let [pid] = extract::<1>(&self.user, sp)?;
                frame.set_return(self.sys_wait(pid as i32));
            }
            Syscall::Create => {
                let [name, size] = extract::<2>(&self.user, sp)?;
                frame.set_bool(self.sys_create(UserAddr::new(name), size)?);
            }
            Syscall::Remove => {
                let [name] = extract::<1>(&self.user, sp)?;
                frame.set_bool(self.sys_remove(UserAddr::new(name))?);
            }
            Syscall::Open => {
                let [name] = extract::<1>(&self.user, sp)?;
                frame.set_return(self.sys_open(UserAddr::new(name))?);
            }
            Syscall::Filesize => {
                let [fd] = extract::<1>(&self.user, sp)?;
                frame.set_return(self.sys_filesize(fd));
            }
            Syscall::Read => {
                let [fd, buf, size] = extract::<3>(&self.user, sp)?;
                frame.set_return(self.sys_read(fd, UserAddr::new(buf), size)?);
            }
            Syscall::Write => {
                let [fd, buf, size] = extract::<3>(&self.user, sp)?;
                frame.set_return(self.sys_write(fd, UserAddr::new(buf), size)?);
            }
            Syscall::Seek => {
                let [fd, position] = extract::<2>(&self.user, sp)?;
                self.sys_seek(fd, position);
            }
            Syscall::Tell => {
                let [fd] = extract::<1>(&self.user, sp)?;
                frame.ret = self.sys_tell(fd);
            }
            Syscall::Close => {
                let [fd] = extract::<1>(&self.user, sp)?;
                self.sys_close(fd);
            }
        }
        Ok(())
    }
}
