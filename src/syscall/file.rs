//! File Service Routines
//!
//! `create`, `remove`, `open`, `filesize`, `read`, `write`, `seek`, `tell`
//! and `close`. Descriptor 0 reads from the console and descriptor 1 writes
//! to it without touching the filesystem lock; everything else goes through
//! the current process's descriptor table and the [`FileLock`].
//!
//! Data crosses the boundary through a kernel buffer of at most
//! [`MAX_IO_CHUNK`] bytes, however large the user's request. A file transfer
//! holds the lock for all of its chunks, so concurrent transfers on the same
//! file never interleave.
//!
//! [`FileLock`]: crate::fs::FileLock

use alloc::vec;
use alloc::vec::Vec;

use log::debug;

use crate::drivers::console::CONSOLE_TERMINATOR;
use crate::fd::Fd;
use crate::fs::FileHandle;
use crate::mm::{UserAddr, UserFault};
use crate::process::Process;

use super::handler::Syscalls;
use super::validate::MAX_IO_CHUNK;

impl Syscalls<'_> {
    pub(super) fn sys_create(&self, name: UserAddr, initial_size: u32) -> Result<bool, UserFault> {
        let Some(name) = self.user.read_str(name)? else {
            return Ok(false);
        };
        Ok(self.file_lock.serialize(|| self.files.create(&name, initial_size)))
    }

    pub(super) fn sys_remove(&self, name: UserAddr) -> Result<bool, UserFault> {
        let Some(name) = self.user.read_str(name)? else {
            return Ok(false);
        };
        Ok(self.file_lock.serialize(|| self.files.remove(&name)))
    }

    pub(super) fn sys_open(&self, name: UserAddr) -> Result<i32, UserFault> {
        let Some(name) = self.user.read_str(name)? else {
            return Ok(-1);
        };
        let Some(file) = self.file_lock.serialize(|| self.files.open(&name)) else {
            return Ok(-1);
        };

        let bound = self.processes.current().files().open(file);
        match bound {
            Ok(fd) => Ok(fd.as_u32() as i32),
            Err(err) => {
                debug!("[FD] open {:?}: {}", name, err);
                self.file_lock.serialize(|| self.files.close(file));
                Ok(-1)
            }
        }
    }

    pub(super) fn sys_filesize(&self, fd: u32) -> i32 {
        match self.lookup_file(fd) {
            Some(file) => self.file_lock.serialize(|| self.files.length(file)) as i32,
            None => -1,
        }
    }

    pub(super) fn sys_read(&self, fd: u32, buf: UserAddr, size: u32) -> Result<i32, UserFault> {
        self.user.validator().check_range(buf, size)?;

        if Fd::from_raw(fd) == Fd::STDIN {
            return self.read_console(buf, size);
        }
        let Some(file) = self.lookup_file(fd) else {
            return Ok(-1);
        };

        let mut chunk = bounce_buffer(size);
        let read = self.file_lock.serialize(|| -> Result<u32, UserFault> {
            let mut done = 0u32;
            while done < size {
                let want = chunk.len().min((size - done) as usize);
                let got = self.files.read(file, &mut chunk[..want]).min(want);
                self.user.copy_out(offset(buf, done)?, &chunk[..got])?;
                done += got as u32;
                if got < want {
                    break;
                }
            }
            Ok(done)
        })?;
        Ok(read as i32)
    }

    pub(super) fn sys_write(&self, fd: u32, buf: UserAddr, size: u32) -> Result<i32, UserFault> {
        self.user.validator().check_range(buf, size)?;

        if Fd::from_raw(fd) == Fd::STDOUT {
            return self.write_console(buf, size);
        }
        let Some(file) = self.lookup_file(fd) else {
            return Ok(-1);
        };

        let mut chunk = bounce_buffer(size);
        let written = self.file_lock.serialize(|| -> Result<u32, UserFault> {
            let mut done = 0u32;
            while done < size {
                let want = chunk.len().min((size - done) as usize);
                self.user.copy_in(offset(buf, done)?, &mut chunk[..want])?;
                let put = self.files.write(file, &chunk[..want]).min(want);
                done += put as u32;
                if put < want {
                    break;
                }
            }
            Ok(done)
        })?;
        Ok(written as i32)
    }

    pub(super) fn sys_seek(&self, fd: u32, position: u32) {
        if let Some(file) = self.lookup_file(fd) {
            self.file_lock.serialize(|| self.files.seek(file, position));
        }
    }

    pub(super) fn sys_tell(&self, fd: u32) -> u32 {
        self.lookup_file(fd)
            .map(|file| self.file_lock.serialize(|| self.files.tell(file)))
            .unwrap_or(0)
    }

    pub(super) fn sys_close(&self, fd: u32) {
        let unbound = self.processes.current().files().close(Fd::from_raw(fd));
        if let Ok(file) = unbound {
            self.file_lock.serialize(|| self.files.close(file));
        }
    }

    /// Close every descriptor `process` still has bound.
    pub fn release_descriptors(&self, process: &Process) {
        let open = process.files().drain();
        if !open.is_empty() {
            debug!("[FD] {} closing {} descriptors", process.name(), open.len());
        }
        for file in open {
            self.file_lock.serialize(|| self.files.close(file));
        }
    }

    /// Handle bound to `fd` in the current process.
    fn lookup_file(&self, fd: u32) -> Option<FileHandle> {
        self.processes.current().files().get(Fd::from_raw(fd))
    }

    /// Copy `size` bytes at `buf` to the console, one chunk per `putbuf`.
    fn write_console(&self, buf: UserAddr, size: u32) -> Result<i32, UserFault> {
        let mut chunk = bounce_buffer(size);
        let mut done = 0u32;
        while done < size {
            let want = chunk.len().min((size - done) as usize);
            self.user.copy_in(offset(buf, done)?, &mut chunk[..want])?;
            self.console.putbuf(&chunk[..want]);
            done += want as u32;
        }
        Ok(size as i32)
    }

    /// Read console input into `buf` until the terminator or `size` bytes.
    fn read_console(&self, buf: UserAddr, size: u32) -> Result<i32, UserFault> {
        let mut count = 0u32;
        while count < size {
            let byte = self.console.getc();
            if byte == CONSOLE_TERMINATOR {
                break;
            }
            self.user.put_byte(offset(buf, count)?, byte)?;
            count += 1;
        }
        Ok(count as i32)
    }
}

/// Kernel staging buffer for a transfer of `size` bytes, capped at one chunk.
fn bounce_buffer(size: u32) -> Vec<u8> {
    vec![0u8; (size as usize).min(MAX_IO_CHUNK)]
}

fn offset(buf: UserAddr, done: u32) -> Result<UserAddr, UserFault> {
    buf.checked_add(done).ok_or(UserFault::at(buf))
}
