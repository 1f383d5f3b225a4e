//! Console Device Access
//!
//! The console driver is owned by the embedding kernel. This module defines
//! the two operations the syscall layer needs from it.
//!
//! # Notes
//! - Console I/O is already serialized by the driver, so it never takes the
//!   filesystem lock
//! - Output is raw bytes; no newline translation happens here
//! - Kernel-formatted text goes through [`ConsoleWriter`], which batches it
//!   on the stack so a short line reaches the console in one `putbuf`

use core::fmt::{self, Write};

/// Byte that ends a console read.
pub const CONSOLE_TERMINATOR: u8 = 0;

/// Character console consumed by the `read` and `write` syscalls on
/// descriptors 0 and 1.
pub trait Console {
    /// Block until one input byte is available and return it.
    fn getc(&self) -> u8;

    /// Write the whole buffer to the console.
    fn putbuf(&self, buf: &[u8]);
}

/// Bytes [`ConsoleWriter`] collects before handing them to the console.
pub const CONSOLE_LINE: usize = 128;

/// `fmt::Write` adapter over a [`Console`] with a fixed stack buffer.
///
/// Output reaches the console when the buffer fills or on [`flush`]. Text
/// still buffered when the writer is dropped is flushed then.
///
/// [`flush`]: ConsoleWriter::flush
pub struct ConsoleWriter<'a> {
    console: &'a dyn Console,
    buf: [u8; CONSOLE_LINE],
    len: usize,
}

impl<'a> ConsoleWriter<'a> {
    pub const fn new(console: &'a dyn Console) -> Self {
        Self {
            console,
            buf: [0; CONSOLE_LINE],
            len: 0,
        }
    }

    /// Send everything buffered so far.
    pub fn flush(&mut self) {
        if self.len > 0 {
            self.console.putbuf(&self.buf[..self.len]);
            self.len = 0;
        }
    }
}

impl Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut rest = s.as_bytes();
        while !rest.is_empty() {
            if self.len == CONSOLE_LINE {
                self.flush();
            }
            let take = rest.len().min(CONSOLE_LINE - self.len);
            self.buf[self.len..self.len + take].copy_from_slice(&rest[..take]);
            self.len += take;
            rest = &rest[take..];
        }
        Ok(())
    }
}

impl Drop for ConsoleWriter<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}
