//! File Descriptor Table
//!
//! A per-process map from small integers to open filesystem handles.
//!
//! # Design
//! - Sparse map, so closed descriptors cost nothing
//! - Descriptors 0 and 1 are the console and never stored here
//! - Allocation hands out the lowest free descriptor >= 2

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::fs::FileHandle;

/// Maximum number of descriptors a process may have bound at once,
/// counting the two console descriptors.
pub const MAX_OPEN_FILES: usize = 128;

/// A descriptor number as seen by user code.
///
/// This is a newtype to keep descriptor numbers apart from other user words.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Fd(u32);

impl Fd {
    /// Console input.
    pub const STDIN: Self = Self(0);

    /// Console output.
    pub const STDOUT: Self = Self(1);

    /// First descriptor bound to a file.
    pub const FIRST_FILE: Self = Self(2);

    /// Wrap a raw descriptor word from user space. Any value is accepted;
    /// out-of-range numbers simply never resolve.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the descriptor number.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Check whether this descriptor can name a file slot.
    #[inline]
    pub const fn is_file(self) -> bool {
        self.0 >= Self::FIRST_FILE.0 && (self.0 as usize) < MAX_OPEN_FILES
    }
}

impl core::fmt::Display for Fd {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    /// Every file descriptor is bound.
    TableFull,
    /// The descriptor is out of range, a console descriptor, or empty.
    BadDescriptor,
}

impl core::fmt::Display for FdError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TableFull => write!(f, "descriptor table full"),
            Self::BadDescriptor => write!(f, "bad file descriptor"),
        }
    }
}

/// Descriptor table for one process.
///
/// Only the owning process touches its table.
#[derive(Debug, Default)]
pub struct FdTable {
    files: BTreeMap<Fd, FileHandle>,
}

impl FdTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            files: BTreeMap::new(),
        }
    }

    /// Bind `file` to the lowest free descriptor.
    pub fn open(&mut self, file: FileHandle) -> Result<Fd, FdError> {
        let fd = self.find_free().ok_or(FdError::TableFull)?;
        self.files.insert(fd, file);
        Ok(fd)
    }

    /// Look up the handle bound to `fd`.
    #[inline]
    pub fn get(&self, fd: Fd) -> Option<FileHandle> {
        self.files.get(&fd).copied()
    }

    /// Unbind `fd` and hand back its handle so the caller can close it.
    pub fn close(&mut self, fd: Fd) -> Result<FileHandle, FdError> {
        self.files.remove(&fd).ok_or(FdError::BadDescriptor)
    }

    /// Unbind every descriptor, returning the handles still open.
    pub fn drain(&mut self) -> Vec<FileHandle> {
        core::mem::take(&mut self.files).into_values().collect()
    }

    /// Number of bound file descriptors.
    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no file is bound.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Lowest unbound file descriptor.
    fn find_free(&self) -> Option<Fd> {
        // Keys are ordered, so the first gap in the run starting at
        // FIRST_FILE is the answer.
        let mut candidate = Fd::FIRST_FILE.0;
        for fd in self.files.keys() {
            if fd.0 != candidate {
                break;
            }
            candidate += 1;
        }
        let fd = Fd(candidate);
        fd.is_file().then_some(fd)
    }
}
