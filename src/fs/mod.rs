//! Filesystem Access
//!
//! The filesystem itself lives outside this crate. The core only forwards
//! requests to it, always through the [`FileLock`] serializer.

mod lock;

pub use lock::FileLock;

/// Opaque handle to a file opened by the filesystem.
///
/// The filesystem owns the underlying object; descriptor tables only hold
/// this token until the matching [`FileSystem::close`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct FileHandle(usize);

impl FileHandle {
    /// Wrap a filesystem-assigned token.
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Get the filesystem-assigned token.
    #[inline]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

/// Filesystem operations consumed by the syscall layer.
///
/// Implementations are not assumed to be safe under concurrent use; every
/// call made by this crate happens while holding the [`FileLock`].
pub trait FileSystem {
    /// Create a file of `initial_size` bytes.
    fn create(&self, name: &str, initial_size: u32) -> bool;

    /// Remove a file by name.
    fn remove(&self, name: &str) -> bool;

    /// Open a file, returning a fresh handle.
    fn open(&self, name: &str) -> Option<FileHandle>;

    /// Close a handle returned by [`FileSystem::open`].
    fn close(&self, file: FileHandle);

    /// Read at the current position; returns the number of bytes read.
    fn read(&self, file: FileHandle, buf: &mut [u8]) -> usize;

    /// Write at the current position; returns the number of bytes written.
    fn write(&self, file: FileHandle, data: &[u8]) -> usize;

    /// Move the current position to `position`.
    fn seek(&self, file: FileHandle, position: u32);

    /// Current position.
    fn tell(&self, file: FileHandle) -> u32;

    /// File length in bytes.
    fn length(&self, file: FileHandle) -> u32;
}
