//! File I/O Serializer
//!
//! One lock, created at boot and shared by reference with every syscall
//! context, that totally orders calls into the filesystem. A critical section
//! covers one syscall's filesystem work: a single call, or every chunk of one
//! `read` or `write`.

use spin::Mutex;

/// The filesystem serializer.
pub struct FileLock {
    inner: Mutex<()>,
}

impl FileLock {
    /// Create the serializer. One instance per kernel.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// Run `call` with the lock held.
    #[inline]
    pub fn serialize<R>(&self, call: impl FnOnce() -> R) -> R {
        let _guard = self.inner.lock();
        call()
    }

    /// Check whether some context is inside the filesystem right now.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.inner.is_locked()
    }
}

impl Default for FileLock {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FileLock(held={})", self.is_held())
    }
}
