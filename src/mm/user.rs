//! User Memory Access
//!
//! The kernel never dereferences a user address directly. It copies bytes in
//! and out through a [`UserMemory`] implementation provided by the memory
//! subsystem, and only after the address validator has approved the range.

use super::address::UserAddr;

/// A fatal fault caused by a user-supplied address.
///
/// Never reported to user code: the faulting process is terminated with
/// status -1 instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserFault {
    /// The address that failed validation or could not be accessed.
    pub addr: UserAddr,
}

impl UserFault {
    /// Fault at the given address.
    #[inline]
    pub const fn at(addr: UserAddr) -> Self {
        Self { addr }
    }
}

impl core::fmt::Display for UserFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "bad user address {}", self.addr)
    }
}

/// Byte-level access to the current process's address space.
///
/// Implementations may perform a real page-table walk and report unmapped
/// pages as a [`UserFault`]; the core treats that exactly like a failed
/// range check.
pub trait UserMemory {
    /// Copy `buf.len()` bytes starting at `addr` into `buf`.
    fn read(&self, addr: UserAddr, buf: &mut [u8]) -> Result<(), UserFault>;

    /// Copy `data` into user memory starting at `addr`.
    fn write(&self, addr: UserAddr, data: &[u8]) -> Result<(), UserFault>;
}
