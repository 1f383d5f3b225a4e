//! User Virtual Address Type
//!
//! Type-safe wrapper for addresses handed to the kernel by user code.
//! A `UserAddr` says nothing about validity on its own; only the address
//! validator decides whether one may be touched.

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Size of one machine word on the user stack (32-bit user ABI).
pub const WORD_SIZE: u32 = 4;

/// A user-space virtual address.
///
/// Kept separate from plain integers so that raw argument words cannot be
/// used as memory locations without passing through the validator.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct UserAddr(u32);

impl UserAddr {
    /// The null address.
    pub const NULL: Self = Self(0);

    /// Wrap a raw user word as an address.
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Add a byte offset, returning `None` on overflow of the 32-bit space.
    #[inline]
    pub const fn checked_add(self, offset: u32) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Address of the `index`-th word above this one.
    #[inline]
    pub const fn word(self, index: u32) -> Option<Self> {
        match index.checked_mul(WORD_SIZE) {
            Some(offset) => self.checked_add(offset),
            None => None,
        }
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#010x})", self.0)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
