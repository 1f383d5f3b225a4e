//! System Call Input Validation
//!
//! Decides whether a user-supplied address may be touched, and copies data
//! across the boundary only after that decision.
//!
//! # Security Principles
//! - Validate ALL addresses before use
//! - Fail-secure: anything outside the user region is a fault
//! - Copy into kernel buffers so later user writes cannot change what the
//!   kernel already checked
//! - Null is below the user region and therefore always rejected

use alloc::string::String;
use alloc::vec::Vec;

use crate::mm::{UserAddr, UserFault, UserMemory, PAGE_SIZE, WORD_SIZE};

/// User address space layout.
pub mod regions {
    /// Start of user code; nothing below it belongs to the process.
    pub const USER_CODE_START: u32 = 0x0804_8000;
    /// Top of user address space (exclusive); the kernel lives above.
    pub const USER_TOP: u32 = 0xC000_0000;
}

/// Longest string accepted from user space, terminator included.
pub const MAX_USER_STRING: usize = PAGE_SIZE;

/// Most bytes moved between user memory and a device per step of a `read`
/// or `write`.
pub const MAX_IO_CHUNK: usize = PAGE_SIZE;

/// Range policy for user addresses.
///
/// A coarse check against fixed bounds, not a page-table walk. Whether a
/// valid address is actually mapped is left to the [`UserMemory`]
/// implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressValidator {
    low: u32,
    high: u32,
}

impl AddressValidator {
    /// Validator for the standard user layout.
    pub const fn new() -> Self {
        Self::with_bounds(regions::USER_CODE_START, regions::USER_TOP)
    }

    /// Validator for the half-open range `low..high`.
    pub const fn with_bounds(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Check a single address.
    #[inline]
    pub const fn is_valid(&self, addr: UserAddr) -> bool {
        !addr.is_null() && addr.as_u32() >= self.low && addr.as_u32() < self.high
    }

    /// Check a single address, faulting if it is invalid.
    #[inline]
    pub fn check(&self, addr: UserAddr) -> Result<UserAddr, UserFault> {
        if self.is_valid(addr) {
            Ok(addr)
        } else {
            Err(UserFault::at(addr))
        }
    }

    /// Check a buffer of `len` bytes starting at `addr`.
    ///
    /// The start is always checked, even for empty buffers. The last byte is
    /// checked when `len > 0`; the range is contiguous, so that covers the
    /// whole extent.
    pub fn check_range(&self, addr: UserAddr, len: u32) -> Result<UserAddr, UserFault> {
        self.check(addr)?;
        if len == 0 {
            return Ok(addr);
        }
        let last = addr.checked_add(len - 1).ok_or(UserFault::at(addr))?;
        self.check(last)?;
        Ok(addr)
    }
}

impl Default for AddressValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated access to the current process's memory.
#[derive(Clone, Copy)]
pub struct UserAccess<'a> {
    validator: AddressValidator,
    memory: &'a dyn UserMemory,
}

impl<'a> UserAccess<'a> {
    pub const fn new(validator: AddressValidator, memory: &'a dyn UserMemory) -> Self {
        Self { validator, memory }
    }

    #[inline]
    pub const fn validator(&self) -> &AddressValidator {
        &self.validator
    }

    /// Read one machine word.
    pub fn read_word(&self, addr: UserAddr) -> Result<u32, UserFault> {
        self.validator.check_range(addr, WORD_SIZE)?;
        let mut bytes = [0u8; WORD_SIZE as usize];
        self.memory.read(addr, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Fill `buf` from user memory at `addr`.
    pub fn copy_in(&self, addr: UserAddr, buf: &mut [u8]) -> Result<(), UserFault> {
        let len = u32::try_from(buf.len()).map_err(|_| UserFault::at(addr))?;
        self.validator.check_range(addr, len)?;
        if len > 0 {
            self.memory.read(addr, buf)?;
        }
        Ok(())
    }

    /// Copy `data` into user memory at `addr`.
    pub fn copy_out(&self, addr: UserAddr, data: &[u8]) -> Result<(), UserFault> {
        let len = u32::try_from(data.len()).map_err(|_| UserFault::at(addr))?;
        self.validator.check_range(addr, len)?;
        if len > 0 {
            self.memory.write(addr, data)?;
        }
        Ok(())
    }

    /// Store one byte.
    pub fn put_byte(&self, addr: UserAddr, byte: u8) -> Result<(), UserFault> {
        self.validator.check(addr)?;
        self.memory.write(addr, &[byte])
    }

    /// Read a NUL-terminated string.
    ///
    /// Every byte's address is validated before it is read. Returns
    /// `Ok(None)` for strings that are too long or not UTF-8; those are
    /// ordinary request failures, not faults.
    pub fn read_str(&self, addr: UserAddr) -> Result<Option<String>, UserFault> {
        let mut bytes = Vec::new();
        let mut cursor = addr;
        loop {
            self.validator.check(cursor)?;
            let mut byte = [0u8; 1];
            self.memory.read(cursor, &mut byte)?;
            if byte[0] == 0 {
                break;
            }
            bytes.push(byte[0]);
            if bytes.len() >= MAX_USER_STRING {
                return Ok(None);
            }
            cursor = cursor.checked_add(1).ok_or(UserFault::at(cursor))?;
        }
        Ok(String::from_utf8(bytes).ok())
    }
}
