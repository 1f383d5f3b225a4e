//! User address space access
//!
//! Provides:
//! - The `UserAddr` newtype for addresses supplied by user code
//! - The `UserMemory` seam through which user bytes are copied
//!
//! # Security Principles
//! - Raw words from user stacks never become pointers
//! - Every access is preceded by a range check in `syscall::validate`

mod address;
mod user;

pub use address::{UserAddr, PAGE_SIZE, WORD_SIZE};
pub use user::{UserFault, UserMemory};
