//! Device interfaces used by the syscall layer
//!
//! The drivers themselves belong to the embedding kernel. These traits are
//! the narrow surface the trap boundary consumes:
//! - No driver state is kept here
//! - Callers pass validated, kernel-owned buffers only

pub mod console;
pub mod power;
