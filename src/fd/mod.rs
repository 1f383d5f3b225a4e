//! Per-Process Descriptors
//!
//! Maps the small integers user code passes around to filesystem handles.
//!
//! # Properties
//! - Descriptor numbers are process-local
//! - A bound descriptor always names a handle that is still open
//! - Console descriptors 0 and 1 are routed by the syscall layer, not stored

mod table;

pub use table::{Fd, FdError, FdTable, MAX_OPEN_FILES};
