//! Argument Marshalling
//!
//! Pulls the fixed-arity argument words of a request off the user stack.
//! Word 0 at the stack pointer is the request code; arguments follow at
//! words 1..=N.

use crate::mm::{UserAddr, UserFault};

use super::validate::UserAccess;

/// Read the `N` argument words above the request code at `sp`.
///
/// Each word's address is validated before it is read; the first bad one
/// aborts the extraction. Pointer-valued words are returned as-is and are not
/// dereferenced here.
pub fn extract<const N: usize>(user: &UserAccess<'_>, sp: UserAddr) -> Result<[u32; N], UserFault> {
    let mut args = [0u32; N];
    for (i, arg) in args.iter_mut().enumerate() {
        let addr = sp.word(i as u32 + 1).ok_or(UserFault::at(sp))?;
        *arg = user.read_word(addr)?;
    }
    Ok(args)
}
