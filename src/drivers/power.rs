//! Machine Power Control

/// Power controller used by the `halt` syscall.
pub trait Power {
    /// Switch the machine off. Never returns.
    fn power_off(&self) -> !;
}
