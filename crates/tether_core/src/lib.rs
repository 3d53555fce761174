//! Tether Core
//!
//! Types shared across the host boundary:
//! - Per-frame input and draw records (`#[repr(C)]`, copied wholesale)
//! - Monotonic frame clock
//! - The fatal-termination policy every entry point funnels through

pub mod fatal;
pub mod frame;
pub mod time;

pub use glam;

/// Bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
