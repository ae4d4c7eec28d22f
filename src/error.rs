//! Errors surfaced by the bounded retry variants.
//!
//! The core operations never fail: contention is retried internally. Only a
//! caller that asks for a retry ceiling can see [`Contended`].

use core::fmt;

/// A bounded operation gave up after its retry ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contended {
    /// Attempts made before giving up.
    pub attempts: u32,
}

impl fmt::Display for Contended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "still contended after {} attempts", self.attempts)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Contended {}
