//! Atomic types and spin hints that work under both `core` and `loom`.
//!
//! Every other module imports its atomics from here, so building with the
//! `loom` feature puts the whole crate under loom's model checker without
//! touching the algorithms themselves.

#[cfg(not(feature = "loom"))]
pub(crate) use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(all(not(feature = "loom"), target_has_atomic = "64"))]
pub(crate) use core::sync::atomic::AtomicU64;

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Busy-wait hint issued once per failed attempt.
///
/// Under loom this yields instead, otherwise the model checker would explore
/// an unbounded spin forever.
#[inline(always)]
pub(crate) fn spin_loop() {
    #[cfg(not(feature = "loom"))]
    core::hint::spin_loop();

    #[cfg(feature = "loom")]
    loom::thread::yield_now();
}

/// Gives the rest of the time slice away. Only reachable through [`BackOff`].
///
/// [`BackOff`]: crate::BackOff
#[cfg(feature = "std")]
#[inline]
pub(crate) fn yield_now() {
    #[cfg(not(feature = "loom"))]
    std::thread::yield_now();

    #[cfg(feature = "loom")]
    loom::thread::yield_now();
}

/// Declares a constructor that is `const` everywhere except under loom, whose
/// atomics cannot be built in a const context.
macro_rules! maybe_const_fn {
    (
        $(#[$attr:meta])*
        $vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty $body:block
    ) => {
        #[cfg(not(feature = "loom"))]
        $(#[$attr])*
        $vis const fn $name($($arg: $ty),*) -> $ret $body

        #[cfg(feature = "loom")]
        $(#[$attr])*
        $vis fn $name($($arg: $ty),*) -> $ret $body
    };
}

pub(crate) use maybe_const_fn;
