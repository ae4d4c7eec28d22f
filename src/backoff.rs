//! # BackOff
//!
//! Exponential backoff for the *bounded* retry variants of this crate
//! ([`LockFreeCounter::try_increment_for`], [`RawSpinLock::try_acquire_for`],
//! [`SpinLock::try_lock_for`]).
//!
//! The unbounded operations (`increment`, `acquire`) never use it: they issue a
//! single [`core::hint::spin_loop`] per failed attempt and keep polling. A
//! backoff changes *when* a context retries, which is a tuning decision the
//! caller opts into together with a retry ceiling.
//!
//! ## Behavior
//! - Each [`BackOff::wait`] spins for the current step count, then doubles it
//!   up to [`BackOffConfig::max`].
//! - With the `std` feature, once a step exceeds
//!   [`BackOffConfig::yield_threshold`] the thread also yields to the OS
//!   scheduler. This is the one place the crate stops being a pure busy-wait;
//!   pass a config with `yield_threshold: None` to keep spinning only.
//! - [`BackOff::relax`] halves the step, [`BackOff::reset`] restarts it.
//!
//! ## Example
//! ```rust
//! use axiom_atomic::{BackOff, BackOffConfig};
//!
//! const QUIET: BackOffConfig = BackOffConfig::new().start(4).max(256).no_yield();
//!
//! let backoff = BackOff::with_config(QUIET);
//! for _ in 0..10 {
//!     backoff.wait();
//! }
//! assert_eq!(backoff.current(), 256);
//! ```
//!
//! [`LockFreeCounter::try_increment_for`]: crate::LockFreeCounter::try_increment_for
//! [`RawSpinLock::try_acquire_for`]: crate::RawSpinLock::try_acquire_for
//! [`SpinLock::try_lock_for`]: crate::SpinLock::try_lock_for

use core::cell::Cell;

use crate::sync::spin_loop;

/// Step count a fresh [`BackOff`] starts from.
const START_VALUE: u32 = 1 << 5;

/// Upper bound for a single step.
const MAX_SPIN: u32 = 1 << 22;

/// Step size past which a `std` build starts yielding.
const YIELD_THRESHOLD: u32 = 1 << 10;

/// Tuning knobs for [`BackOff`].
///
/// Built with const setters so a tuned config can live in a `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackOffConfig {
    /// Spin iterations of the first step. Clamped to at least one.
    pub start: u32,
    /// Largest step the doubling may reach.
    pub max: u32,
    /// Step size past which the thread yields (`std` only). `None` never yields.
    pub yield_threshold: Option<u32>,
}

impl BackOffConfig {
    /// The default tuning: start at 32 spins, cap at 4M, yield past 1024.
    pub const fn new() -> Self {
        Self {
            start: START_VALUE,
            max: MAX_SPIN,
            yield_threshold: Some(YIELD_THRESHOLD),
        }
    }

    /// Sets the first step.
    pub const fn start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    /// Sets the step cap.
    pub const fn max(mut self, max: u32) -> Self {
        self.max = max;
        self
    }

    /// Sets the yield threshold.
    pub const fn yield_after(mut self, threshold: u32) -> Self {
        self.yield_threshold = Some(threshold);
        self
    }

    /// Never yield; spin only.
    pub const fn no_yield(mut self) -> Self {
        self.yield_threshold = None;
        self
    }

    const fn first_step(&self) -> u32 {
        let start = if self.start == 0 { 1 } else { self.start };
        if start > self.max && self.max > 0 {
            self.max
        } else {
            start
        }
    }
}

impl Default for BackOffConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponential backoff state for one waiting context.
///
/// Not `Sync`: each context keeps its own on the stack.
#[derive(Debug)]
pub struct BackOff {
    step: Cell<u32>,
    config: BackOffConfig,
}

impl BackOff {
    /// Creates a backoff with [`BackOffConfig::new`].
    #[inline(always)]
    pub const fn new() -> Self {
        Self::with_config(BackOffConfig::new())
    }

    /// Creates a backoff with custom tuning.
    #[inline(always)]
    pub const fn with_config(config: BackOffConfig) -> Self {
        Self {
            step: Cell::new(config.first_step()),
            config,
        }
    }

    /// Busy-waits for the current step, then doubles it.
    #[inline]
    pub fn wait(&self) {
        let end = self.step.get();

        for _ in 0..end {
            spin_loop();
        }

        self.step.set(end.saturating_mul(2).min(self.config.max.max(1)));

        #[cfg(feature = "std")]
        if let Some(threshold) = self.config.yield_threshold {
            if end > threshold {
                log::trace!("backoff step {} past {}, yielding", end, threshold);
                crate::sync::yield_now();
            }
        }
    }

    /// Halves the step, never below one spin.
    #[inline(always)]
    pub fn relax(&self) {
        self.step.set((self.step.get() >> 1).max(1));
    }

    /// Current step in spin iterations.
    #[inline(always)]
    pub fn current(&self) -> u32 {
        self.step.get()
    }

    /// Restarts from the configured first step.
    #[inline(always)]
    pub fn reset(&self) {
        self.step.set(self.config.first_step());
    }

    /// The tuning this backoff runs with.
    #[inline(always)]
    pub fn config(&self) -> BackOffConfig {
        self.config
    }
}

impl Default for BackOff {
    fn default() -> Self {
        Self::new()
    }
}
