//! # LockFreeCounter
//!
//! A shared counter that any number of contexts can bump at once without a
//! lock and without losing updates.
//!
//! Every update is a reserve / conditional-write retry loop:
//!
//! 1. reserve the word and read its value `v`,
//! 2. try to conditionally write `f(v)`,
//! 3. if another context wrote in between, go back to 1.
//!
//! Nobody ever waits on anybody else. A failed attempt means some other
//! context's write landed, so the system as a whole always makes progress.
//! A *single* context has no such guarantee: under continuous contention it
//! can keep losing the race (live-lock risk, not deadlock). Callers that need
//! bounded latency use [`LockFreeCounter::try_increment_for`] and treat
//! [`Contended`] as their timeout.
//!
//! ## Example
//! ```rust
//! use axiom_atomic::LockFreeCounter;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let counter = Arc::new(LockFreeCounter::new(0));
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let counter = Arc::clone(&counter);
//!         thread::spawn(move || {
//!             for _ in 0..1_000 {
//!                 counter.increment();
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(counter.get(), 4_000);
//! ```

use core::fmt;

use crate::error::Contended;
use crate::primitive::{AtomicPrimitive, WordValue};
use crate::sync::{maybe_const_fn, spin_loop};
use crate::{AtomicWord, BackOff};

/// Increments `counter` by one, retrying until the conditional write lands.
///
/// Linearizable: the increment takes effect at the instant of the successful
/// conditional write.
#[inline]
pub fn increment<P: AtomicPrimitive + ?Sized>(counter: &P) {
    increment_attempts(counter);
}

/// [`increment`], returning how many reserve / conditional-write attempts it
/// took. An uncontended increment takes exactly one.
#[inline]
pub fn increment_attempts<P: AtomicPrimitive + ?Sized>(counter: &P) -> u32 {
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let (value, token) = counter.reserve();
        if counter.conditional_write(token, value.wrapping_add(P::Value::ONE)) {
            return attempts;
        }
        spin_loop();
    }
}

/// A lock-free counter over one atomic word.
///
/// Generic over the [`AtomicPrimitive`] backend; defaults to the 32-bit
/// [`AtomicWord`]. Values wrap on overflow like the hardware add does.
pub struct LockFreeCounter<P = AtomicWord> {
    word: P,
}

impl LockFreeCounter<AtomicWord> {
    maybe_const_fn! {
        /// Creates a 32-bit counter starting at `value`.
        #[inline(always)]
        pub fn new(value: u32) -> Self {
            Self { word: AtomicWord::new(value) }
        }
    }
}

impl<P: AtomicPrimitive> LockFreeCounter<P> {
    /// Builds a counter over an existing word.
    #[inline(always)]
    pub const fn from_word(word: P) -> Self {
        Self { word }
    }

    /// Adds one. Retries without bound until it succeeds.
    #[inline]
    pub fn increment(&self) {
        increment(&self.word);
    }

    /// Adds one and reports how many attempts it took.
    #[inline]
    pub fn increment_attempts(&self) -> u32 {
        increment_attempts(&self.word)
    }

    /// Adds one, giving up after `max_attempts` failed conditional writes.
    ///
    /// Waits with an exponential [`BackOff`] between attempts. On success
    /// returns the number of attempts used.
    pub fn try_increment_for(&self, max_attempts: u32) -> Result<u32, Contended> {
        let backoff = BackOff::new();
        for attempt in 1..=max_attempts {
            let (value, token) = self.word.reserve();
            if self
                .word
                .conditional_write(token, value.wrapping_add(P::Value::ONE))
            {
                return Ok(attempt);
            }
            if attempt < max_attempts {
                backoff.wait();
            }
        }
        log::warn!("lock-free increment gave up after {} attempts", max_attempts);
        Err(Contended {
            attempts: max_attempts,
        })
    }

    /// Applies `f` atomically and returns the value it replaced.
    ///
    /// `f` may run more than once when the conditional write loses a race, so
    /// it must be a pure function of its argument.
    pub fn update<F>(&self, mut f: F) -> P::Value
    where
        F: FnMut(P::Value) -> P::Value,
    {
        loop {
            let (value, token) = self.word.reserve();
            if self.word.conditional_write(token, f(value)) {
                return value;
            }
            spin_loop();
        }
    }

    /// Adds `delta` (wrapping), returning the previous value.
    #[inline]
    pub fn add(&self, delta: P::Value) -> P::Value {
        self.update(|value| value.wrapping_add(delta))
    }

    /// Subtracts one (wrapping), returning the previous value.
    #[inline]
    pub fn decrement(&self) -> P::Value {
        self.update(|value| value.wrapping_sub(P::Value::ONE))
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> P::Value {
        self.word.load()
    }

    /// The backing word.
    #[inline]
    pub fn word(&self) -> &P {
        &self.word
    }

    /// Consumes the counter, returning the backing word.
    #[inline]
    pub fn into_word(self) -> P {
        self.word
    }
}

impl<P: AtomicPrimitive + Default> Default for LockFreeCounter<P> {
    fn default() -> Self {
        Self::from_word(P::default())
    }
}

impl<P: AtomicPrimitive> fmt::Debug for LockFreeCounter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LockFreeCounter").field(&self.get()).finish()
    }
}
