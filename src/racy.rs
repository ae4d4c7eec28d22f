//! # Racy fixtures
//!
//! Deliberately broken counterparts of [`LockFreeCounter`] and
//! [`RawSpinLock`]. **Do not use them for synchronization.** They exist so the
//! test harnesses can prove they are able to catch the lost updates and
//! double acquisitions the real primitives rule out.
//!
//! - [`RacyCounter`] increments with a separate read and write.
//! - [`RacyLock`] acquires with check-then-set.
//!
//! Both use relaxed atomic loads and stores rather than plain memory access,
//! so the races are *logical* (lost updates) and never undefined behavior.
//! Each exposes its read and its write as separate steps, letting a test
//! script an interleaving deterministically instead of hoping the scheduler
//! produces one.
//!
//! ```rust
//! use axiom_atomic::racy::RacyCounter;
//!
//! let counter = RacyCounter::new(0);
//!
//! // Two contexts read before either writes back.
//! let a = counter.read();
//! let b = counter.read();
//! a.write_back();
//! b.write_back();
//!
//! assert_eq!(counter.get(), 1, "one of the two increments was lost");
//! ```
//!
//! [`LockFreeCounter`]: crate::LockFreeCounter
//! [`RawSpinLock`]: crate::RawSpinLock

use crate::sync::{maybe_const_fn, spin_loop, AtomicU32, Ordering::Relaxed};

/// A counter incremented by read, modify, write as three separate steps.
#[derive(Debug)]
pub struct RacyCounter {
    value: AtomicU32,
}

/// The read half of a [`RacyCounter`] increment, still to be written back.
#[derive(Debug)]
#[must_use = "an increment only lands once written back"]
pub struct PendingIncrement<'a> {
    counter: &'a RacyCounter,
    seen: u32,
}

impl RacyCounter {
    maybe_const_fn! {
        /// Creates a counter starting at `value`.
        pub fn new(value: u32) -> Self {
            Self { value: AtomicU32::new(value) }
        }
    }

    /// Reads the current value: the first half of an increment.
    #[inline]
    pub fn read(&self) -> PendingIncrement<'_> {
        PendingIncrement {
            counter: self,
            seen: self.value.load(Relaxed),
        }
    }

    /// Read, add one, write. Loses updates under concurrency.
    #[inline]
    pub fn increment(&self) {
        self.read().write_back();
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> u32 {
        self.value.load(Relaxed)
    }
}

impl PendingIncrement<'_> {
    /// The value read.
    pub fn seen(&self) -> u32 {
        self.seen
    }

    /// Stores `seen + 1`, overwriting whatever landed since the read.
    #[inline]
    pub fn write_back(self) {
        self.counter.value.store(self.seen.wrapping_add(1), Relaxed);
    }
}

const FREE: u32 = 0;
const HELD: u32 = 1;

/// A lock acquired by waiting for `free`, then storing `held`.
///
/// Two contexts can both see `free` before either stores `held`, and both
/// walk into the critical section.
#[derive(Debug)]
pub struct RacyLock {
    state: AtomicU32,
}

impl RacyLock {
    maybe_const_fn! {
        /// Creates a free lock.
        pub fn new() -> Self {
            Self { state: AtomicU32::new(FREE) }
        }
    }

    /// The check half of an acquisition: whether the lock looks free.
    #[inline]
    pub fn looks_free(&self) -> bool {
        self.state.load(Relaxed) == FREE
    }

    /// The set half of an acquisition: claims the lock without re-checking.
    #[inline]
    pub fn claim(&self) {
        self.state.store(HELD, Relaxed);
    }

    /// Spins until the lock looks free, then claims it.
    pub fn lock(&self) {
        while !self.looks_free() {
            spin_loop();
        }
        self.claim();
    }

    /// Stores `free`.
    #[inline]
    pub fn unlock(&self) {
        self.state.store(FREE, Relaxed);
    }
}

impl Default for RacyLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn scripted_interleaving_loses_an_increment() {
        let counter = RacyCounter::new(5);

        let a = counter.read();
        let b = counter.read();
        assert_eq!(a.seen(), b.seen());
        a.write_back();
        b.write_back();

        assert_eq!(counter.get(), 6, "expected 7 without the race");
    }

    #[test]
    fn scripted_interleaving_double_acquires() {
        let lock = RacyLock::new();

        let a_sees_free = lock.looks_free();
        let b_sees_free = lock.looks_free();
        assert!(a_sees_free && b_sees_free);
        lock.claim();
        lock.claim();
        // Both contexts now believe they hold the lock.
    }

    #[test]
    fn serial_use_is_correct() {
        let counter = RacyCounter::new(0);
        for _ in 0..100 {
            counter.increment();
        }
        assert_eq!(counter.get(), 100);

        let lock = RacyLock::default();
        lock.lock();
        assert!(!lock.looks_free());
        lock.unlock();
        assert!(lock.looks_free());
    }

    /// The same shape of harness the real counter passes; with a yield
    /// injected between read and write it must catch at least one loss.
    #[test]
    fn concurrent_harness_detects_lost_updates() {
        const CONTEXTS: u32 = 4;
        const PER_CONTEXT: u32 = 2_000;

        let lost_any = (0..20).any(|_| {
            let counter = Arc::new(RacyCounter::new(0));
            let handles: Vec<_> = (0..CONTEXTS)
                .map(|_| {
                    let counter = Arc::clone(&counter);
                    thread::spawn(move || {
                        for _ in 0..PER_CONTEXT {
                            let pending = counter.read();
                            thread::yield_now();
                            pending.write_back();
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            counter.get() < CONTEXTS * PER_CONTEXT
        });

        assert!(lost_any, "harness never observed a lost update");
    }

    /// Same harness as the spinlock's exclusivity test; a yield between
    /// check and set lets two contexts in at once.
    #[test]
    fn concurrent_harness_detects_double_acquire() {
        let overlapped = (0..20).any(|_| {
            let lock = Arc::new(RacyLock::new());
            let inside = Arc::new(AtomicUsize::new(0));
            let overlap = Arc::new(AtomicBool::new(false));

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let (lock, inside, overlap) =
                        (Arc::clone(&lock), Arc::clone(&inside), Arc::clone(&overlap));
                    thread::spawn(move || {
                        for _ in 0..500 {
                            while !lock.looks_free() {
                                thread::yield_now();
                            }
                            thread::yield_now();
                            lock.claim();

                            if inside.fetch_add(1, SeqCst) != 0 {
                                overlap.store(true, SeqCst);
                            }
                            thread::yield_now();
                            inside.fetch_sub(1, SeqCst);

                            lock.unlock();
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            overlap.load(SeqCst)
        });

        assert!(overlapped, "harness never observed two holders at once");
    }
}
