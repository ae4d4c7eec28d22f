//! # axiom-atomic 🌀
//!
//! A lightweight, **`no_std`-compatible** set of hardware-atomic building
//! blocks and the two classic constructs built directly on them, for
//! shared-memory multiprocessors (multi-core or multi-hart).
//!
//! - [`AtomicPrimitive`]: the capability interface, i.e. atomic add, swap,
//!   AND, OR, plus the reserve / conditional-write pair.
//! - [`AtomicWord`] / [`AtomicWord64`]: the native backends.
//! - [`LockFreeCounter`]: increments from any number of contexts, no lock, no
//!   lost updates.
//! - [`RawSpinLock`] / [`SpinLock<T>`]: busy-polling mutual exclusion.
//! - [`BackOff`]: exponential backoff for the bounded `try_*_for` variants.
//!
//! ## ✨ Features
//!
//! - ✅ `no_std` compatible (uses `core` only)
//! - ⚙️ `std` (default): `std::error::Error` for [`Contended`], and lets
//!   [`BackOff`] yield the thread after prolonged contention
//! - 🧪 `loom`: runs every atomic through loom's model checker
//! - 🔒 [`lock_api::RawMutex`] integration via [`SpinMutex`]
//!
//! ## 🚀 Quick Example
//!
//! ```rust
//! use axiom_atomic::{LockFreeCounter, SpinLock};
//!
//! let hits = LockFreeCounter::new(0);
//! hits.increment();
//! assert_eq!(hits.get(), 1);
//!
//! let log = SpinLock::new(Vec::new());
//! log.lock().push("critical section");
//! assert_eq!(log.lock().len(), 1);
//! ```
//!
//! ## 🧠 Design
//!
//! Every construct is written against [`AtomicPrimitive`], never against a
//! particular instruction set. [`AtomicWord`] maps the fetch-and-modify
//! operations to `core` atomics and the reservation pair to `lr`/`sc` on
//! RISC-V with the `A` extension. Elsewhere it keeps a write generation next
//! to the value, so a conditional write is refused after any intervening
//! write, even one that restored the reserved value.
//!
//! Nothing here blocks or sleeps. [`LockFreeCounter::increment`] and
//! [`RawSpinLock::acquire`] spin until they succeed; nothing in the crate
//! times them out. Callers that need a bound use the `try_*_for` variants,
//! which give up with [`Contended`].
//!
//! ## ⚠️ Safety & Usage Notes
//!
//! - The spinlock is **not fair** and **not reentrant**.
//! - Releasing a lock you do not hold is undefined behavior, hence
//!   [`RawSpinLock::release`] is `unsafe`.
//! - A contended counter can live-lock a single unlucky context; the system
//!   as a whole always progresses.
//! - [`racy`] holds intentionally broken fixtures for tests. Never use them
//!   to synchronize.
//!
//! ## 📦 Modules
//!
//! - [`primitive`]: the capability trait and its free-function API.
//! - [`word`]: native atomic words.
//! - [`counter`]: lock-free counter.
//! - [`spinlock`]: spinlocks.
//! - [`backoff`]: exponential backoff.
//! - [`error`]: the bounded-retry error.
//! - [`racy`]: negative-control fixtures.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(unsafe_op_in_unsafe_fn)]

pub(crate) mod sync;

mod arch;
pub mod backoff;
pub mod counter;
pub mod error;
pub mod primitive;
pub mod racy;
pub mod spinlock;
pub mod word;

#[cfg(all(test, not(feature = "loom")))]
mod testing;


pub use backoff::{BackOff, BackOffConfig};
pub use counter::{increment, LockFreeCounter};
pub use error::Contended;
pub use primitive::{
    atomic_add, atomic_and, atomic_or, atomic_swap, conditional_write, reserve, AtomicPrimitive,
    Reservation, WordValue,
};
pub use spinlock::{acquire, acquire_by_swap, release, RawSpinLock, SpinGuard, SpinLock};
#[cfg(not(feature = "loom"))]
pub use spinlock::{SpinMutex, SpinMutexGuard};
pub use word::AtomicWord;
#[cfg(target_has_atomic = "64")]
pub use word::AtomicWord64;
