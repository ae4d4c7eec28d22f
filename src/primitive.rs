//! # Atomic primitives
//!
//! The capability interface every synchronization construct in this crate is
//! written against. A backend provides six indivisible operations on a single
//! machine word:
//!
//! | Operation                                           | Returns                       |
//! | --------------------------------------------------- | ----------------------------- |
//! | [`add`](AtomicPrimitive::add)                       | value before the add          |
//! | [`swap`](AtomicPrimitive::swap)                     | value before the swap         |
//! | [`and`](AtomicPrimitive::and) / [`or`](AtomicPrimitive::or) | value before the update |
//! | [`reserve`](AtomicPrimitive::reserve)               | current value + [`Reservation`] |
//! | [`conditional_write`](AtomicPrimitive::conditional_write) | whether the write landed |
//!
//! plus plain atomic [`load`](AtomicPrimitive::load) and
//! [`store`](AtomicPrimitive::store). None of them block or retry on the
//! caller's behalf: with native reservations each one is a single hardware
//! access, and an emulated backend only repeats an internal step when another
//! write to the same word landed in the middle of it. Retrying a refused
//! conditional write is always the caller's business, see
//! [`LockFreeCounter`](crate::LockFreeCounter) and
//! [`RawSpinLock`](crate::RawSpinLock).
//!
//! All operations on the same word are totally ordered, and every context
//! observes that order identically.
//!
//! ## Example
//! ```rust
//! use axiom_atomic::{atomic_add, atomic_and, atomic_or, atomic_swap, AtomicPrimitive, AtomicWord};
//!
//! let word = AtomicWord::new(0);
//! assert_eq!(atomic_add(&word, 5), 0);
//! assert_eq!(atomic_swap(&word, 100), 5);
//! assert_eq!(atomic_and(&word, 0xFF), 100);
//! assert_eq!(atomic_or(&word, 0x8000_0000), 100);
//! assert_eq!(word.load(), 0x8000_0064);
//! ```

use core::fmt;
use core::marker::PhantomData;

/// Unsigned integer that can live in an [`AtomicPrimitive`].
pub trait WordValue: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// All bits clear. Doubles as the `free` state of a spinlock.
    const ZERO: Self;
    /// The unit increment. Doubles as the `held` state of a spinlock.
    const ONE: Self;

    /// Modular addition, matching what the hardware add does on overflow.
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Modular subtraction.
    fn wrapping_sub(self, rhs: Self) -> Self;
}

macro_rules! impl_word_value {
    ($($ty:ty),*) => {
        $(
            impl WordValue for $ty {
                const ZERO: Self = 0;
                const ONE: Self = 1;

                #[inline(always)]
                fn wrapping_add(self, rhs: Self) -> Self {
                    <$ty>::wrapping_add(self, rhs)
                }

                #[inline(always)]
                fn wrapping_sub(self, rhs: Self) -> Self {
                    <$ty>::wrapping_sub(self, rhs)
                }
            }
        )*
    };
}

impl_word_value!(u32, u64);

/// Proof that the calling context reserved a word.
///
/// Produced by [`AtomicPrimitive::reserve`] and consumed by exactly one
/// [`AtomicPrimitive::conditional_write`] on the same word. It is neither
/// `Clone` nor `Send`: a reservation belongs to the context that took it and
/// can be spent once.
#[must_use = "a reservation does nothing unless passed to `conditional_write`"]
pub struct Reservation<V> {
    observed: V,
    stamp: u64,
    origin: usize,
    _local: PhantomData<*const ()>,
}

impl<V: WordValue> Reservation<V> {
    /// Creates a reservation of `origin` that observed `observed`.
    ///
    /// Meant for [`AtomicPrimitive`] implementations; handing a forged
    /// reservation to a backend can at worst make its conditional write fail.
    #[inline(always)]
    pub fn new<P: ?Sized>(origin: &P, observed: V) -> Self {
        Self::with_stamp(origin, observed, 0)
    }

    /// Like [`new`](Self::new), also recording a backend-defined `stamp`,
    /// e.g. the write generation the value was read under.
    #[inline(always)]
    pub fn with_stamp<P: ?Sized>(origin: &P, observed: V, stamp: u64) -> Self {
        Self {
            observed,
            stamp,
            origin: origin as *const P as *const () as usize,
            _local: PhantomData,
        }
    }

    /// The value read when the reservation was taken.
    #[inline(always)]
    pub fn observed(&self) -> V {
        self.observed
    }

    /// The stamp recorded by [`with_stamp`](Self::with_stamp), zero otherwise.
    #[inline(always)]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Whether this reservation was taken on `word`.
    #[inline(always)]
    pub fn is_for<P: ?Sized>(&self, word: &P) -> bool {
        self.origin == word as *const P as *const () as usize
    }
}

impl<V: fmt::Debug> fmt::Debug for Reservation<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("observed", &self.observed)
            .field("stamp", &self.stamp)
            .field("origin", &format_args!("{:#x}", self.origin))
            .finish()
    }
}

/// Hardware-atomic operations on one word.
///
/// Implemented per target by [`AtomicWord`](crate::AtomicWord) and
/// [`AtomicWord64`](crate::AtomicWord64). Ordinary non-atomic access to the
/// same memory is outside the contract.
pub trait AtomicPrimitive: Send + Sync {
    /// The integer stored in the word.
    type Value: WordValue;

    /// Reads the current value.
    fn load(&self) -> Self::Value;

    /// Unconditionally replaces the value.
    fn store(&self, value: Self::Value);

    /// Adds `delta` (wrapping), returning the previous value.
    fn add(&self, delta: Self::Value) -> Self::Value;

    /// Replaces the value with `value`, returning the previous value.
    fn swap(&self, value: Self::Value) -> Self::Value;

    /// Bitwise-ANDs `mask` into the value, returning the previous value.
    fn and(&self, mask: Self::Value) -> Self::Value;

    /// Bitwise-ORs `mask` into the value, returning the previous value.
    fn or(&self, mask: Self::Value) -> Self::Value;

    /// Reads the current value and reserves the word for the caller.
    fn reserve(&self) -> (Self::Value, Reservation<Self::Value>);

    /// Commits `value` if no write of any kind reached this word since `token`
    /// was taken, even one that left the value as it was. Returns `false` and
    /// leaves the word untouched otherwise, or if `token` was taken on a
    /// different word. May also fail spuriously on hardware reservations.
    fn conditional_write(&self, token: Reservation<Self::Value>, value: Self::Value) -> bool;
}

/// Atomically adds `delta` to `loc` and returns the value before the add.
#[inline]
pub fn atomic_add<P: AtomicPrimitive + ?Sized>(loc: &P, delta: P::Value) -> P::Value {
    loc.add(delta)
}

/// Atomically replaces the value of `loc` and returns the previous one.
#[inline]
pub fn atomic_swap<P: AtomicPrimitive + ?Sized>(loc: &P, value: P::Value) -> P::Value {
    loc.swap(value)
}

/// Atomically ANDs `mask` into `loc` and returns the previous value.
#[inline]
pub fn atomic_and<P: AtomicPrimitive + ?Sized>(loc: &P, mask: P::Value) -> P::Value {
    loc.and(mask)
}

/// Atomically ORs `mask` into `loc` and returns the previous value.
#[inline]
pub fn atomic_or<P: AtomicPrimitive + ?Sized>(loc: &P, mask: P::Value) -> P::Value {
    loc.or(mask)
}

/// Reads `loc` and reserves it for the calling context.
#[inline]
pub fn reserve<P: AtomicPrimitive + ?Sized>(loc: &P) -> (P::Value, Reservation<P::Value>) {
    loc.reserve()
}

/// Attempts to commit `value` to `loc` under `token`.
#[inline]
pub fn conditional_write<P: AtomicPrimitive + ?Sized>(
    loc: &P,
    token: Reservation<P::Value>,
    value: P::Value,
) -> bool {
    loc.conditional_write(token, value)
}
