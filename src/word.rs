//! # AtomicWord
//!
//! Fixed-width words that implement [`AtomicPrimitive`] on top of the
//! target's native atomics.
//!
//! - [`AtomicWord`]: 32-bit, the width used by locks and counters by default.
//! - [`AtomicWord64`]: 64-bit, for counters that must not wrap. Only on
//!   targets with 64-bit atomics.
//!
//! A conditional write is refused after *any* write to the word since its
//! reservation: another context's or the caller's own, through any
//! operation, including one that wrote back the value that was reserved.
//! Where the hardware has no reservation of its own the word carries a write
//! counter next to the value, so it can be wider than its integer.
//!
//! ## Memory ordering
//! - `load` and reservations use `Acquire`.
//! - `store` uses `Release` (or `AcqRel` where it is emulated).
//! - Fetch-and-modify operations and a successful conditional write use
//!   `AcqRel`, so they both publish and observe.
//!
//! Every operation on one word takes part in that word's single modification
//! order, which all contexts observe identically.

use core::fmt;

use crate::primitive::{AtomicPrimitive, Reservation};
use crate::sync::maybe_const_fn;

macro_rules! impl_atomic_word {
    (
        $(#[$attr:meta])*
        $name:ident($cell:ty, $value:ty)
    ) => {
        $(#[$attr])*
        pub struct $name {
            cell: $cell,
        }

        impl $name {
            maybe_const_fn! {
                /// Creates a new word holding `value`.
                #[inline(always)]
                pub fn new(value: $value) -> Self {
                    Self { cell: <$cell>::new(value) }
                }
            }

            /// Consumes the word and returns the value it holds.
            #[inline]
            pub fn into_inner(self) -> $value {
                self.cell.load()
            }
        }

        impl AtomicPrimitive for $name {
            type Value = $value;

            #[inline(always)]
            fn load(&self) -> $value {
                self.cell.load()
            }

            #[inline(always)]
            fn store(&self, value: $value) {
                self.cell.store(value)
            }

            #[inline(always)]
            fn add(&self, delta: $value) -> $value {
                self.cell.add(delta)
            }

            #[inline(always)]
            fn swap(&self, value: $value) -> $value {
                self.cell.swap(value)
            }

            #[inline(always)]
            fn and(&self, mask: $value) -> $value {
                self.cell.and(mask)
            }

            #[inline(always)]
            fn or(&self, mask: $value) -> $value {
                self.cell.or(mask)
            }

            #[inline(always)]
            fn reserve(&self) -> ($value, Reservation<$value>) {
                let (value, stamp) = self.cell.reserve();
                (value, Reservation::with_stamp(self, value, stamp))
            }

            #[inline(always)]
            fn conditional_write(&self, token: Reservation<$value>, value: $value) -> bool {
                if !token.is_for(self) {
                    return false;
                }
                self.cell.commit(token.stamp(), value)
            }
        }

        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self::new(0)
            }
        }

        impl From<$value> for $name {
            #[inline]
            fn from(value: $value) -> Self {
                Self::new(value)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.load()).finish()
            }
        }
    };
}

impl_atomic_word! {
    /// A 32-bit word mutable only through atomic operations.
    ///
    /// # Example
    /// ```
    /// use axiom_atomic::{AtomicPrimitive, AtomicWord};
    ///
    /// let word = AtomicWord::new(41);
    /// let (seen, token) = word.reserve();
    /// assert!(word.conditional_write(token, seen + 1));
    /// assert_eq!(word.load(), 42);
    /// ```
    AtomicWord(crate::arch::Word32, u32)
}

#[cfg(target_has_atomic = "64")]
impl_atomic_word! {
    /// A 64-bit word mutable only through atomic operations.
    AtomicWord64(crate::arch::Word64, u64)
}
