//! 32-bit word stored in the low half of an `AtomicU64` whose high half is a
//! write generation.
//!
//! Every write moves the generation forward, and a reservation remembers the
//! whole 64-bit pair. The conditional write is one compare-exchange on that
//! pair, so it lands only if nothing was written since, whatever the value.
//!
//! `add` is a single `fetch_add` that bumps the generation and the value
//! together (a carry out of the value bumps the generation once more). `swap`,
//! `and`, `or` and `store` have no single instruction that also moves the
//! generation; they are a compare-exchange that is retried only when another
//! write landed in between.

use crate::sync::{maybe_const_fn, AtomicU64, Ordering};

const LOAD: Ordering = Ordering::Acquire;
const RMW: Ordering = Ordering::AcqRel;

const VALUE_MASK: u64 = 0xFFFF_FFFF;
const ONE_GENERATION: u64 = 1 << 32;

#[inline(always)]
fn value_of(packed: u64) -> u32 {
    packed as u32
}

/// `value` under the generation after the one in `packed`.
#[inline(always)]
fn successor(packed: u64, value: u32) -> u64 {
    (packed & !VALUE_MASK).wrapping_add(ONE_GENERATION) | u64::from(value)
}

pub(crate) struct Word32 {
    packed: AtomicU64,
}

impl Word32 {
    maybe_const_fn! {
        #[inline(always)]
        pub(crate) fn new(value: u32) -> Self {
            Self { packed: AtomicU64::new(value as u64) }
        }
    }

    #[inline(always)]
    pub(crate) fn load(&self) -> u32 {
        value_of(self.packed.load(LOAD))
    }

    #[inline(always)]
    pub(crate) fn store(&self, value: u32) {
        self.rewrite(|_| value);
    }

    #[inline(always)]
    pub(crate) fn add(&self, delta: u32) -> u32 {
        value_of(self.packed.fetch_add(ONE_GENERATION + u64::from(delta), RMW))
    }

    #[inline(always)]
    pub(crate) fn swap(&self, value: u32) -> u32 {
        self.rewrite(|_| value)
    }

    #[inline(always)]
    pub(crate) fn and(&self, mask: u32) -> u32 {
        self.rewrite(|value| value & mask)
    }

    #[inline(always)]
    pub(crate) fn or(&self, mask: u32) -> u32 {
        self.rewrite(|value| value | mask)
    }

    #[inline(always)]
    pub(crate) fn reserve(&self) -> (u32, u64) {
        let packed = self.packed.load(LOAD);
        (value_of(packed), packed)
    }

    #[inline(always)]
    pub(crate) fn commit(&self, stamp: u64, value: u32) -> bool {
        self.packed
            .compare_exchange(stamp, successor(stamp, value), RMW, LOAD)
            .is_ok()
    }

    /// Replaces the value with `f(value)` under a new generation, returning
    /// the value replaced.
    #[inline]
    fn rewrite(&self, f: impl Fn(u32) -> u32) -> u32 {
        let mut current = self.packed.load(LOAD);
        loop {
            let next = successor(current, f(value_of(current)));
            match self.packed.compare_exchange(current, next, RMW, LOAD) {
                Ok(_) => return value_of(current),
                Err(actual) => current = actual,
            }
        }
    }
}
