//! Words guarded by a sequence counter.
//!
//! Used where there is no wider atomic to pack a generation into: 64-bit words
//! off RISC-V, and 32-bit words on targets without 64-bit atomics. Writers
//! take turns: each one moves `seq` from even to odd, performs its single
//! atomic operation on the value, then moves `seq` to the next even number. A
//! reservation records the even `seq` it saw; the conditional write claims
//! `seq` only if it still holds that number, which no write can leave behind.
//!
//! Loads never touch `seq` and never wait.

use crate::sync::{maybe_const_fn, spin_loop, Ordering};

const LOAD: Ordering = Ordering::Acquire;
const STORE: Ordering = Ordering::Release;
const RMW: Ordering = Ordering::AcqRel;

macro_rules! sequenced_word {
    ($name:ident($atomic:ty, $value:ty)) => {
        pub(crate) struct $name {
            value: $atomic,
            seq: $atomic,
        }

        impl $name {
            maybe_const_fn! {
                #[inline(always)]
                pub(crate) fn new(value: $value) -> Self {
                    Self { value: <$atomic>::new(value), seq: <$atomic>::new(0) }
                }
            }

            #[inline(always)]
            pub(crate) fn load(&self) -> $value {
                self.value.load(LOAD)
            }

            #[inline]
            pub(crate) fn store(&self, value: $value) {
                self.write(|cell| cell.store(value, STORE))
            }

            #[inline]
            pub(crate) fn add(&self, delta: $value) -> $value {
                self.write(|cell| cell.fetch_add(delta, RMW))
            }

            #[inline]
            pub(crate) fn swap(&self, value: $value) -> $value {
                self.write(|cell| cell.swap(value, RMW))
            }

            #[inline]
            pub(crate) fn and(&self, mask: $value) -> $value {
                self.write(|cell| cell.fetch_and(mask, RMW))
            }

            #[inline]
            pub(crate) fn or(&self, mask: $value) -> $value {
                self.write(|cell| cell.fetch_or(mask, RMW))
            }

            /// Reads a value no writer was in the middle of, with its `seq`.
            pub(crate) fn reserve(&self) -> ($value, u64) {
                loop {
                    let seq = self.seq.load(LOAD);
                    if seq & 1 == 0 {
                        let value = self.value.load(LOAD);
                        if self.seq.load(LOAD) == seq {
                            return (value, seq as u64);
                        }
                    }
                    spin_loop();
                }
            }

            pub(crate) fn commit(&self, stamp: u64, value: $value) -> bool {
                let seq = stamp as $value;
                if self
                    .seq
                    .compare_exchange(seq, seq.wrapping_add(1), Ordering::Acquire, Ordering::Relaxed)
                    .is_err()
                {
                    return false;
                }
                self.value.store(value, STORE);
                self.seq.store(seq.wrapping_add(2), STORE);
                true
            }

            #[inline]
            fn write<R>(&self, op: impl FnOnce(&$atomic) -> R) -> R {
                let seq = self.begin_write();
                let out = op(&self.value);
                self.seq.store(seq.wrapping_add(2), STORE);
                out
            }

            /// Waits for an even `seq` and claims it, returning the even value.
            fn begin_write(&self) -> $value {
                loop {
                    let seq = self.seq.load(Ordering::Relaxed);
                    if seq & 1 == 0
                        && self
                            .seq
                            .compare_exchange(
                                seq,
                                seq.wrapping_add(1),
                                Ordering::Acquire,
                                Ordering::Relaxed,
                            )
                            .is_ok()
                    {
                        return seq;
                    }
                    spin_loop();
                }
            }
        }
    };
}

#[cfg(not(any(
    target_has_atomic = "64",
    all(
        any(target_arch = "riscv32", target_arch = "riscv64"),
        target_feature = "a",
        not(feature = "loom")
    )
)))]
sequenced_word!(Word32(crate::sync::AtomicU32, u32));

#[cfg(all(
    target_has_atomic = "64",
    not(all(target_arch = "riscv64", target_feature = "a", not(feature = "loom")))
))]
sequenced_word!(Word64(crate::sync::AtomicU64, u64));

#[cfg(all(
    test,
    not(feature = "loom"),
    target_has_atomic = "64",
    not(all(target_arch = "riscv64", target_feature = "a"))
))]
mod tests {
    use super::*;

    #[test]
    fn writes_leave_seq_even_and_advanced() {
        let word = Word64::new(9);
        let (_, start) = word.reserve();
        assert_eq!(start, 0);

        word.swap(9);
        word.add(0);
        let (value, now) = word.reserve();
        assert_eq!(value, 9);
        assert_eq!(now, 4);
    }

    #[test]
    fn commit_claims_seq_once() {
        let word = Word64::new(1);
        let (_, stamp) = word.reserve();

        assert!(word.commit(stamp, 2));
        assert!(!word.commit(stamp, 3));
        assert_eq!(word.load(), 2);
    }
}
