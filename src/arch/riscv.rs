//! Native `lr`/`sc` for RISC-V harts implementing the `A` extension.
//!
//! A hart holds at most one reservation at a time. Opening a second one, a
//! trap, any store to the reservation set by another hart, or *any* `sc` in
//! between makes the matching `sc` fail, which callers already treat as
//! contention and retry.
//!
//! Stores by the same hart through `amo*` or a plain `sw` are not guaranteed to
//! break its own reservation, so every write here that is not the `sc` itself
//! is followed by [`forget_reservation`]. The stamp is unused: the hart's
//! reservation already carries everything the `sc` needs.

use core::arch::asm;

#[cfg(target_arch = "riscv64")]
use crate::sync::AtomicU64;
use crate::sync::{AtomicU32, Ordering};

const LOAD: Ordering = Ordering::Acquire;
const STORE: Ordering = Ordering::Release;
const RMW: Ordering = Ordering::AcqRel;

/// Ends this hart's reservation, if it holds one.
///
/// An `sc` to an address outside the reservation set fails without writing,
/// and every `sc` invalidates the reservation whether it succeeds or not.
#[inline(always)]
fn forget_reservation() {
    let mut scratch: u32 = 0;
    // SAFETY: `scratch` is a live, aligned word on our stack; the `sc` never
    // writes it because no reservation can cover it.
    unsafe {
        asm!(
            "sc.w {status}, zero, ({addr})",
            status = out(reg) _,
            addr = in(reg) &mut scratch as *mut u32,
            options(nostack),
        );
    }
}

macro_rules! native_word {
    ($name:ident($atomic:ty, $value:ty, $lr:literal, $sc:literal)) => {
        pub(crate) struct $name {
            cell: $atomic,
        }

        impl $name {
            #[inline(always)]
            pub(crate) const fn new(value: $value) -> Self {
                Self { cell: <$atomic>::new(value) }
            }

            #[inline(always)]
            pub(crate) fn load(&self) -> $value {
                self.cell.load(LOAD)
            }

            #[inline(always)]
            pub(crate) fn store(&self, value: $value) {
                self.cell.store(value, STORE);
                forget_reservation();
            }

            #[inline(always)]
            pub(crate) fn add(&self, delta: $value) -> $value {
                let old = self.cell.fetch_add(delta, RMW);
                forget_reservation();
                old
            }

            #[inline(always)]
            pub(crate) fn swap(&self, value: $value) -> $value {
                let old = self.cell.swap(value, RMW);
                forget_reservation();
                old
            }

            #[inline(always)]
            pub(crate) fn and(&self, mask: $value) -> $value {
                let old = self.cell.fetch_and(mask, RMW);
                forget_reservation();
                old
            }

            #[inline(always)]
            pub(crate) fn or(&self, mask: $value) -> $value {
                let old = self.cell.fetch_or(mask, RMW);
                forget_reservation();
                old
            }

            #[inline(always)]
            pub(crate) fn reserve(&self) -> ($value, u64) {
                let value: $value;
                // SAFETY: `cell` is a live, aligned atomic for the whole call.
                unsafe {
                    asm!(
                        $lr,
                        value = out(reg) value,
                        addr = in(reg) self.cell.as_ptr(),
                        options(nostack),
                    );
                }
                (value, 0)
            }

            /// `sc` writes zero to its destination register on success.
            #[inline(always)]
            pub(crate) fn commit(&self, _stamp: u64, value: $value) -> bool {
                let status: usize;
                // SAFETY: `cell` is a live, aligned atomic for the whole call.
                unsafe {
                    asm!(
                        $sc,
                        status = out(reg) status,
                        value = in(reg) value,
                        addr = in(reg) self.cell.as_ptr(),
                        options(nostack),
                    );
                }
                status == 0
            }
        }
    };
}

native_word!(Word32(AtomicU32, u32, "lr.w.aq {value}, ({addr})", "sc.w.rl {status}, {value}, ({addr})"));

#[cfg(target_arch = "riscv64")]
native_word!(Word64(AtomicU64, u64, "lr.d.aq {value}, ({addr})", "sc.d.rl {status}, {value}, ({addr})"));
