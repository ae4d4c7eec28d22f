//! # Word backends
//!
//! [`AtomicWord`](crate::AtomicWord) and [`AtomicWord64`](crate::AtomicWord64)
//! keep their state in one of the cells defined here. Every cell offers the
//! same inherent API: `load`, `store`, `add`, `swap`, `and`, `or`, `reserve`
//! returning the value plus a backend stamp, and `commit` taking that stamp
//! back.
//!
//! A conditional write must fail after *any* write to the word since the
//! reservation, including one that put back the value that was reserved. How
//! each backend sees that:
//!
//! | Backend       | Used for                                    | Detects a write by                         |
//! | ------------- | ------------------------------------------- | ------------------------------------------ |
//! | `riscv`       | RISC-V with the `A` extension (`lr`/`sc`)   | the hart losing its reservation            |
//! | `packed`      | 32-bit words wherever 64-bit atomics exist  | a generation stored above the value        |
//! | `sequenced`   | everything else                             | a sequence counter every writer advances   |
//!
//! The emulated backends count writes in a finite field, so a reservation that
//! sits through a whole wrap of it (2^32 writes for `packed`, 2^31 or 2^63 for
//! `sequenced`) and finds the same value again is not refused.

#[cfg(all(
    any(target_arch = "riscv32", target_arch = "riscv64"),
    target_feature = "a",
    not(feature = "loom")
))]
mod riscv;

#[cfg(all(
    target_has_atomic = "64",
    not(all(
        any(target_arch = "riscv32", target_arch = "riscv64"),
        target_feature = "a",
        not(feature = "loom")
    ))
))]
mod packed;

#[cfg(any(
    not(any(
        target_has_atomic = "64",
        all(
            any(target_arch = "riscv32", target_arch = "riscv64"),
            target_feature = "a",
            not(feature = "loom")
        )
    )),
    all(
        target_has_atomic = "64",
        not(all(target_arch = "riscv64", target_feature = "a", not(feature = "loom")))
    )
))]
mod sequenced;

#[cfg(all(
    any(target_arch = "riscv32", target_arch = "riscv64"),
    target_feature = "a",
    not(feature = "loom")
))]
pub(crate) use riscv::Word32;

#[cfg(all(
    target_has_atomic = "64",
    not(all(
        any(target_arch = "riscv32", target_arch = "riscv64"),
        target_feature = "a",
        not(feature = "loom")
    ))
))]
pub(crate) use packed::Word32;

#[cfg(not(any(
    target_has_atomic = "64",
    all(
        any(target_arch = "riscv32", target_arch = "riscv64"),
        target_feature = "a",
        not(feature = "loom")
    )
)))]
pub(crate) use sequenced::Word32;

#[cfg(all(target_arch = "riscv64", target_feature = "a", not(feature = "loom")))]
pub(crate) use riscv::Word64;

#[cfg(all(
    target_has_atomic = "64",
    not(all(target_arch = "riscv64", target_feature = "a", not(feature = "loom")))
))]
pub(crate) use sequenced::Word64;
