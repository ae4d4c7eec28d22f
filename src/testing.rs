//! Instrumented [`AtomicPrimitive`] doubles shared by the unit tests.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering::SeqCst};

use crate::primitive::{AtomicPrimitive, Reservation};

/// Counts every primitive operation forwarded to the wrapped word.
pub(crate) struct Counting<P> {
    inner: P,
    steps: AtomicUsize,
}

impl<P: AtomicPrimitive> Counting<P> {
    pub(crate) fn new(inner: P) -> Self {
        Self {
            inner,
            steps: AtomicUsize::new(0),
        }
    }

    pub(crate) fn steps(&self) -> usize {
        self.steps.load(SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.steps.store(0, SeqCst);
    }

    fn step(&self) {
        self.steps.fetch_add(1, SeqCst);
    }
}

impl<P: AtomicPrimitive> AtomicPrimitive for Counting<P> {
    type Value = P::Value;

    fn load(&self) -> P::Value {
        self.step();
        self.inner.load()
    }

    fn store(&self, value: P::Value) {
        self.step();
        self.inner.store(value)
    }

    fn add(&self, delta: P::Value) -> P::Value {
        self.step();
        self.inner.add(delta)
    }

    fn swap(&self, value: P::Value) -> P::Value {
        self.step();
        self.inner.swap(value)
    }

    fn and(&self, mask: P::Value) -> P::Value {
        self.step();
        self.inner.and(mask)
    }

    fn or(&self, mask: P::Value) -> P::Value {
        self.step();
        self.inner.or(mask)
    }

    fn reserve(&self) -> (P::Value, Reservation<P::Value>) {
        self.step();
        self.inner.reserve()
    }

    fn conditional_write(&self, token: Reservation<P::Value>, value: P::Value) -> bool {
        self.step();
        self.inner.conditional_write(token, value)
    }
}

/// Plays a third-party context: right before each of the next `interferences`
/// conditional writes it adds `delta` to the word behind the caller's back.
pub(crate) struct Meddling<P: AtomicPrimitive> {
    inner: P,
    delta: P::Value,
    remaining: AtomicU32,
}

impl<P: AtomicPrimitive> Meddling<P> {
    pub(crate) fn new(inner: P, delta: P::Value, interferences: u32) -> Self {
        Self {
            inner,
            delta,
            remaining: AtomicU32::new(interferences),
        }
    }

    pub(crate) fn remaining(&self) -> u32 {
        self.remaining.load(SeqCst)
    }
}

impl<P: AtomicPrimitive> AtomicPrimitive for Meddling<P> {
    type Value = P::Value;

    fn load(&self) -> P::Value {
        self.inner.load()
    }

    fn store(&self, value: P::Value) {
        self.inner.store(value)
    }

    fn add(&self, delta: P::Value) -> P::Value {
        self.inner.add(delta)
    }

    fn swap(&self, value: P::Value) -> P::Value {
        self.inner.swap(value)
    }

    fn and(&self, mask: P::Value) -> P::Value {
        self.inner.and(mask)
    }

    fn or(&self, mask: P::Value) -> P::Value {
        self.inner.or(mask)
    }

    fn reserve(&self) -> (P::Value, Reservation<P::Value>) {
        self.inner.reserve()
    }

    fn conditional_write(&self, token: Reservation<P::Value>, value: P::Value) -> bool {
        let meddle = self
            .remaining
            .fetch_update(SeqCst, SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if meddle {
            self.inner.add(self.delta);
        }
        self.inner.conditional_write(token, value)
    }
}
