//! # SpinLock
//!
//! Mutual exclusion by busy-polling one atomic word that is either `free`
//! (zero) or `held` (one).
//!
//! Three layers, each built on the one before:
//!
//! - [`acquire`] / [`release`]: free functions over any [`AtomicPrimitive`]
//!   word, for callers that keep the lock word in their own storage.
//! - [`RawSpinLock`]: owns the word; no data attached. Also implements
//!   [`lock_api::RawMutex`], which gives [`SpinMutex`] for free.
//! - [`SpinLock<T>`]: owns the data it protects and hands out a [`SpinGuard`]
//!   that releases on drop.
//!
//! ## Acquiring
//! [`RawSpinLock::acquire`] reserves the word, and only when it reads `free`
//! attempts the conditional write of `held`; reading `held` or losing the
//! conditional write sends it back to polling. [`RawSpinLock::acquire_by_swap`]
//! gets the same guarantee from an atomic swap of `held`, retried while the
//! swap returns `held`. Either way the `free -> held` transition is indivisible
//! and at most one context makes it at a time.
//!
//! ## Caveats
//! - **Not fair.** Waiters are not ordered; a newcomer may win over a context
//!   that has spun far longer. Starvation is possible under heavy contention.
//! - **Not reentrant.** Acquiring a lock the caller already holds spins
//!   forever: the caller's own `held` looks like any other contention.
//! - **No owner tracking.** Releasing a lock the caller does not hold is a
//!   contract violation the lock cannot detect, hence `unsafe`.
//! - **No timeout.** `acquire` polls without bound; use
//!   [`RawSpinLock::try_acquire_for`] or [`SpinLock::try_lock_for`] to bound
//!   the wait.
//! - Keep critical sections short and never block while holding the lock.
//!
//! ## Example
//! ```rust
//! use axiom_atomic::SpinLock;
//!
//! static COUNTER: SpinLock<u32> = SpinLock::new(0);
//!
//! fn bump() {
//!     *COUNTER.lock() += 1;
//! }
//!
//! bump();
//! bump();
//! assert_eq!(*COUNTER.lock(), 2);
//! ```

use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use crate::error::Contended;
use crate::primitive::{AtomicPrimitive, WordValue};
use crate::sync::{maybe_const_fn, spin_loop};
use crate::{AtomicWord, BackOff};

/// Spins until the calling context turns `lock` from `free` to `held`.
///
/// `lock` must start out zero (`free`). Uses the reserve / conditional-write
/// pair; see [`RawSpinLock::acquire`].
#[inline]
pub fn acquire<P: AtomicPrimitive + ?Sized>(lock: &P) {
    loop {
        let (state, token) = lock.reserve();
        if state == P::Value::ZERO && lock.conditional_write(token, P::Value::ONE) {
            return;
        }
        wait_until_free(lock);
    }
}

/// Spins on an atomic swap of `held` until the swap returns `free`.
#[inline]
pub fn acquire_by_swap<P: AtomicPrimitive + ?Sized>(lock: &P) {
    while lock.swap(P::Value::ONE) != P::Value::ZERO {
        wait_until_free(lock);
    }
}

/// Polls with plain loads until `lock` reads `free`, so waiters do not keep
/// taking reservations or writing `held` while the holder is inside.
#[inline(always)]
fn wait_until_free<P: AtomicPrimitive + ?Sized>(lock: &P) {
    loop {
        spin_loop();
        if lock.load() == P::Value::ZERO {
            return;
        }
    }
}

/// Stores `free` into `lock`.
///
/// # Safety
/// The caller must be the context whose [`acquire`] returned for this lock,
/// and must not touch the protected state afterwards.
#[inline]
pub unsafe fn release<P: AtomicPrimitive + ?Sized>(lock: &P) {
    lock.store(P::Value::ZERO);
}

/// A spinlock without attached data.
///
/// Which state it protects is up to the caller; the lock only guarantees
/// that between a returning [`acquire`](Self::acquire) and the matching
/// [`release`](Self::release) no other context holds it.
pub struct RawSpinLock<P = AtomicWord> {
    state: P,
}

impl RawSpinLock<AtomicWord> {
    maybe_const_fn! {
        /// Creates a free lock.
        #[inline(always)]
        pub fn new() -> Self {
            Self { state: AtomicWord::new(0) }
        }
    }
}

impl<P: AtomicPrimitive> RawSpinLock<P> {
    /// Builds a lock over an existing word, which must currently hold zero.
    #[inline(always)]
    pub const fn from_word(word: P) -> Self {
        Self { state: word }
    }

    /// Spins until the lock is held by the caller (reserve / conditional
    /// write). Never returns while another context holds it.
    #[inline]
    pub fn acquire(&self) {
        acquire(&self.state);
    }

    /// Spins until the lock is held by the caller (atomic swap).
    #[inline]
    pub fn acquire_by_swap(&self) {
        acquire_by_swap(&self.state);
    }

    /// Makes a single attempt to take the lock.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        self.state.swap(P::Value::ONE) == P::Value::ZERO
    }

    /// Tries up to `spins` times, with an exponential [`BackOff`] in between.
    pub fn try_acquire_for(&self, spins: u32) -> Result<(), Contended> {
        let backoff = BackOff::new();
        for attempt in 1..=spins {
            if self.try_acquire() {
                return Ok(());
            }
            if attempt < spins {
                backoff.wait();
            }
        }
        log::warn!("spinlock still held after {} attempts", spins);
        Err(Contended { attempts: spins })
    }

    /// Releases the lock.
    ///
    /// # Safety
    /// Only the current holder may call this, once per acquisition.
    #[inline]
    pub unsafe fn release(&self) {
        // SAFETY: forwarded from the caller.
        unsafe { release(&self.state) }
    }

    /// Whether some context currently holds the lock. Only a snapshot.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load() != P::Value::ZERO
    }

    /// The backing word.
    #[inline]
    pub fn word(&self) -> &P {
        &self.state
    }
}

impl<P: AtomicPrimitive> fmt::Debug for RawSpinLock<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSpinLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl Default for RawSpinLock<AtomicWord> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: `lock` returns only after the caller's own free -> held transition,
// and nothing but `unlock` (holder only) writes `free`.
#[cfg(not(feature = "loom"))]
unsafe impl lock_api::RawMutex for RawSpinLock<AtomicWord> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = lock_api::GuardSend;

    #[inline]
    fn lock(&self) {
        self.acquire();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.try_acquire()
    }

    #[inline]
    unsafe fn unlock(&self) {
        // SAFETY: lock_api only unlocks from the guard of the current holder.
        unsafe { self.release() }
    }

    #[inline]
    fn is_locked(&self) -> bool {
        RawSpinLock::is_locked(self)
    }
}

/// A [`lock_api::Mutex`] driven by [`RawSpinLock`].
#[cfg(not(feature = "loom"))]
pub type SpinMutex<T> = lock_api::Mutex<RawSpinLock, T>;

/// Guard of a [`SpinMutex`].
#[cfg(not(feature = "loom"))]
pub type SpinMutexGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;

/// A spinlock that owns the data it protects.
///
/// See the [module-level documentation](self) for the caveats.
pub struct SpinLock<T> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
}

/// Releases the [`SpinLock`] when dropped.
///
/// Derefs to the protected data. Shares the auto traits of `&mut T`: a guard
/// can be shared between threads only if `T` itself is `Sync`.
///
/// ```compile_fail
/// use axiom_atomic::SpinLock;
/// use std::cell::Cell;
///
/// fn shareable<S: Sync>(_: &S) {}
///
/// let lock = SpinLock::new(Cell::new(0u32));
/// shareable(&lock.lock());
/// ```
pub struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
    _data: PhantomData<&'a mut T>,
}

impl<'a, T> SpinGuard<'a, T> {
    /// Wraps a lock the calling context has just acquired.
    #[inline(always)]
    fn new(lock: &'a SpinLock<T>) -> Self {
        Self {
            lock,
            _data: PhantomData,
        }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: a guard exists only while its context holds the lock.
        unsafe { self.lock.raw.release() }
    }
}

impl<T> SpinLock<T> {
    maybe_const_fn! {
        /// Creates an unlocked [`SpinLock`] around `data`.
        ///
        /// # Example
        /// ```
        /// use axiom_atomic::SpinLock;
        ///
        /// let lock = SpinLock::new(123);
        /// assert_eq!(*lock.lock(), 123);
        /// ```
        #[inline(always)]
        pub fn new(data: T) -> Self {
            SpinLock {
                raw: RawSpinLock::new(),
                data: UnsafeCell::new(data),
            }
        }
    }

    /// Spins until the lock is acquired and returns its guard.
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_, T> {
        self.raw.acquire();
        SpinGuard::new(self)
    }

    /// Acquires without spinning, or returns `None` if held.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if self.raw.try_acquire() {
            Some(SpinGuard::new(self))
        } else {
            None
        }
    }

    /// Tries up to `spins` times with backoff before giving up.
    #[inline]
    pub fn try_lock_for(&self, spins: u32) -> Result<SpinGuard<'_, T>, Contended> {
        self.raw.try_acquire_for(spins)?;
        Ok(SpinGuard::new(self))
    }

    /// Runs `f` with exclusive access to the data.
    ///
    /// # Example
    /// ```
    /// use axiom_atomic::SpinLock;
    ///
    /// let lock = SpinLock::new(0i32);
    /// let seen = lock.with_lock(|data| {
    ///     *data += 1;
    ///     *data
    /// });
    /// assert_eq!(seen, 1);
    /// ```
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    /// Whether the lock is currently held. Only a snapshot.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Releases the lock without a guard.
    ///
    /// # Safety
    /// The caller must hold the lock and must have forgotten its guard
    /// (e.g. with [`core::mem::forget`]).
    #[inline]
    pub unsafe fn unlock(&self) {
        // SAFETY: forwarded from the caller.
        unsafe { self.raw.release() }
    }

    /// Mutable access without locking; `&mut self` already proves exclusivity.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the lock and returns the data.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("SpinLock").field("data", &&*guard).finish(),
            None => f.debug_struct("SpinLock").field("data", &"<locked>").finish(),
        }
    }
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: the guard proves the lock is held by this context.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves the lock is held by this context.
        unsafe { &mut *self.lock.data.get() }
    }
}

// SAFETY: the lock hands out at most one guard at a time, so the data is only
// ever reached from one context at once.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::testing::Counting;
    use core::cell::Cell;
    use rand::Rng;
    use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
    use std::sync::Arc;
    use std::thread;

    /// Caller-owned shared state: a lock and a plain, non-atomic counter it
    /// is documented to protect.
    struct Shared {
        lock: RawSpinLock,
        value: UnsafeCell<u64>,
        holder: AtomicUsize,
        inside: AtomicUsize,
    }

    // SAFETY: `value` is only touched while `lock` is held.
    unsafe impl Sync for Shared {}

    const NOBODY: usize = 0;

    impl Shared {
        fn new() -> Self {
            Self {
                lock: RawSpinLock::new(),
                value: UnsafeCell::new(0),
                holder: AtomicUsize::new(NOBODY),
                inside: AtomicUsize::new(0),
            }
        }

        /// Critical section that checks its own exclusivity.
        fn critical_section(&self, me: usize) {
            assert_eq!(self.inside.fetch_add(1, SeqCst), 0, "two contexts inside");
            assert_eq!(self.holder.swap(me, SeqCst), NOBODY, "lock already had a holder");

            // SAFETY: lock is held.
            unsafe {
                let v = *self.value.get();
                *self.value.get() = v + 1;
            }

            assert_eq!(self.holder.swap(NOBODY, SeqCst), me, "holder changed under us");
            assert_eq!(self.inside.fetch_sub(1, SeqCst), 1);
        }

        fn total(&self) -> u64 {
            // SAFETY: called after every worker joined.
            unsafe { *self.value.get() }
        }
    }

    fn hammer(shared: Arc<Shared>, contexts: usize, entries: usize, by_swap: bool) {
        let handles: Vec<_> = (1..=contexts)
            .map(|me| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    for _ in 0..entries {
                        if rng.gen_ratio(1, 32) {
                            thread::yield_now();
                        }
                        if by_swap {
                            shared.lock.acquire_by_swap();
                        } else {
                            shared.lock.acquire();
                        }
                        shared.critical_section(me);
                        // SAFETY: acquired just above.
                        unsafe { shared.lock.release() };
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_basic_lock_unlock() {
        let lock = SpinLock::new(10);

        {
            let mut guard = lock.lock();
            *guard += 5;
            assert_eq!(*guard, 15);
            assert!(lock.is_locked());
        }

        assert!(!lock.is_locked(), "lock should be released after guard drop");
        assert_eq!(lock.into_inner(), 15);
    }

    #[test]
    fn test_concurrent_access() {
        let lock = Arc::new(SpinLock::new(0usize));
        let mut handles = vec![];

        for _ in 0..4 {
            let lock_cloned = lock.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    let mut guard = lock_cloned.lock();
                    *guard += 1;
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*lock.lock(), 4 * 10_000, "counter should match total increments");
    }

    #[test]
    fn test_try_lock_for_behavior() {
        let lock = SpinLock::new(42);

        let guard = lock.lock();
        assert_eq!(
            lock.try_lock_for(10).err(),
            Some(Contended { attempts: 10 }),
            "lock should not be acquirable while held"
        );
        assert!(lock.try_lock().is_none());

        drop(guard);
        assert!(lock.try_lock_for(1000).is_ok());
    }

    #[test]
    fn raw_lock_excludes_under_reserve_acquire() {
        let shared = Arc::new(Shared::new());
        hammer(Arc::clone(&shared), 4, 20_000, false);
        assert_eq!(shared.total(), 4 * 20_000);
        assert!(!shared.lock.is_locked());
    }

    #[test]
    fn raw_lock_excludes_under_swap_acquire() {
        let shared = Arc::new(Shared::new());
        hammer(Arc::clone(&shared), 4, 20_000, true);
        assert_eq!(shared.total(), 4 * 20_000);
    }

    /// A held lock reads as contention to its own holder too.
    #[test]
    fn holder_cannot_reacquire() {
        let lock = RawSpinLock::new();
        lock.acquire();
        assert!(!lock.try_acquire());
        assert!(lock.try_acquire_for(3).is_err());
        unsafe { lock.release() };
        assert!(lock.try_acquire());
        unsafe { lock.release() };
    }

    #[test]
    fn free_functions_drive_caller_owned_word() {
        let word = AtomicWord::new(0);
        acquire(&word);
        assert_eq!(word.load(), 1);
        unsafe { release(&word) };
        assert_eq!(word.load(), 0);

        acquire_by_swap(&word);
        assert_eq!(word.load(), 1);
        unsafe { release(&word) };
        assert_eq!(word.load(), 0);
    }

    #[test]
    fn uncontended_acquire_release_is_three_steps() {
        let lock = RawSpinLock::from_word(Counting::new(AtomicWord::new(0)));
        lock.acquire();
        unsafe { lock.release() };
        // reserve, conditional write, store
        assert_eq!(lock.word().steps(), 3);
    }

    #[test]
    fn lock_api_mutex_is_driven_by_raw_lock() {
        let mutex = Arc::new(SpinMutex::new(Vec::new()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mutex = Arc::clone(&mutex);
                thread::spawn(move || {
                    for j in 0..1_000 {
                        mutex.lock().push(i * 1_000 + j);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut seen = mutex.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..4_000).collect::<Vec<_>>());
        assert!(!mutex.is_locked());
    }

    /// `check` resolves only for types that are not `Sync`: for a `Sync` type
    /// both impls apply and the call is ambiguous.
    trait NotSync<Marker> {
        fn check() {}
    }
    impl<S: ?Sized> NotSync<()> for S {}
    struct WhenSync;
    impl<S: ?Sized + Sync> NotSync<WhenSync> for S {}

    #[test]
    fn guard_is_only_as_shareable_as_its_data() {
        fn shareable<S: Sync>() {}
        fn sendable<S: Send>() {}

        shareable::<SpinGuard<'static, u32>>();
        shareable::<SpinLock<Cell<u32>>>();
        sendable::<SpinGuard<'static, Cell<u32>>>();
        <SpinGuard<'static, Cell<u32>> as NotSync<_>>::check();

        let lock = SpinLock::new(Cell::new(1));
        {
            let guard = lock.lock();
            guard.set(guard.get() + 1);
        }
        assert_eq!(lock.into_inner().get(), 2);
    }

    #[test]
    fn with_lock_and_get_mut() {
        let mut lock = SpinLock::new(String::from("a"));
        lock.with_lock(|s| s.push('b'));
        lock.get_mut().push('c');
        assert_eq!(format!("{:?}", lock), "SpinLock { data: \"abc\" }");

        let guard = lock.lock();
        assert_eq!(format!("{:?}", lock), "SpinLock { data: \"<locked>\" }");
        core::mem::forget(guard);
        unsafe { lock.unlock() };
        assert!(!lock.is_locked());
    }
}
