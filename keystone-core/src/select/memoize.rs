//! Memoizer
//!
//! A single-slot cache: the memoized function remembers only the last
//! argument list and the last result.
//!
//! # Cache behavior
//!
//! 1. A call whose arguments equal the previous call's arguments (under the
//!    configured [`ArgsEquality`]) returns the cached result without running
//!    the function.
//!
//! 2. Otherwise the function runs and its result replaces the cached one.
//!
//! 3. The new arguments are remembered even when the function panics. The
//!    cached result is only replaced on success, so a call that panicked
//!    leaves the previous result paired with the new arguments.
//!
//! The cache lock is never held while the user function runs, so a
//! memoized function may call other memoized functions freely.
//!
//! The lock only matters for a standalone [`Memoized`] shared across
//! threads. Derived selectors cache `Rc` state and stay `!Send` regardless.

use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;

use super::equality::{ArgsEquality, ShallowEq, ShallowEquality};

struct Slot<A, R> {
    last_args: Option<A>,
    last_result: Option<R>,
}

/// Last-arguments/last-result cache shared by [`Memoized`] and derived
/// selectors.
pub struct MemoCache<A, R, E = ShallowEquality> {
    equality: E,
    slot: Mutex<Slot<A, R>>,
}

impl<A, R, E> MemoCache<A, R, E> {
    pub fn new(equality: E) -> Self {
        Self {
            equality,
            slot: Mutex::new(Slot {
                last_args: None,
                last_result: None,
            }),
        }
    }

    /// Forget the cached arguments and result.
    pub fn clear(&self) {
        let mut slot = self.slot.lock();
        slot.last_args = None;
        slot.last_result = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().last_result.is_none()
    }
}

impl<A, R, E> MemoCache<A, R, E>
where
    R: Clone,
    E: ArgsEquality<A>,
{
    /// Return the cached result for `args`, or compute and cache a new one.
    pub fn get_or_compute<F>(&self, args: A, compute: F) -> R
    where
        F: FnOnce(&A) -> R,
    {
        {
            let mut slot = self.slot.lock();
            let hit = match (&slot.last_args, &slot.last_result) {
                (Some(previous), Some(result)) if self.equality.args_equal(previous, &args) => {
                    Some(result.clone())
                }
                _ => None,
            };
            if let Some(result) = hit {
                slot.last_args = Some(args);
                return result;
            }
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| compute(&args)));

        let mut slot = self.slot.lock();
        slot.last_args = Some(args);
        match outcome {
            Ok(result) => {
                slot.last_result = Some(result.clone());
                result
            }
            Err(payload) => {
                drop(slot);
                panic::resume_unwind(payload)
            }
        }
    }
}

impl<A, R> Default for MemoCache<A, R, ShallowEquality>
where
    R: Clone,
    A: ShallowEq,
{
    fn default() -> Self {
        Self::new(ShallowEquality)
    }
}

/// A function wrapped with a [`MemoCache`].
pub struct Memoized<A, R, F, E = ShallowEquality> {
    func: F,
    cache: MemoCache<A, R, E>,
}

impl<A, R, F, E> Memoized<A, R, F, E>
where
    F: Fn(&A) -> R,
    R: Clone,
    E: ArgsEquality<A>,
{
    /// Call the wrapped function, or return the cached result.
    pub fn call(&self, args: A) -> R {
        self.cache.get_or_compute(args, |args| (self.func)(args))
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

/// Memoize `func` comparing arguments with [`ShallowEquality`].
///
/// Multi-argument functions take their arguments as a tuple:
///
/// ```
/// use keystone_core::select::memoize;
///
/// let add = memoize(|&(a, b): &(i32, i32)| a + b);
/// assert_eq!(add.call((1, 2)), 3);
/// ```
pub fn memoize<A, R, F>(func: F) -> Memoized<A, R, F>
where
    F: Fn(&A) -> R,
    R: Clone,
    ShallowEquality: ArgsEquality<A>,
{
    memoize_with(func, ShallowEquality)
}

/// Memoize `func` with a custom equality strategy.
pub fn memoize_with<A, R, F, E>(func: F, equality: E) -> Memoized<A, R, F, E>
where
    F: Fn(&A) -> R,
    R: Clone,
    E: ArgsEquality<A>,
{
    Memoized {
        func,
        cache: MemoCache::new(equality),
    }
}
