//! Derived Selectors
//!
//! A derived selector reads a set of input selectors and feeds their outputs
//! to a combiner. It is memoized at two levels:
//!
//! - The whole selector is memoized on `(state, props)`, with the state
//!   compared by pointer identity. Selecting twice against the same state
//!   does not even run the input selectors.
//!
//! - The combiner is memoized on the input selectors' outputs. A new state
//!   whose relevant slices are unchanged reruns the inputs but not the
//!   combiner.
//!
//! Input selectors are given either as a tuple (each element may have its
//! own output type) or as a `Vec`/array of selectors sharing one output type.
//! Both forms produce the same kind of selector.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::equality::{ArgsEquality, ShallowEq, ShallowEquality};
use super::memoize::MemoCache;

/// Anything that reads a value out of a state and props.
///
/// Implemented for every `Fn(&Rc<S>, &P) -> R` and for [`DerivedSelector`].
pub trait Selector<S, P> {
    type Output;

    fn select(&self, state: &Rc<S>, props: &P) -> Self::Output;
}

impl<S, P, R, F> Selector<S, P> for F
where
    F: Fn(&Rc<S>, &P) -> R,
{
    type Output = R;

    #[inline]
    fn select(&self, state: &Rc<S>, props: &P) -> R {
        self(state, props)
    }
}

/// The input selectors of a derived selector.
pub trait Dependencies<S, P> {
    /// What the combiner receives.
    type Output;

    fn select_all(&self, state: &Rc<S>, props: &P) -> Self::Output;

    fn count(&self) -> usize;
}

macro_rules! impl_dependencies_for_tuple {
    ($($dep:ident => $idx:tt),+) => {
        impl<S, P, $($dep),+> Dependencies<S, P> for ($($dep,)+)
        where
            $($dep: Selector<S, P>,)+
        {
            type Output = ($(<$dep as Selector<S, P>>::Output,)+);

            fn select_all(&self, state: &Rc<S>, props: &P) -> Self::Output {
                ($(self.$idx.select(state, props),)+)
            }

            fn count(&self) -> usize {
                [$(stringify!($dep)),+].len()
            }
        }
    };
}

impl_dependencies_for_tuple!(D0 => 0);
impl_dependencies_for_tuple!(D0 => 0, D1 => 1);
impl_dependencies_for_tuple!(D0 => 0, D1 => 1, D2 => 2);
impl_dependencies_for_tuple!(D0 => 0, D1 => 1, D2 => 2, D3 => 3);
impl_dependencies_for_tuple!(D0 => 0, D1 => 1, D2 => 2, D3 => 3, D4 => 4);
impl_dependencies_for_tuple!(D0 => 0, D1 => 1, D2 => 2, D3 => 3, D4 => 4, D5 => 5);
impl_dependencies_for_tuple!(D0 => 0, D1 => 1, D2 => 2, D3 => 3, D4 => 4, D5 => 5, D6 => 6);
impl_dependencies_for_tuple!(
    D0 => 0, D1 => 1, D2 => 2, D3 => 3, D4 => 4, D5 => 5, D6 => 6, D7 => 7
);

impl<S, P, D> Dependencies<S, P> for Vec<D>
where
    D: Selector<S, P>,
{
    type Output = Vec<D::Output>;

    fn select_all(&self, state: &Rc<S>, props: &P) -> Self::Output {
        self.iter().map(|dep| dep.select(state, props)).collect()
    }

    fn count(&self) -> usize {
        self.len()
    }
}

impl<S, P, D, const N: usize> Dependencies<S, P> for [D; N]
where
    D: Selector<S, P>,
{
    type Output = Vec<D::Output>;

    fn select_all(&self, state: &Rc<S>, props: &P) -> Self::Output {
        self.iter().map(|dep| dep.select(state, props)).collect()
    }

    fn count(&self) -> usize {
        N
    }
}

/// A memoized selector built by [`create_selector`].
pub struct DerivedSelector<S, P, D, T, F, E = ShallowEquality>
where
    D: Dependencies<S, P>,
{
    dependencies: D,
    combiner: F,
    selector_cache: MemoCache<(Rc<S>, P), T>,
    combiner_cache: MemoCache<D::Output, T, E>,
    recomputations: AtomicUsize,
}

impl<S, P, D, T, F, E> DerivedSelector<S, P, D, T, F, E>
where
    D: Dependencies<S, P>,
{
    /// How many times the combiner has run.
    pub fn recomputations(&self) -> usize {
        self.recomputations.load(Ordering::Relaxed)
    }

    pub fn reset_recomputations(&self) {
        self.recomputations.store(0, Ordering::Relaxed);
    }

    /// The input selectors.
    pub fn dependencies(&self) -> &D {
        &self.dependencies
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.count()
    }

    /// The unmemoized combiner.
    pub fn result_func(&self) -> &F {
        &self.combiner
    }
}

impl<S, P, D, T, F, E> Selector<S, P> for DerivedSelector<S, P, D, T, F, E>
where
    D: Dependencies<S, P>,
    P: Clone + ShallowEq,
    T: Clone,
    F: Fn(&D::Output) -> T,
    E: ArgsEquality<D::Output>,
{
    type Output = T;

    fn select(&self, state: &Rc<S>, props: &P) -> T {
        self.selector_cache
            .get_or_compute((Rc::clone(state), props.clone()), |(state, props)| {
                let inputs = self.dependencies.select_all(state, props);
                self.combiner_cache.get_or_compute(inputs, |inputs| {
                    self.recomputations.fetch_add(1, Ordering::Relaxed);
                    (self.combiner)(inputs)
                })
            })
    }
}

impl<'a, S, P, D, T, F, E> Selector<S, P> for &'a DerivedSelector<S, P, D, T, F, E>
where
    D: Dependencies<S, P>,
    P: Clone + ShallowEq,
    T: Clone,
    F: Fn(&D::Output) -> T,
    E: ArgsEquality<D::Output>,
{
    type Output = T;

    fn select(&self, state: &Rc<S>, props: &P) -> T {
        (**self).select(state, props)
    }
}

impl<S, P, D, T, F, E> fmt::Debug for DerivedSelector<S, P, D, T, F, E>
where
    D: Dependencies<S, P>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedSelector")
            .field("dependencies", &self.dependencies.count())
            .field("recomputations", &self.recomputations())
            .finish()
    }
}

/// Build a memoized selector from input selectors and a combiner.
///
/// ```
/// use std::rc::Rc;
/// use keystone_core::select::{create_selector, Selector};
///
/// struct Cart { price: u32, quantity: u32 }
///
/// let total = create_selector(
///     (
///         |cart: &Rc<Cart>, _: &()| cart.price,
///         |cart: &Rc<Cart>, _: &()| cart.quantity,
///     ),
///     |&(price, quantity): &(u32, u32)| price * quantity,
/// );
///
/// let cart = Rc::new(Cart { price: 3, quantity: 4 });
/// assert_eq!(total.select(&cart, &()), 12);
/// assert_eq!(total.recomputations(), 1);
/// ```
pub fn create_selector<S, P, D, T, F>(
    dependencies: D,
    combiner: F,
) -> DerivedSelector<S, P, D, T, F>
where
    D: Dependencies<S, P>,
    D::Output: ShallowEq,
    F: Fn(&D::Output) -> T,
    T: Clone,
{
    create_selector_with(dependencies, combiner, ShallowEquality)
}

/// Like [`create_selector`], comparing the combiner's inputs with `equality`.
///
/// The outer `(state, props)` memo always uses [`ShallowEquality`].
pub fn create_selector_with<S, P, D, T, F, E>(
    dependencies: D,
    combiner: F,
    equality: E,
) -> DerivedSelector<S, P, D, T, F, E>
where
    D: Dependencies<S, P>,
    F: Fn(&D::Output) -> T,
    T: Clone,
    E: ArgsEquality<D::Output>,
{
    DerivedSelector {
        dependencies,
        combiner,
        selector_cache: MemoCache::new(ShallowEquality),
        combiner_cache: MemoCache::new(equality),
        recomputations: AtomicUsize::new(0),
    }
}
