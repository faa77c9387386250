//! Structured selectors: a map of named selectors folded into one selector
//! that returns a map of their results.

use std::rc::Rc;

use indexmap::IndexMap;

use super::derived::{create_selector_with, DerivedSelector, Selector};
use super::equality::{ArgsEquality, ShallowEq, ShallowEquality};

/// Keyed results of a structured selector, in the order the selectors were
/// given.
pub type Structured<R> = IndexMap<String, R>;

/// Combine named selectors into a single memoized selector.
///
/// The result keeps the keys and order of `selectors`. The combined map is
/// rebuilt only when one of the named outputs changes.
pub fn create_structured_selector<S, P, D, R>(
    selectors: IndexMap<String, D>,
) -> DerivedSelector<S, P, Vec<D>, Structured<R>, impl Fn(&Vec<R>) -> Structured<R>>
where
    D: Selector<S, P, Output = R>,
    R: Clone + ShallowEq,
{
    create_structured_selector_with(selectors, ShallowEquality)
}

/// Like [`create_structured_selector`], comparing the named outputs with
/// `equality`.
pub fn create_structured_selector_with<S, P, D, R, E>(
    selectors: IndexMap<String, D>,
    equality: E,
) -> DerivedSelector<S, P, Vec<D>, Structured<R>, impl Fn(&Vec<R>) -> Structured<R>, E>
where
    D: Selector<S, P, Output = R>,
    R: Clone,
    E: ArgsEquality<Vec<R>>,
{
    let (keys, dependencies): (Vec<String>, Vec<D>) = selectors.into_iter().unzip();
    let keys: Rc<[String]> = keys.into();

    create_selector_with(
        dependencies,
        move |values: &Vec<R>| -> Structured<R> {
            keys.iter().cloned().zip(values.iter().cloned()).collect()
        },
        equality,
    )
}
