//! Combining per-key reducers into one reducer over a keyed state map.

use std::rc::Rc;

use indexmap::IndexMap;

use super::container::Reducer;

/// Whole state managed by a combined reducer: one slice per key, in the order
/// the reducers were registered.
pub type CombinedState<V> = IndexMap<String, Rc<V>>;

/// Turn a map of slice reducers into one reducer over [`CombinedState`].
///
/// Each reducer receives the slice stored under its key (or `V::default()` if
/// the slice does not exist yet). When every reducer hands back the very same
/// `Rc` it was given, the previous whole-state `Rc` is returned, so identity
/// checks further down can skip work.
pub fn combine_reducers<V, A>(
    reducers: IndexMap<String, Reducer<V, A>>,
) -> impl Fn(&Rc<CombinedState<V>>, &A) -> Rc<CombinedState<V>> + 'static
where
    V: Default + 'static,
    A: 'static,
{
    move |state: &Rc<CombinedState<V>>, action: &A| {
        let mut has_changed = false;
        let mut next = IndexMap::with_capacity(reducers.len());

        for (key, reducer) in &reducers {
            let previous = state.get(key);
            let next_for_key = match previous {
                Some(slice) => reducer(slice, action),
                None => reducer(&Rc::new(V::default()), action),
            };
            has_changed = has_changed
                || previous.map_or(true, |slice| !Rc::ptr_eq(slice, &next_for_key));
            next.insert(key.clone(), next_for_key);
        }

        if has_changed {
            Rc::new(next)
        } else {
            Rc::clone(state)
        }
    }
}
