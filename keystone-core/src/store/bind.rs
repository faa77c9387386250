//! Binding action creators to a dispatch function.

use std::rc::Rc;

use indexmap::IndexMap;

use super::container::DispatchFn;
use crate::error::Result;

/// Builds an action from some arguments.
pub type ActionCreator<Args, A> = Rc<dyn Fn(Args) -> A>;

/// An action creator that dispatches what it builds.
pub type BoundActionCreator<Args, A> = Rc<dyn Fn(Args) -> Result<A>>;

/// Bind one creator: calling the result builds the action and forwards it to
/// `dispatch`, returning whatever `dispatch` returns.
pub fn bind_action_creator<Args, A, F>(creator: F, dispatch: DispatchFn<A>) -> BoundActionCreator<Args, A>
where
    Args: 'static,
    A: 'static,
    F: Fn(Args) -> A + 'static,
{
    Rc::new(move |args: Args| dispatch(creator(args)))
}

/// Bind every creator of a named collection, keeping key order.
pub fn bind_action_creators<Args, A>(
    creators: IndexMap<String, ActionCreator<Args, A>>,
    dispatch: DispatchFn<A>,
) -> IndexMap<String, BoundActionCreator<Args, A>>
where
    Args: 'static,
    A: 'static,
{
    creators
        .into_iter()
        .map(|(name, creator)| {
            let bound = bind_action_creator(move |args: Args| creator(args), Rc::clone(&dispatch));
            (name, bound)
        })
        .collect()
}
