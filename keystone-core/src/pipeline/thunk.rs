//! Thunk middleware
//!
//! Lets an action carry a closure instead of data. When such an action is
//! dispatched the closure runs with the [`MiddlewareApi`] (and an optional
//! shared extra argument) and the action never reaches the later stages or
//! the reducer. The closure may dispatch immediately, or keep the API and
//! dispatch from a later turn.

use std::fmt;
use std::rc::Rc;

use super::middleware::{DispatchTransformer, Middleware, MiddlewareApi};
use crate::error::Result;
use crate::store::{Action, DispatchFn};

/// Deferred work carried by an action.
pub struct Thunk<S, A, E = ()> {
    run: Rc<dyn Fn(&MiddlewareApi<S, A>, &E) -> Result<A>>,
}

impl<S, A, E> Thunk<S, A, E> {
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(&MiddlewareApi<S, A>, &E) -> Result<A> + 'static,
    {
        Self { run: Rc::new(run) }
    }

    /// Run the thunk against a store.
    pub fn run(&self, api: &MiddlewareApi<S, A>, extra: &E) -> Result<A> {
        (self.run)(api, extra)
    }
}

impl<S, A, E> Clone for Thunk<S, A, E> {
    fn clone(&self) -> Self {
        Self {
            run: Rc::clone(&self.run),
        }
    }
}

impl<S, A, E> fmt::Debug for Thunk<S, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk(..)")
    }
}

/// Actions that may carry a [`Thunk`].
pub trait ThunkAction<S, E = ()>: Action {
    /// Take the thunk out of the action, or hand the action back untouched.
    fn into_thunk(self) -> std::result::Result<Thunk<S, Self, E>, Self>;
}

/// Thunk middleware without an extra argument.
pub fn thunk<S, A>() -> Middleware<S, A>
where
    S: 'static,
    A: ThunkAction<S> + 'static,
{
    thunk_with_extra(())
}

/// Thunk middleware that passes `extra` to every thunk it runs.
pub fn thunk_with_extra<S, A, E>(extra: E) -> Middleware<S, A>
where
    S: 'static,
    A: ThunkAction<S, E> + 'static,
    E: 'static,
{
    Box::new(move |api: &MiddlewareApi<S, A>| -> DispatchTransformer<A> {
        let api = api.clone();
        Box::new(move |next: DispatchFn<A>| -> DispatchFn<A> {
            Rc::new(move |action: A| match action.into_thunk() {
                Ok(thunk) => thunk.run(&api, &extra),
                Err(action) => next(action),
            })
        })
    })
}
