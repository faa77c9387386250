//! Middleware
//!
//! A middleware receives a [`MiddlewareApi`] and returns a transformer from
//! "the next handler" to "this stage's handler". [`apply_middleware`] chains
//! every stage in front of the store's own dispatch.
//!
//! # Construction order
//!
//! The API handed to middleware forwards `dispatch` through a shared slot.
//! The slot holds a handler that fails with
//! [`StoreError::ConstructionOrder`] until the whole chain has been built,
//! and is then repointed at the composed chain. Middleware that capture the
//! API early (e.g. to dispatch from a deferred task) therefore always reach
//! the complete chain, never a partial one.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::compose::compose;
use crate::error::{Result, StoreError};
use crate::store::{Action, DispatchFn, Reducer, StateReader, StoreCreator, StoreEnhancer};

/// Turns the next stage's handler into this stage's handler.
pub type DispatchTransformer<A> = Box<dyn FnOnce(DispatchFn<A>) -> DispatchFn<A>>;

/// A pipeline stage, instantiated once per store.
pub type Middleware<S, A> = Box<dyn FnOnce(&MiddlewareApi<S, A>) -> DispatchTransformer<A>>;

/// The part of the store visible to middleware.
///
/// The API does not keep the store alive: once the store is dropped, both
/// operations fail with [`StoreError::Dropped`].
pub struct MiddlewareApi<S, A> {
    get_state: StateReader<S>,
    dispatch: Weak<RefCell<DispatchFn<A>>>,
}

impl<S, A> MiddlewareApi<S, A> {
    /// The store's current state.
    pub fn get_state(&self) -> Result<Rc<S>> {
        (self.get_state)()
    }

    /// Dispatch through the full middleware chain.
    pub fn dispatch(&self, action: A) -> Result<A> {
        let slot = self.dispatch.upgrade().ok_or(StoreError::Dropped)?;
        let handler = Rc::clone(&slot.borrow());
        handler(action)
    }
}

impl<S, A> Clone for MiddlewareApi<S, A> {
    fn clone(&self) -> Self {
        Self {
            get_state: Rc::clone(&self.get_state),
            dispatch: Weak::clone(&self.dispatch),
        }
    }
}

/// Build a store enhancer that runs every action through `middlewares`.
///
/// The first middleware sees an action first; the last one hands it to the
/// store's own dispatch.
pub fn apply_middleware<S, A>(middlewares: Vec<Middleware<S, A>>) -> StoreEnhancer<S, A>
where
    S: 'static,
    A: Action + 'static,
{
    Box::new(move |create: StoreCreator<S, A>| -> StoreCreator<S, A> {
        Box::new(move |reducer: Reducer<S, A>, preloaded: Option<S>| {
            let store = create(reducer, preloaded)?;

            let under_construction: DispatchFn<A> =
                Rc::new(|_: A| -> Result<A> { Err(StoreError::ConstructionOrder) });
            let slot = Rc::new(RefCell::new(under_construction));

            let api = MiddlewareApi {
                get_state: store.state_reader(),
                dispatch: Rc::downgrade(&slot),
            };

            let chain: Vec<DispatchTransformer<A>> = middlewares
                .into_iter()
                .map(|middleware| middleware(&api))
                .collect();
            debug!(stages = chain.len(), "middleware chain built");

            let composed = compose(chain)(store.dispatcher());
            *slot.borrow_mut() = composed;

            let dispatch: DispatchFn<A> = Rc::new(move |action: A| {
                let handler = Rc::clone(&slot.borrow());
                handler(action)
            });
            Ok(store.with_dispatch(dispatch))
        })
    })
}
