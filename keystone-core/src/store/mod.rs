//! State Container
//!
//! This module implements the store: the single owner of application state,
//! plus the helpers that sit directly on its boundary.
//!
//! # Concepts
//!
//! ## Store
//!
//! A [`Store`] holds one state value behind an `Rc`. The only way to change it
//! is [`Store::dispatch`], which runs the reducer with the current state and
//! the action, swaps in the result and then notifies every listener that was
//! registered when the notification pass started.
//!
//! ## Actions
//!
//! Anything implementing [`Action`]. The store only requires a non-empty
//! discriminant; `serde_json::Value` objects with a `"kind"` field work out of
//! the box.
//!
//! ## Reducers
//!
//! Pure `(state, action) -> state` functions. Returning the same `Rc` signals
//! "unchanged", which [`combine_reducers`] relies on to preserve identity of
//! the whole state.

mod action;
mod bind;
mod combine;
mod container;
mod listeners;

pub use action::{action_types, json_action, Action, KIND_FIELD};
pub use bind::{bind_action_creator, bind_action_creators, ActionCreator, BoundActionCreator};
pub use combine::{combine_reducers, CombinedState};
pub use container::{
    create_store, reducer, DispatchFn, Reducer, StateReader, Store, StoreArg, StoreCreator,
    StoreEnhancer,
};
pub use listeners::{Listener, ListenerId, Unsubscribe};

pub(crate) use listeners::{notify_all, ListenerRegistry};
