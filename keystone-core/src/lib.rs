//! Keystone Core
//!
//! This crate provides a synchronous, single-threaded state container in the
//! Redux style. It implements:
//!
//! - A store with strict dispatch/subscribe re-entrancy rules
//! - A middleware pipeline that intercepts every dispatched action
//! - A subscription tree delivering change notifications top-down
//! - Memoized, composable derived-value selectors
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `store`: The state container, actions, reducer combination and action
//!   creator binding
//! - `pipeline`: Function composition, `apply_middleware` and the bundled
//!   thunk and logger middleware
//! - `select`: The memoizer and derived selectors
//! - `connect`: Subscription nodes and consumer connections
//! - `error`: The error type shared by all of the above
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use keystone_core::select::{create_selector, Selector};
//! use keystone_core::store::{Action, Store};
//! use serde_json::{json, Value};
//!
//! // Create a store
//! let store = Store::new(|count: &Rc<i64>, action: &Value| match action.kind() {
//!     "INCREMENT" => Rc::new(**count + 1),
//!     _ => Rc::clone(count),
//! })
//! .unwrap();
//!
//! // Create a derived value
//! let doubled = create_selector(
//!     (|count: &Rc<i64>, _: &()| **count,),
//!     |&(count,): &(i64,)| count * 2,
//! );
//!
//! // Update the state
//! store.dispatch(json!({"kind": "INCREMENT"})).unwrap();
//! assert_eq!(doubled.select(&store.get_state().unwrap(), &()), 2);
//! ```

pub mod connect;
pub mod error;
pub mod pipeline;
pub mod select;
pub mod store;

pub use connect::{ConnectContext, ConnectOptions, Connection, Subscription, SubscriptionSource};
pub use error::{Operation, Result, StoreError};
pub use pipeline::{apply_middleware, compose, Middleware, MiddlewareApi};
pub use select::{create_selector, create_structured_selector, memoize, Selector};
pub use store::{combine_reducers, create_store, Action, Store};
