//! Middleware Pipeline
//!
//! This module wraps a store's dispatch with an ordered chain of interceptor
//! stages. Each stage may forward an action, transform it, swallow it, or
//! hold on to the dispatch function and use it later.
//!
//! # Flow
//!
//! ```text
//! caller -> stage 1 -> stage 2 -> ... -> stage N -> store dispatch
//! ```
//!
//! Stages are plain closures:
//!
//! ```rust,ignore
//! let stage: Middleware<State, Value> = Box::new(|api| {
//!     Box::new(move |next| Rc::new(move |action| next(action)))
//! });
//! ```

mod compose;
mod logger;
mod middleware;
mod thunk;

pub use compose::{compose, Stage};
pub use logger::logger;
pub use middleware::{apply_middleware, DispatchTransformer, Middleware, MiddlewareApi};
pub use thunk::{thunk, thunk_with_extra, Thunk, ThunkAction};
