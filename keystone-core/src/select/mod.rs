//! Memoization and derived selectors.
//!
//! - [`memoize`] wraps a function in a single-slot cache keyed by its last
//!   arguments.
//!
//! - [`create_selector`] builds a [`DerivedSelector`] from input selectors
//!   and a combiner, memoized on both the `(state, props)` pair and the
//!   inputs' outputs.
//!
//! - [`create_structured_selector`] turns a map of named selectors into one
//!   selector returning a map.
//!
//! Argument comparison is pluggable through [`ArgsEquality`]. The default,
//! [`ShallowEquality`], compares scalars by value and shared pointers by
//! identity.

mod derived;
mod equality;
mod memoize;
mod structured;

pub use derived::{create_selector, create_selector_with, Dependencies, DerivedSelector, Selector};
pub use equality::{ArgsEquality, ShallowEq, ShallowEquality, ValueEquality};
pub use memoize::{memoize, memoize_with, MemoCache, Memoized};
pub use structured::{create_structured_selector, create_structured_selector_with, Structured};
