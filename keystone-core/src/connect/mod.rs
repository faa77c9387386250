//! Binding consumers to a store.
//!
//! [`Subscription`] nodes form a tree mirroring the consumer hierarchy and
//! deliver store notifications top-down. [`Connection`] pairs one node with
//! a stateful selector and a [`View`] receiving derived props.

mod connection;
mod context;
mod subscription;

pub use connection::{ConnectOptions, Connection, MapState, View};
pub use context::{ConnectContext, SubscriptionSource};
pub use subscription::Subscription;
