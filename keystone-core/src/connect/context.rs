//! Where a connection finds its store and parent subscription.

use std::fmt;
use std::rc::Rc;

use super::subscription::Subscription;
use crate::store::Store;

/// Store and subscription handed implicitly down the consumer hierarchy.
pub struct ConnectContext<S, A> {
    pub store: Store<S, A>,
    /// The nearest ancestor's subscription, or `None` at the root.
    pub subscription: Option<Rc<Subscription<S, A>>>,
}

impl<S, A> ConnectContext<S, A> {
    /// Context for the top of a hierarchy. Connections created from it
    /// subscribe directly to the store.
    pub fn root(store: Store<S, A>) -> Self {
        Self {
            store,
            subscription: None,
        }
    }
}

impl<S, A> Clone for ConnectContext<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            subscription: self.subscription.clone(),
        }
    }
}

impl<S, A> fmt::Debug for ConnectContext<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectContext")
            .field("nested", &self.subscription.is_some())
            .finish()
    }
}

/// How a connection obtains its store. The two modes do not mix: the parent
/// subscription always comes from the same place as the store.
pub enum SubscriptionSource<S, A> {
    /// Take both from the surrounding context.
    Context(ConnectContext<S, A>),
    /// Take both from explicit parameters.
    Explicit {
        store: Store<S, A>,
        parent: Option<Rc<Subscription<S, A>>>,
    },
}

impl<S, A> SubscriptionSource<S, A> {
    pub fn is_explicit(&self) -> bool {
        matches!(self, SubscriptionSource::Explicit { .. })
    }

    pub(crate) fn into_parts(self) -> (Store<S, A>, Option<Rc<Subscription<S, A>>>) {
        match self {
            SubscriptionSource::Context(context) => (context.store, context.subscription),
            SubscriptionSource::Explicit { store, parent } => (store, parent),
        }
    }
}

impl<S, A> From<ConnectContext<S, A>> for SubscriptionSource<S, A> {
    fn from(context: ConnectContext<S, A>) -> Self {
        SubscriptionSource::Context(context)
    }
}
