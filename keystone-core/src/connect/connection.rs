//! Consumer binding
//!
//! A [`Connection`] binds one consuming unit (a view, a widget, a report)
//! to the store. It owns a stateful selector and one [`Subscription`].
//!
//! # Lifecycle
//!
//! 1. `new` runs the selector once and creates the subscription, but does
//!    not attach it. A connection that is never mounted never receives
//!    notifications.
//!
//! 2. `mount` attaches the subscription and pushes fresh props to the view
//!    if they changed since construction.
//!
//! 3. On every store change the selector reruns. Changed props are rendered
//!    into the view before nested connections are notified; unchanged props
//!    cascade to nested connections immediately.
//!
//! 4. `unmount` detaches exactly once and releases the store and the
//!    subscription. Later notifications and reruns are no-ops.
//!
//! Selector failures are not raised from the notification pass. They are
//! stored and returned by [`Connection::render`], so only the failing
//! consumer observes them and its siblings are still notified.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tracing::{debug, warn};

use super::context::{ConnectContext, SubscriptionSource};
use super::subscription::Subscription;
use crate::error::{Result, StoreError};
use crate::store::{Action, Store};

/// Application selector: derives a consumer's props from the state and its
/// own props.
pub type MapState<S, P, R> = Rc<dyn Fn(&Rc<S>, &P) -> anyhow::Result<R>>;

/// Receives rendered props.
pub trait View<R> {
    fn update(&self, props: Result<Rc<R>>);
}

impl<R, F> View<R> for F
where
    F: Fn(Result<Rc<R>>),
{
    fn update(&self, props: Result<Rc<R>>) {
        self(props)
    }
}

/// Connection configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    /// Subscribe to store changes. When false the selector only reruns on
    /// `mount` and `receive_props`, and nested connections attach to the
    /// nearest subscribed ancestor instead.
    pub should_handle_state_changes: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            should_handle_state_changes: true,
        }
    }
}

struct SelectorState<R> {
    props: Option<Rc<R>>,
    error: Option<Arc<anyhow::Error>>,
    should_update: bool,
}

/// A consumer bound to a store.
pub struct Connection<S, A, P, R> {
    store: RefCell<Option<Store<S, A>>>,
    parent: RefCell<Option<Rc<Subscription<S, A>>>>,
    subscription: RefCell<Option<Rc<Subscription<S, A>>>>,
    explicit: bool,
    selector: MapState<S, P, R>,
    own_props: RefCell<P>,
    selected: RefCell<SelectorState<R>>,
    view: Box<dyn View<R>>,
    render_count: Cell<usize>,
    unmounted: Cell<bool>,
}

impl<S, A, P, R> Connection<S, A, P, R>
where
    S: 'static,
    A: Action + 'static,
    P: 'static,
    R: PartialEq + 'static,
{
    pub fn new<F, V>(
        source: SubscriptionSource<S, A>,
        selector: F,
        own_props: P,
        view: V,
        options: ConnectOptions,
    ) -> Result<Rc<Self>>
    where
        F: Fn(&Rc<S>, &P) -> anyhow::Result<R> + 'static,
        V: View<R> + 'static,
    {
        let explicit = source.is_explicit();
        let (store, parent) = source.into_parts();

        let connection = Rc::new_cyclic(|this: &Weak<Self>| {
            let subscription = options.should_handle_state_changes.then(|| {
                let this = Weak::clone(this);
                Subscription::new(
                    store.clone(),
                    parent.as_ref(),
                    move |_: &Subscription<S, A>| {
                        if let Some(connection) = this.upgrade() {
                            if let Err(error) = connection.on_state_change() {
                                warn!(%error, "connection update failed");
                            }
                        }
                    },
                )
            });

            Self {
                store: RefCell::new(Some(store)),
                parent: RefCell::new(parent),
                subscription: RefCell::new(subscription),
                explicit,
                selector: Rc::new(selector),
                own_props: RefCell::new(own_props),
                selected: RefCell::new(SelectorState {
                    props: None,
                    error: None,
                    should_update: false,
                }),
                view: Box::new(view),
                render_count: Cell::new(0),
                unmounted: Cell::new(false),
            }
        });

        connection.run()?;
        debug!(explicit, "connection created");
        Ok(connection)
    }

    /// Attach to the store and push props to the view if they changed.
    pub fn mount(&self) -> Result<()> {
        if self.unmounted.get() {
            return Ok(());
        }

        if let Some(subscription) = self.subscription() {
            subscription.try_subscribe()?;
        }
        debug!("connection mounted");

        if self.run()? {
            self.render_to_view();
        }
        Ok(())
    }

    /// Replace the connection's own props and rerun the selector.
    pub fn receive_props(&self, props: P) -> Result<()> {
        *self.own_props.borrow_mut() = props;
        if self.run()? {
            self.render_to_view();
        }
        Ok(())
    }

    /// React to a store notification, then cascade to nested connections.
    pub fn on_state_change(&self) -> Result<()> {
        let changed = self.run()?;
        if changed {
            self.render_to_view();
        }
        self.notify_nested();
        Ok(())
    }

    /// Take the latest props, or the selector's pending failure.
    pub fn render(&self) -> Result<Rc<R>> {
        self.render_count.set(self.render_count.get() + 1);

        let mut selected = self.selected.borrow_mut();
        selected.should_update = false;
        if let Some(error) = &selected.error {
            return Err(StoreError::UserFunction(Arc::clone(error)));
        }
        selected.props.clone().ok_or(StoreError::Dropped)
    }

    /// Detach from the store and release it. Idempotent.
    pub fn unmount(&self) -> Result<()> {
        if self.unmounted.replace(true) {
            return Ok(());
        }

        let subscription = self.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            if let Err(error) = subscription.try_unsubscribe() {
                *self.subscription.borrow_mut() = Some(subscription);
                self.unmounted.set(false);
                return Err(error);
            }
        }

        self.store.borrow_mut().take();
        self.parent.borrow_mut().take();
        debug!(renders = self.render_count.get(), "connection unmounted");
        Ok(())
    }

    /// Context for connections nested under this one.
    ///
    /// In context mode nested connections attach to this connection's
    /// subscription (or, if it has none, to this connection's parent).
    /// Explicit-mode connections contribute no context, so nested
    /// connections keep using the surrounding one. Returns `None` after
    /// unmount.
    pub fn child_context(&self) -> Option<ConnectContext<S, A>> {
        if self.explicit {
            return None;
        }
        let store = self.store.borrow().clone()?;
        Some(ConnectContext {
            store,
            subscription: self.subscription().or_else(|| self.parent.borrow().clone()),
        })
    }

    /// Source for a nested connection configured with explicit parameters.
    pub fn explicit_source(&self) -> Option<SubscriptionSource<S, A>> {
        let store = self.store.borrow().clone()?;
        Some(SubscriptionSource::Explicit {
            store,
            parent: self.subscription().or_else(|| self.parent.borrow().clone()),
        })
    }

    pub fn subscription(&self) -> Option<Rc<Subscription<S, A>>> {
        self.subscription.borrow().clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription()
            .map(|subscription| subscription.is_subscribed())
            .unwrap_or(false)
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted.get()
    }

    /// Whether props changed since the last render.
    pub fn should_update(&self) -> bool {
        self.selected.borrow().should_update
    }

    pub fn render_count(&self) -> usize {
        self.render_count.get()
    }

    /// Rerun the selector. Returns whether a render is pending.
    fn run(&self) -> Result<bool> {
        if self.unmounted.get() {
            return Ok(false);
        }
        let Some(store) = self.store.borrow().clone() else {
            return Ok(false);
        };

        let state = store.get_state()?;
        let outcome = (self.selector)(&state, &self.own_props.borrow());

        let mut selected = self.selected.borrow_mut();
        match outcome {
            Ok(next) => {
                if selected.error.is_some() || selected.props.as_deref() != Some(&next) {
                    selected.props = Some(Rc::new(next));
                    selected.error = None;
                    selected.should_update = true;
                }
            }
            Err(error) => {
                debug!(%error, "selector failed");
                selected.error = Some(Arc::new(error));
                selected.should_update = true;
            }
        }
        Ok(selected.should_update)
    }

    fn render_to_view(&self) {
        let props = self.render();
        self.view.update(props);
    }

    fn notify_nested(&self) {
        if let Some(subscription) = self.subscription() {
            subscription.notify_nested_subs();
        }
    }
}
