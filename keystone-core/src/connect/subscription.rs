//! Subscription Tree
//!
//! A [`Subscription`] is one consumer's position in the notification
//! hierarchy. A node attaches either directly to the store or to its parent
//! node, so the store's flat listener list becomes a top-down cascade:
//!
//! ```text
//!   store ──> root ──> mid ──> leaf
//! ```
//!
//! The store only calls `root`. `root` reacts to the change and then calls
//! [`Subscription::notify_nested_subs`], which calls `mid`, and so on. A
//! child therefore never observes a state older than the one its ancestors
//! already reacted to.
//!
//! The parent is held weakly. A child never keeps its parent alive; if the
//! parent is gone by the time the child attaches, the child attaches to the
//! store instead.
//!
//! Dropping an attached node detaches it, so a node that goes away without
//! `try_unsubscribe` leaves nothing behind in its source's registry.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{notify_all, Action, Listener, ListenerRegistry, Store, Unsubscribe};

/// A node in the subscription tree.
pub struct Subscription<S, A> {
    store: Store<S, A>,
    parent: Option<Weak<Subscription<S, A>>>,
    /// Registered with the parent (or store) while attached.
    handler: Listener,
    children: Rc<RefCell<ListenerRegistry>>,
    detach: RefCell<Option<Unsubscribe>>,
}

impl<S: 'static, A: Action + 'static> Subscription<S, A> {
    /// Create a detached node.
    ///
    /// `on_state_change` runs whenever the node's source notifies it, and
    /// receives the node itself so it can cascade to children once it has
    /// finished reacting.
    pub fn new<F>(
        store: Store<S, A>,
        parent: Option<&Rc<Subscription<S, A>>>,
        on_state_change: F,
    ) -> Rc<Self>
    where
        F: Fn(&Subscription<S, A>) + 'static,
    {
        let parent = parent.map(Rc::downgrade);
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this = Weak::clone(this);
            let handler: Listener = Rc::new(move || {
                if let Some(node) = this.upgrade() {
                    on_state_change(&node);
                }
            });
            Self {
                store,
                parent,
                handler,
                children: Rc::new(RefCell::new(ListenerRegistry::new())),
                detach: RefCell::new(None),
            }
        })
    }

    /// A node that only forwards notifications to its children.
    pub fn relay(store: Store<S, A>, parent: Option<&Rc<Subscription<S, A>>>) -> Rc<Self> {
        Self::new(store, parent, |node: &Subscription<S, A>| {
            node.notify_nested_subs()
        })
    }

    /// Attach to the parent or store. No-op if already attached.
    pub fn try_subscribe(&self) -> Result<()> {
        if self.is_subscribed() {
            return Ok(());
        }

        let listener = Rc::clone(&self.handler);
        let handle = match &self.parent {
            None => self.store.subscribe_listener(listener)?,
            Some(parent) => match parent.upgrade() {
                Some(parent) => parent.add_nested_sub(listener)?,
                None => {
                    warn!("parent subscription dropped, attaching to store");
                    self.store.subscribe_listener(listener)?
                }
            },
        };

        *self.detach.borrow_mut() = Some(handle);
        debug!(nested = self.parent.is_some(), "subscription attached");
        Ok(())
    }

    /// Detach from the source and drop every child registration. No-op if
    /// not attached.
    pub fn try_unsubscribe(&self) -> Result<()> {
        let Some(handle) = self.detach.borrow_mut().take() else {
            return Ok(());
        };

        if let Err(error) = handle.unsubscribe() {
            *self.detach.borrow_mut() = Some(handle);
            return Err(error);
        }

        self.children.borrow_mut().clear();
        debug!("subscription detached");
        Ok(())
    }

    /// Register a child listener, attaching this node first if needed.
    pub fn add_nested_sub(&self, listener: Listener) -> Result<Unsubscribe> {
        self.try_subscribe()?;

        let id = self.children.borrow_mut().add(listener);
        let children = Rc::downgrade(&self.children);
        Ok(Unsubscribe::new(move || {
            if let Some(children) = children.upgrade() {
                children.borrow_mut().remove(id);
            }
            Ok(())
        }))
    }

    /// Call every child registered before this call, in registration order.
    pub fn notify_nested_subs(&self) {
        let snapshot = self.children.borrow_mut().snapshot();
        notify_all(&snapshot);
    }

    pub fn is_subscribed(&self) -> bool {
        self.detach.borrow().is_some()
    }

    pub fn nested_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn store(&self) -> &Store<S, A> {
        &self.store
    }
}

impl<S, A> Drop for Subscription<S, A> {
    fn drop(&mut self) {
        let Some(handle) = self.detach.get_mut().take() else {
            return;
        };
        if let Err(error) = handle.unsubscribe() {
            warn!(%error, "dropped subscription could not detach");
        }
    }
}

impl<S, A> fmt::Debug for Subscription<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscribed", &self.detach.borrow().is_some())
            .field("nested", &self.children.borrow().len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::cell::Cell;

    fn counter(state: &Rc<i64>, action: &Value) -> Rc<i64> {
        match action.kind() {
            "ADD" => Rc::new(**state + 1),
            _ => Rc::clone(state),
        }
    }

    fn logging(
        store: &Store<i64, Value>,
        parent: Option<&Rc<Subscription<i64, Value>>>,
        log: &Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
    ) -> Rc<Subscription<i64, Value>> {
        let log = Rc::clone(log);
        Subscription::new(store.clone(), parent, move |node: &Subscription<i64, Value>| {
            log.borrow_mut().push(name);
            node.notify_nested_subs();
        })
    }

    #[test]
    fn cascade_is_top_down() {
        let store = Store::new(counter).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        let root = logging(&store, None, &log, "root");
        let mid = logging(&store, Some(&root), &log, "mid");
        let leaf = logging(&store, Some(&mid), &log, "leaf");

        // Attaching the leaf attaches every ancestor first.
        leaf.try_subscribe().unwrap();
        assert!(root.is_subscribed() && mid.is_subscribed());
        assert_eq!(store.listener_count(), 1);

        for _ in 0..3 {
            log.borrow_mut().clear();
            store.dispatch(json!({"kind": "ADD"})).unwrap();
            assert_eq!(*log.borrow(), vec!["root", "mid", "leaf"]);
        }
    }

    #[test]
    fn attach_and_detach_are_idempotent() {
        let store = Store::new(counter).unwrap();
        let node = Subscription::relay(store.clone(), None);

        node.try_subscribe().unwrap();
        node.try_subscribe().unwrap();
        assert_eq!(store.listener_count(), 1);

        node.try_unsubscribe().unwrap();
        node.try_unsubscribe().unwrap();
        assert!(!node.is_subscribed());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn detaching_drops_children() {
        let store = Store::new(counter).unwrap();
        let calls = Rc::new(Cell::new(0));
        let parent = Subscription::relay(store.clone(), None);

        let calls_clone = Rc::clone(&calls);
        let handle = parent
            .add_nested_sub(Rc::new(move || calls_clone.set(calls_clone.get() + 1)))
            .unwrap();
        assert_eq!(parent.nested_count(), 1);

        parent.try_unsubscribe().unwrap();
        assert_eq!(parent.nested_count(), 0);
        handle.unsubscribe().unwrap();

        parent.try_subscribe().unwrap();
        store.dispatch(json!({"kind": "ADD"})).unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn child_added_during_cascade_waits_for_next_pass() {
        let store = Store::new(counter).unwrap();
        let parent = Subscription::relay(store.clone(), None);
        let late_calls = Rc::new(Cell::new(0));

        let parent_weak = Rc::downgrade(&parent);
        let late_clone = Rc::clone(&late_calls);
        let added = Rc::new(Cell::new(false));
        parent
            .add_nested_sub(Rc::new(move || {
                if added.replace(true) {
                    return;
                }
                if let Some(parent) = parent_weak.upgrade() {
                    let late = Rc::clone(&late_clone);
                    let handle = parent
                        .add_nested_sub(Rc::new(move || late.set(late.get() + 1)))
                        .unwrap();
                    assert!(handle.is_active());
                }
            }))
            .unwrap();

        store.dispatch(json!({"kind": "ADD"})).unwrap();
        assert_eq!(late_calls.get(), 0);
        store.dispatch(json!({"kind": "ADD"})).unwrap();
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn dropping_attached_nodes_detaches_them() {
        let store = Store::new(counter).unwrap();
        let root = Subscription::relay(store.clone(), None);

        let nodes: Vec<_> = (0..10)
            .map(|_| {
                let node = Subscription::relay(store.clone(), None);
                node.try_subscribe().unwrap();
                node
            })
            .collect();
        let children: Vec<_> = (0..10)
            .map(|_| {
                let node = Subscription::relay(store.clone(), Some(&root));
                node.try_subscribe().unwrap();
                node
            })
            .collect();
        assert_eq!(store.listener_count(), 11);
        assert_eq!(root.nested_count(), 10);

        drop(nodes);
        drop(children);
        assert_eq!(store.listener_count(), 1);
        assert_eq!(root.nested_count(), 0);

        drop(root);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn dropped_parent_falls_back_to_store() {
        let store = Store::new(counter).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        let parent = logging(&store, None, &log, "parent");
        let child = logging(&store, Some(&parent), &log, "child");
        drop(parent);

        child.try_subscribe().unwrap();
        assert_eq!(store.listener_count(), 1);
        store.dispatch(json!({"kind": "ADD"})).unwrap();
        assert_eq!(*log.borrow(), vec!["child"]);
    }
}
