//! Listener registry shared by the store and by subscription nodes.
//!
//! Notification iterates a snapshot while registration mutates a separate
//! collection. The two start out as the same `Rc`; the first mutation after a
//! snapshot was taken clones the list, so a pass in flight always walks a
//! stable array even when listeners (un)register other listeners.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// A change callback. Takes no arguments and returns nothing.
pub type Listener = Rc<dyn Fn()>;

/// Key of one registration inside a [`ListenerRegistry`].
///
/// Drawn from a process-wide counter rather than per registry, so an
/// [`Unsubscribe`] handle that outlives a `clear()` can never remove a
/// listener registered afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(0);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed))
    }
}

type Entries = Rc<Vec<(ListenerId, Listener)>>;

/// Ordered listener collection with copy-on-write snapshots.
pub(crate) struct ListenerRegistry {
    current: Entries,
    next: Entries,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        let current: Entries = Rc::new(Vec::new());
        Self {
            next: Rc::clone(&current),
            current,
        }
    }

    fn ensure_can_mutate_next(&mut self) {
        if Rc::ptr_eq(&self.next, &self.current) {
            self.next = Rc::new(self.current.as_ref().clone());
        }
    }

    /// Register a listener for every pass that starts after this call.
    pub(crate) fn add(&mut self, listener: Listener) -> ListenerId {
        self.ensure_can_mutate_next();
        let id = ListenerId::next();
        Rc::make_mut(&mut self.next).push((id, listener));
        id
    }

    /// Remove a listener from future passes. Returns whether it was present.
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        self.ensure_can_mutate_next();
        let next = Rc::make_mut(&mut self.next);
        match next.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                next.remove(index);
                true
            }
            None => false,
        }
    }

    /// Freeze the current registrations for a notification pass.
    pub(crate) fn snapshot(&mut self) -> Entries {
        self.current = Rc::clone(&self.next);
        Rc::clone(&self.current)
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn len(&self) -> usize {
        self.next.len()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Call every listener of a snapshot in registration order.
pub(crate) fn notify_all(snapshot: &[(ListenerId, Listener)]) {
    for (_, listener) in snapshot {
        listener();
    }
}

/// Handle returned by `subscribe`.
///
/// Calling [`Unsubscribe::unsubscribe`] removes the listener from all future
/// notification passes. Repeated calls are no-ops. Dropping the handle does
/// not unsubscribe.
pub struct Unsubscribe {
    active: Cell<bool>,
    detach: Box<dyn Fn() -> Result<()>>,
}

impl Unsubscribe {
    pub(crate) fn new<F>(detach: F) -> Self
    where
        F: Fn() -> Result<()> + 'static,
    {
        Self {
            active: Cell::new(true),
            detach: Box::new(detach),
        }
    }

    /// Remove the listener. The handle stays armed if removal fails.
    pub fn unsubscribe(&self) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        (self.detach)()?;
        self.active.set(false);
        Ok(())
    }

    /// Whether the listener is still registered through this handle.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.active.get())
            .finish()
    }
}
