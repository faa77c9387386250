//! Store
//!
//! The store owns the single authoritative state value. It can only be read
//! through [`Store::get_state`] and only be changed through
//! [`Store::dispatch`], which runs the reducer and then notifies listeners.
//!
//! # Re-entrancy
//!
//! The store is single-threaded and guards itself with flags rather than
//! locks:
//!
//! 1. While the reducer runs, every store operation fails with
//!    [`StoreError::Reentrancy`].
//!
//! 2. While listeners are being notified, `dispatch` fails the same way.
//!    Reading state and (un)subscribing stay allowed, and (un)subscribing only
//!    affects the next pass.
//!
//! 3. Work deferred to a later turn (for example a task spawned on a local
//!    executor from a middleware) dispatches normally.
//!
//! Both flags are held by drop guards, so they are cleared even if a reducer
//! or listener panics; the panic itself propagates to the caller untouched.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::action::{action_types, Action};
use super::listeners::{notify_all, Listener, ListenerRegistry, Unsubscribe};
use crate::error::{Operation, Result, StoreError};

/// Pure transition function `(state, action) -> state`.
///
/// Returning the same `Rc` means "nothing changed".
pub type Reducer<S, A> = Rc<dyn Fn(&Rc<S>, &A) -> Rc<S>>;

/// A dispatch handler: the store's own, or one produced by middleware.
pub type DispatchFn<A> = Rc<dyn Fn(A) -> Result<A>>;

/// Reads the current state of a store.
pub type StateReader<S> = Rc<dyn Fn() -> Result<Rc<S>>>;

/// Builds a store from a reducer and optional preloaded state.
pub type StoreCreator<S, A> = Box<dyn FnOnce(Reducer<S, A>, Option<S>) -> Result<Store<S, A>>>;

/// Decorates a [`StoreCreator`], e.g. to install middleware.
pub type StoreEnhancer<S, A> = Box<dyn FnOnce(StoreCreator<S, A>) -> StoreCreator<S, A>>;

/// Second positional argument of [`create_store`].
pub enum StoreArg<S, A> {
    /// Preloaded state.
    State(S),
    /// An enhancer passed in the preloaded-state position.
    Enhancer(StoreEnhancer<S, A>),
}

/// Wrap a closure as a [`Reducer`].
pub fn reducer<S, A, F>(f: F) -> Reducer<S, A>
where
    F: Fn(&Rc<S>, &A) -> Rc<S> + 'static,
{
    Rc::new(f)
}

/// Raises a flag for the lifetime of the guard.
struct FlagGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

struct StoreCore<S, A> {
    reducer: RefCell<Reducer<S, A>>,
    state: RefCell<Rc<S>>,
    listeners: RefCell<ListenerRegistry>,
    is_dispatching: Cell<bool>,
    is_notifying: Cell<bool>,
}

impl<S, A: Action> StoreCore<S, A> {
    fn get_state(&self) -> Result<Rc<S>> {
        if self.is_dispatching.get() {
            return Err(StoreError::Reentrancy(Operation::GetState));
        }
        Ok(Rc::clone(&self.state.borrow()))
    }

    fn dispatch(&self, action: A) -> Result<A> {
        action.validate()?;
        if self.is_dispatching.get() || self.is_notifying.get() {
            return Err(StoreError::Reentrancy(Operation::Dispatch));
        }

        trace!(kind = action.kind(), "dispatch");

        let reducer = Rc::clone(&self.reducer.borrow());
        let current = Rc::clone(&self.state.borrow());
        let next = {
            let _reducing = FlagGuard::raise(&self.is_dispatching);
            reducer(&current, &action)
        };
        *self.state.borrow_mut() = next;

        let snapshot = self.listeners.borrow_mut().snapshot();
        trace!(listeners = snapshot.len(), "notifying listeners");
        {
            let _notifying = FlagGuard::raise(&self.is_notifying);
            notify_all(&snapshot);
        }

        Ok(action)
    }
}

/// The state container.
///
/// `Store` is a cheap handle: clones share the same state, reducer and
/// listeners. A store produced by an enhancer such as
/// [`apply_middleware`](crate::pipeline::apply_middleware) carries the
/// enhanced dispatch; every other operation goes straight to the core.
pub struct Store<S, A> {
    core: Rc<StoreCore<S, A>>,
    dispatch: DispatchFn<A>,
}

impl<S: 'static, A: Action + 'static> Store<S, A> {
    /// Create a store whose initial state is `S::default()`.
    pub fn new<F>(reducer: F) -> Result<Self>
    where
        S: Default,
        F: Fn(&Rc<S>, &A) -> Rc<S> + 'static,
    {
        Self::build(Rc::new(reducer), S::default())
    }

    /// Create a store with preloaded state.
    pub fn with_state<F>(reducer: F, state: S) -> Result<Self>
    where
        F: Fn(&Rc<S>, &A) -> Rc<S> + 'static,
    {
        Self::build(Rc::new(reducer), state)
    }

    fn build(reducer: Reducer<S, A>, state: S) -> Result<Self> {
        let core = Rc::new(StoreCore {
            reducer: RefCell::new(reducer),
            state: RefCell::new(Rc::new(state)),
            listeners: RefCell::new(ListenerRegistry::new()),
            is_dispatching: Cell::new(false),
            is_notifying: Cell::new(false),
        });

        let base = Rc::clone(&core);
        let dispatch: DispatchFn<A> = Rc::new(move |action: A| base.dispatch(action));

        core.dispatch(A::bootstrap(action_types::INIT))?;
        Ok(Self { core, dispatch })
    }

    /// The current state.
    pub fn get_state(&self) -> Result<Rc<S>> {
        self.core.get_state()
    }

    /// Send an action through this store's dispatch chain.
    ///
    /// Returns the action that reached the end of the chain.
    pub fn dispatch(&self, action: A) -> Result<A> {
        (self.dispatch)(action)
    }

    /// A shareable handle to this store's dispatch chain.
    pub fn dispatcher(&self) -> DispatchFn<A> {
        Rc::clone(&self.dispatch)
    }

    /// Register a listener, called after every dispatch that starts later.
    pub fn subscribe<F>(&self, listener: F) -> Result<Unsubscribe>
    where
        F: Fn() + 'static,
    {
        self.subscribe_listener(Rc::new(listener))
    }

    /// Register an already shared listener.
    pub fn subscribe_listener(&self, listener: Listener) -> Result<Unsubscribe> {
        if self.core.is_dispatching.get() {
            return Err(StoreError::Reentrancy(Operation::Subscribe));
        }

        let id = self.core.listeners.borrow_mut().add(listener);
        let core: Weak<StoreCore<S, A>> = Rc::downgrade(&self.core);

        Ok(Unsubscribe::new(move || {
            let Some(core) = core.upgrade() else {
                return Ok(());
            };
            if core.is_dispatching.get() {
                return Err(StoreError::Reentrancy(Operation::Unsubscribe));
            }
            core.listeners.borrow_mut().remove(id);
            Ok(())
        }))
    }

    /// Swap the reducer and dispatch `@@INIT_REPLACE` so state is recomputed
    /// against it.
    ///
    /// Fails without touching the reducer while the store is reducing or
    /// notifying, since the replacement could not be announced. If the
    /// announcement fails anyway, the previous reducer is put back.
    pub fn replace_reducer<F>(&self, reducer: F) -> Result<()>
    where
        F: Fn(&Rc<S>, &A) -> Rc<S> + 'static,
    {
        if self.core.is_dispatching.get() || self.core.is_notifying.get() {
            return Err(StoreError::Reentrancy(Operation::ReplaceReducer));
        }

        let previous = self.core.reducer.replace(Rc::new(reducer));
        if let Err(error) = self.core.dispatch(A::bootstrap(action_types::REPLACE)) {
            *self.core.reducer.borrow_mut() = previous;
            return Err(error);
        }
        debug!("reducer replaced");
        Ok(())
    }

    /// Number of listeners registered for the next notification pass.
    pub fn listener_count(&self) -> usize {
        self.core.listeners.borrow().len()
    }

    /// Whether the reducer is currently running.
    pub fn is_dispatching(&self) -> bool {
        self.core.is_dispatching.get()
    }

    /// A state getter that does not keep the store alive.
    pub(crate) fn state_reader(&self) -> StateReader<S> {
        let core = Rc::downgrade(&self.core);
        Rc::new(move || match core.upgrade() {
            Some(core) => core.get_state(),
            None => Err(StoreError::Dropped),
        })
    }

    /// The same store with a different dispatch chain.
    pub(crate) fn with_dispatch(self, dispatch: DispatchFn<A>) -> Self {
        Self {
            core: self.core,
            dispatch,
        }
    }

    /// Whether two handles refer to the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            dispatch: Rc::clone(&self.dispatch),
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Store");
        if self.core.is_dispatching.get() {
            out.field("state", &"<dispatching>");
        } else {
            out.field("state", &self.core.state.borrow());
        }
        out.field("listener_count", &self.core.listeners.borrow().len())
            .field("is_dispatching", &self.core.is_dispatching.get())
            .finish()
    }
}

/// Create a store, optionally preloaded and/or enhanced.
///
/// An enhancer passed in the preloaded-state position with no third argument
/// is used as the enhancer. Passing an enhancer in both positions is an
/// [`StoreError::InvalidArgument`].
pub fn create_store<S, A, F>(
    reducer: F,
    preloaded: Option<StoreArg<S, A>>,
    enhancer: Option<StoreEnhancer<S, A>>,
) -> Result<Store<S, A>>
where
    S: Default + 'static,
    A: Action + 'static,
    F: Fn(&Rc<S>, &A) -> Rc<S> + 'static,
{
    let (preloaded, enhancer) = match (preloaded, enhancer) {
        (Some(StoreArg::Enhancer(_)), Some(_)) => {
            return Err(StoreError::InvalidArgument(
                "expected a single enhancer, got one in both the preloaded-state \
                 and enhancer positions"
                    .to_string(),
            ));
        }
        (Some(StoreArg::Enhancer(enhancer)), None) => (None, Some(enhancer)),
        (Some(StoreArg::State(state)), enhancer) => (Some(state), enhancer),
        (None, enhancer) => (None, enhancer),
    };

    let creator: StoreCreator<S, A> = Box::new(|reducer: Reducer<S, A>, preloaded: Option<S>| {
        Store::build(reducer, preloaded.unwrap_or_default())
    });

    let reducer: Reducer<S, A> = Rc::new(reducer);
    match enhancer {
        Some(enhance) => enhance(creator)(reducer, preloaded),
        None => creator(reducer, preloaded),
    }
}
