//! Integration Tests for the State Container
//!
//! These tests verify that the store, middleware, selectors and subscription
//! tree work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{json, Value};

use keystone_core::connect::{ConnectContext, ConnectOptions, Connection, Subscription};
use keystone_core::error::{Operation, StoreError};
use keystone_core::pipeline::{
    apply_middleware, compose, logger, thunk, MiddlewareApi, Stage, Thunk, ThunkAction,
};
use keystone_core::select::{create_selector, memoize, Selector};
use keystone_core::store::{
    bind_action_creators, combine_reducers, create_store, reducer, Action, ActionCreator,
    CombinedState, DispatchFn, Reducer, Store, Unsubscribe,
};

fn counter(state: &Rc<i64>, action: &Value) -> Rc<i64> {
    match action.kind() {
        "ADD" => Rc::new(**state + action["by"].as_i64().unwrap_or(1)),
        "RESET" => Rc::new(0),
        _ => Rc::clone(state),
    }
}

fn add(by: i64) -> Value {
    json!({"kind": "ADD", "by": by})
}

/// Test that the state after each dispatch is the left fold of the reducer.
#[test]
fn state_follows_reducer_fold() {
    let store = Store::new(counter).unwrap();
    let actions = vec![
        add(3),
        add(-1),
        json!({"kind": "NOOP"}),
        add(10),
        json!({"kind": "RESET"}),
        add(2),
    ];

    let mut expected = Rc::new(0);
    for action in actions {
        expected = counter(&expected, &action);
        store.dispatch(action).unwrap();
        assert_eq!(*store.get_state().unwrap(), *expected);
    }
}

/// Test that a reducer dispatching into its own store is rejected without
/// corrupting the outer dispatch.
#[test]
fn reentrant_reducer_is_rejected() {
    let slot: Rc<RefCell<Option<Store<i64, Value>>>> = Rc::new(RefCell::new(None));
    let inner_errors = Rc::new(RefCell::new(Vec::new()));

    let slot_clone = Rc::clone(&slot);
    let errors_clone = Rc::clone(&inner_errors);
    let store = Store::new(move |state: &Rc<i64>, action: &Value| {
        if action.kind() != "OUTER" {
            return Rc::clone(state);
        }
        if let Some(store) = slot_clone.borrow().as_ref() {
            errors_clone.borrow_mut().push(store.dispatch(add(100)).unwrap_err());
            errors_clone.borrow_mut().push(store.get_state().unwrap_err());
            errors_clone.borrow_mut().push(store.subscribe(|| {}).unwrap_err());
        }
        Rc::new(**state + 1)
    })
    .unwrap();
    *slot.borrow_mut() = Some(store.clone());

    store.dispatch(json!({"kind": "OUTER"})).unwrap();
    assert_eq!(*store.get_state().unwrap(), 1);

    let errors = inner_errors.borrow();
    assert!(matches!(errors[0], StoreError::Reentrancy(Operation::Dispatch)));
    assert!(matches!(errors[1], StoreError::Reentrancy(Operation::GetState)));
    assert!(matches!(errors[2], StoreError::Reentrancy(Operation::Subscribe)));
    drop(errors);

    slot.borrow_mut().take();
}

/// Test that unsubscribing mid-pass affects only future passes.
#[test]
fn unsubscribe_during_notification() {
    let store = Store::new(counter).unwrap();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let handles: Rc<RefCell<Vec<Unsubscribe>>> = Rc::new(RefCell::new(Vec::new()));

    let calls_a = Rc::clone(&calls);
    let handles_a = Rc::clone(&handles);
    let a = store
        .subscribe(move || {
            calls_a.borrow_mut().push("a");
            // Remove "b", which is still pending in this pass.
            handles_a.borrow()[0].unsubscribe().unwrap();
        })
        .unwrap();

    let calls_b = Rc::clone(&calls);
    let b = store.subscribe(move || calls_b.borrow_mut().push("b")).unwrap();
    handles.borrow_mut().push(b);

    store.dispatch(add(1)).unwrap();
    assert_eq!(*calls.borrow(), vec!["a", "b"]);

    store.dispatch(add(1)).unwrap();
    assert_eq!(*calls.borrow(), vec!["a", "b", "a"]);

    a.unsubscribe().unwrap();
    a.unsubscribe().unwrap();
    store.dispatch(add(1)).unwrap();
    assert_eq!(calls.borrow().len(), 3);
}

/// Test that listeners registered during a pass wait for the next one.
#[test]
fn subscribe_during_notification() {
    let store = Store::new(counter).unwrap();
    let late_calls = Rc::new(Cell::new(0));

    let store_clone = store.clone();
    let late_clone = Rc::clone(&late_calls);
    let registered = Rc::new(Cell::new(false));
    store
        .subscribe(move || {
            if !registered.replace(true) {
                let late = Rc::clone(&late_clone);
                store_clone
                    .subscribe(move || late.set(late.get() + 1))
                    .unwrap();
            }
        })
        .unwrap();

    store.dispatch(add(1)).unwrap();
    assert_eq!(late_calls.get(), 0);
    store.dispatch(add(1)).unwrap();
    assert_eq!(late_calls.get(), 1);
}

/// Test that dispatching from a listener synchronously is rejected.
#[test]
fn listener_dispatch_is_rejected() {
    let store = Store::new(counter).unwrap();
    let outcome = Rc::new(RefCell::new(None));

    let store_clone = store.clone();
    let outcome_clone = Rc::clone(&outcome);
    store
        .subscribe(move || {
            if outcome_clone.borrow().is_none() {
                *outcome_clone.borrow_mut() = Some(store_clone.dispatch(add(1)));
            }
        })
        .unwrap();

    store.dispatch(add(1)).unwrap();
    assert!(matches!(
        outcome.borrow().as_ref(),
        Some(Err(StoreError::Reentrancy(Operation::Dispatch)))
    ));
    assert_eq!(*store.get_state().unwrap(), 1);
}

/// Test that composing nothing is the identity.
#[test]
fn empty_compose_is_identity() {
    let value = Rc::new(7);
    let out = compose::<Rc<i32>>(Vec::new())(Rc::clone(&value));
    assert!(Rc::ptr_eq(&out, &value));

    let stages: Vec<Stage<i32>> = vec![Box::new(|x| x + 1), Box::new(|x| x * 10)];
    assert_eq!(compose(stages)(1), 11);
}

/// Test memoization call counts.
#[test]
fn memoize_counts_calls() {
    let calls = Rc::new(Cell::new(0));
    let calls_clone = Rc::clone(&calls);
    let add = memoize(move |&(a, b): &(i32, i32)| {
        calls_clone.set(calls_clone.get() + 1);
        a + b
    });

    add.call((1, 2));
    add.call((1, 2));
    assert_eq!(calls.get(), 1);

    add.call((1, 3));
    assert_eq!(calls.get(), 2);
}

#[derive(Debug, Clone, Default)]
struct Todos {
    items: Rc<Vec<String>>,
    filter: Rc<String>,
    edits: u32,
}

/// Test that the combiner does not rerun while its inputs are unchanged.
#[test]
fn derived_selector_skips_unchanged_inputs() {
    let visible = create_selector(
        (
            |todos: &Rc<Todos>, _: &()| Rc::clone(&todos.items),
            |todos: &Rc<Todos>, _: &()| Rc::clone(&todos.filter),
        ),
        |(items, filter): &(Rc<Vec<String>>, Rc<String>)| -> Vec<String> {
            items
                .iter()
                .filter(|item| item.contains(filter.as_str()))
                .cloned()
                .collect()
        },
    );

    let base = Todos {
        items: Rc::new(vec!["write".to_string(), "read".to_string()]),
        filter: Rc::new("r".to_string()),
        edits: 0,
    };
    assert_eq!(visible.select(&Rc::new(base.clone()), &()).len(), 2);

    for edits in 1..5 {
        let touched = Todos {
            edits,
            ..base.clone()
        };
        visible.select(&Rc::new(touched), &());
    }
    assert_eq!(visible.recomputations(), 1);

    let filtered = Todos {
        filter: Rc::new("w".to_string()),
        ..base
    };
    assert_eq!(visible.select(&Rc::new(filtered), &()), vec!["write".to_string()]);
    assert_eq!(visible.recomputations(), 2);
}

/// Test top-down delivery through a three-level subscription chain.
#[test]
fn subscription_tree_notifies_top_down() {
    let store = Store::new(counter).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    let node = |parent: Option<&Rc<Subscription<i64, Value>>>, name: &'static str| {
        let log = Rc::clone(&log);
        Subscription::new(store.clone(), parent, move |node: &Subscription<i64, Value>| {
            log.borrow_mut().push(name);
            node.notify_nested_subs();
        })
    };
    let root = node(None, "root");
    let mid = node(Some(&root), "mid");
    let leaf = node(Some(&mid), "leaf");

    root.try_subscribe().unwrap();
    mid.try_subscribe().unwrap();
    leaf.try_subscribe().unwrap();

    for by in 1..=3 {
        log.borrow_mut().clear();
        store.dispatch(add(by)).unwrap();
        assert_eq!(*log.borrow(), vec!["root", "mid", "leaf"]);
    }

    mid.try_unsubscribe().unwrap();
    log.borrow_mut().clear();
    store.dispatch(add(1)).unwrap();
    assert_eq!(*log.borrow(), vec!["root"]);
}

#[derive(Debug, Clone)]
enum Msg {
    Reserved(&'static str),
    Inc,
    Rename(String),
    Run(Thunk<CombinedState<Value>, Msg>),
}

impl Action for Msg {
    fn kind(&self) -> &str {
        match self {
            Msg::Reserved(kind) => kind,
            Msg::Inc => "INC",
            Msg::Rename(_) => "RENAME",
            Msg::Run(_) => "THUNK",
        }
    }

    fn bootstrap(kind: &'static str) -> Self {
        Msg::Reserved(kind)
    }
}

impl ThunkAction<CombinedState<Value>> for Msg {
    fn into_thunk(self) -> Result<Thunk<CombinedState<Value>, Msg>, Msg> {
        match self {
            Msg::Run(thunk) => Ok(thunk),
            other => Err(other),
        }
    }
}

fn slices() -> IndexMap<String, Reducer<Value, Msg>> {
    let mut reducers: IndexMap<String, Reducer<Value, Msg>> = IndexMap::new();
    reducers.insert(
        "count".to_string(),
        reducer(|state: &Rc<Value>, action: &Msg| match action {
            Msg::Inc => Rc::new(json!(state.as_i64().unwrap_or(0) + 1)),
            _ => Rc::clone(state),
        }),
    );
    reducers.insert(
        "name".to_string(),
        reducer(|state: &Rc<Value>, action: &Msg| match action {
            Msg::Rename(name) => Rc::new(json!(name)),
            _ => Rc::clone(state),
        }),
    );
    reducers
}

/// Test that combined state keeps its identity for unrelated actions.
#[test]
fn combined_state_identity_is_preserved() {
    let store = Store::new(combine_reducers(slices())).unwrap();
    let before = store.get_state().unwrap();

    store.dispatch(Msg::Reserved("UNKNOWN")).unwrap();
    assert!(Rc::ptr_eq(&before, &store.get_state().unwrap()));

    store.dispatch(Msg::Inc).unwrap();
    let after = store.get_state().unwrap();
    assert!(!Rc::ptr_eq(&before, &after));
    assert!(Rc::ptr_eq(&before["name"], &after["name"]));
    assert_eq!(*after["count"], json!(1));
}

/// Test that a bound creator dispatches exactly once and returns dispatch's
/// result.
#[test]
fn bound_creators_forward_to_dispatch() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    let dispatch: DispatchFn<Value> = Rc::new(move |action: Value| {
        seen_clone.borrow_mut().push(action.clone());
        Ok(json!({"kind": "ACK", "of": action["kind"]}))
    });

    let mut creators: IndexMap<String, ActionCreator<(), Value>> = IndexMap::new();
    creators.insert("inc".to_string(), Rc::new(|_: ()| json!({"kind": "INC"})));
    let bound = bind_action_creators(creators, dispatch);

    let returned = bound["inc"](()).unwrap();
    assert_eq!(*seen.borrow(), vec![json!({"kind": "INC"})]);
    assert_eq!(returned, json!({"kind": "ACK", "of": "INC"}));
}

/// Test a full application: middleware, combined reducers, selectors and
/// nested connections.
#[test]
fn connected_application() {
    let store = create_store(
        combine_reducers(slices()),
        None,
        Some(apply_middleware(vec![thunk(), logger()])),
    )
    .unwrap();

    let header_log = Rc::new(RefCell::new(Vec::new()));
    let badge_log = Rc::new(RefCell::new(Vec::new()));

    let name_selector = create_selector(
        (|state: &Rc<CombinedState<Value>>, _: &()| Rc::clone(&state["name"]),),
        |(name,): &(Rc<Value>,)| name.as_str().unwrap_or("anonymous").to_string(),
    );
    let header_log_clone = Rc::clone(&header_log);
    let header = Connection::new(
        ConnectContext::root(store.clone()).into(),
        move |state: &Rc<CombinedState<Value>>, props: &()| -> anyhow::Result<String> {
            Ok(name_selector.select(state, props))
        },
        (),
        move |props: keystone_core::Result<Rc<String>>| {
            header_log_clone.borrow_mut().push(props.map(|p| (*p).clone()).unwrap_or_default());
        },
        ConnectOptions::default(),
    )
    .unwrap();

    let badge_log_clone = Rc::clone(&badge_log);
    let badge = Connection::new(
        header.child_context().unwrap().into(),
        |state: &Rc<CombinedState<Value>>, _: &()| -> anyhow::Result<i64> {
            state["count"]
                .as_i64()
                .ok_or_else(|| anyhow::anyhow!("count is not set"))
        },
        (),
        move |props: keystone_core::Result<Rc<i64>>| {
            badge_log_clone.borrow_mut().push(props.map(|p| *p).map_err(|e| e.to_string()));
        },
        ConnectOptions::default(),
    )
    .unwrap();

    badge.mount().unwrap();
    header.mount().unwrap();
    assert_eq!(
        *badge_log.borrow(),
        vec![Err("user function failed: count is not set".to_string())]
    );

    store
        .dispatch(Msg::Run(Thunk::new(
            |api: &MiddlewareApi<CombinedState<Value>, Msg>, _: &()| {
                api.dispatch(Msg::Rename("ada".to_string()))?;
                api.dispatch(Msg::Inc)
            },
        )))
        .unwrap();

    assert_eq!(*header_log.borrow(), vec!["anonymous".to_string(), "ada".to_string()]);
    assert_eq!(badge_log.borrow().last(), Some(&Ok(1)));

    badge.unmount().unwrap();
    header.unmount().unwrap();
    store.dispatch(Msg::Inc).unwrap();
    assert_eq!(header_log.borrow().len(), 2);
    assert_eq!(store.listener_count(), 0);
}

/// Test that a thunk can dispatch from a task on a later turn.
#[tokio::test(flavor = "current_thread")]
async fn thunk_dispatches_from_spawned_task() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let store = create_store(
                combine_reducers(slices()),
                None,
                Some(apply_middleware(vec![thunk()])),
            )
            .unwrap();

            let pending = Rc::new(RefCell::new(None));
            let pending_clone = Rc::clone(&pending);
            store
                .dispatch(Msg::Run(Thunk::new(
                    move |api: &MiddlewareApi<CombinedState<Value>, Msg>, _: &()| {
                        let later = api.clone();
                        *pending_clone.borrow_mut() = Some(tokio::task::spawn_local(async move {
                            later.dispatch(Msg::Rename("later".to_string()))
                        }));
                        api.dispatch(Msg::Inc)
                    },
                )))
                .unwrap();

            let state = store.get_state().unwrap();
            assert_eq!(*state["count"], json!(1));
            assert!(state["name"].is_null());

            let task = pending.borrow_mut().take().unwrap();
            let dispatched = task.await.unwrap().unwrap();
            assert!(matches!(dispatched, Msg::Rename(_)));
            assert_eq!(*store.get_state().unwrap()["name"], json!("later"));
        })
        .await;
}
