//! Logging middleware built on `tracing`.

use std::fmt::Debug;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::middleware::{DispatchTransformer, Middleware, MiddlewareApi};
use crate::store::{Action, DispatchFn};

/// Emit a `debug` event per action and a `trace` event with the resulting
/// state. Failed dispatches are reported at `warn`.
pub fn logger<S, A>() -> Middleware<S, A>
where
    S: Debug + 'static,
    A: Action + 'static,
{
    Box::new(|api: &MiddlewareApi<S, A>| -> DispatchTransformer<A> {
        let api = api.clone();
        Box::new(move |next: DispatchFn<A>| -> DispatchFn<A> {
            Rc::new(move |action: A| {
                let kind = action.kind().to_string();
                debug!(kind = %kind, "action");

                let result = next(action);
                match &result {
                    Ok(_) => {
                        if let Ok(state) = api.get_state() {
                            trace!(kind = %kind, state = ?state, "next state");
                        }
                    }
                    Err(error) => warn!(kind = %kind, %error, "dispatch failed"),
                }
                result
            })
        })
    })
}
