//! Error types for the store, the middleware pipeline and connected consumers.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Store operation that was attempted at a point where it is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetState,
    Dispatch,
    Subscribe,
    Unsubscribe,
    ReplaceReducer,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GetState => "get_state",
            Operation::Dispatch => "dispatch",
            Operation::Subscribe => "subscribe",
            Operation::Unsubscribe => "unsubscribe",
            Operation::ReplaceReducer => "replace_reducer",
        };
        f.write_str(name)
    }
}

/// Errors raised by the store and everything layered on top of it.
///
/// Panics raised by reducers, selectors or middleware are not converted into
/// this type; they unwind through the store untouched after its internal
/// flags have been restored.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// An argument had the wrong shape, e.g. two enhancers were supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The action is missing its discriminant or is not a structured record.
    #[error("invalid action: {0}")]
    InvalidUpdate(String),

    /// The operation was attempted while the reducer was running, or a
    /// dispatch or reducer replacement was attempted from inside the store's
    /// own notification pass.
    #[error("{0} is not allowed while the store is dispatching")]
    Reentrancy(Operation),

    /// A middleware called `dispatch` while the pipeline was still being built.
    #[error(
        "dispatching while constructing middleware is not allowed; \
         other middleware would not be applied to this dispatch"
    )]
    ConstructionOrder,

    /// The store behind a weak handle (e.g. a middleware API kept alive by a
    /// deferred task) no longer exists.
    #[error("the store has been dropped")]
    Dropped,

    /// A user-supplied selector failed.
    #[error("user function failed: {0}")]
    UserFunction(Arc<anyhow::Error>),
}

impl StoreError {
    /// Returns the inner user error if this is a `UserFunction` variant.
    pub fn user_error(&self) -> Option<&Arc<anyhow::Error>> {
        match self {
            StoreError::UserFunction(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` for the re-entrancy class of errors, which includes
    /// dispatching before the middleware chain exists.
    pub fn is_reentrancy(&self) -> bool {
        matches!(self, StoreError::Reentrancy(_) | StoreError::ConstructionOrder)
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::UserFunction(Arc::new(err))
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
