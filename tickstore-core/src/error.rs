//! Store Errors
//!
//! Every failure the container can report surfaces synchronously from the
//! call that caused it. There is no background error channel: a container
//! error is a programming error in the host (an untyped action, a reducer
//! that dispatches, a store used after teardown) and the caller is the one
//! who has to see it.

use std::fmt;

use thiserror::Error;

/// The store operation that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Dispatch,
    Flush,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch => f.write_str("dispatch"),
            Self::Flush => f.write_str("flush"),
        }
    }
}

/// Errors raised by a [`Store`](crate::store::Store) or its configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The action reached the reducer without a `type` discriminator and no
    /// middleware consumed it on the way.
    #[error("action has no `type` discriminator and no middleware consumed it")]
    MissingActionType,

    /// A reducer tried to dispatch while the store was reducing.
    #[error("reducers may not dispatch actions (store `{store}` is already reducing)")]
    DispatchInReducer { store: String },

    /// The store was used after `destruct`.
    #[error("store `{store}` has been destructed; {operation} is no longer allowed")]
    Destroyed { store: String, operation: Operation },

    /// Configuration text could not be parsed.
    #[error("invalid store configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroyed_message_names_store_and_operation() {
        let err = StoreError::Destroyed {
            store: "session".to_string(),
            operation: Operation::Flush,
        };
        assert_eq!(
            err.to_string(),
            "store `session` has been destructed; flush is no longer allowed"
        );
    }

    #[test]
    fn config_errors_convert_from_serde_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = parse.into();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
