//! LoggerMiddleware - logs every action and the state it produced

use std::fmt::Debug;

use super::{Middleware, Next};
use crate::store::{Action, Store};

/// Logs each dispatched action and the resulting state.
///
/// Events go to the `tickstore::logger` target: the action at `info`, the
/// state after the reducer at `debug`, and failed dispatches at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerMiddleware;

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S, A, R> Middleware<S, A, R> for LoggerMiddleware
where
    S: Debug + Send + Sync + 'static,
    A: Action + Debug,
    R: 'static,
{
    fn wrap(&self, next: Next<S, A, R>) -> Next<S, A, R> {
        Next::new(move |store: &Store<S, A, R>, action: A| {
            tracing::info!(
                target: "tickstore::logger",
                store = %store.name(),
                action = ?action,
                "action dispatched"
            );

            let result = next.call(store, action);

            match &result {
                Ok(_) => tracing::debug!(
                    target: "tickstore::logger",
                    store = %store.name(),
                    state = ?store.get_state(),
                    "state after action"
                ),
                Err(err) => tracing::warn!(
                    target: "tickstore::logger",
                    store = %store.name(),
                    error = %err,
                    "dispatch failed"
                ),
            }

            result
        })
    }
}
