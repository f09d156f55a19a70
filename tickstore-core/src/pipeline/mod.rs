//! Dispatch Pipeline
//!
//! Middleware sits between a caller's `dispatch` and the reducer. The store
//! composes its middleware list once, at construction, into a single
//! [`Next`] function that every later dispatch goes through.
//!
//! # Composition
//!
//! ```text
//! [m1, m2, ..., mn] + T  =>  m1(m2(...mn(T)...))
//! ```
//!
//! `T` is the terminal step that runs the reducer. The first middleware in
//! the list is the outermost wrapper: it sees every action first, and its
//! return value is what the caller of `dispatch` receives. An empty list
//! composes to `T` itself.
//!
//! A middleware may forward the action unchanged, rewrite it, swallow it
//! (never calling `next`), call `next` several times, or dispatch further
//! actions through the store. Nothing guards against a middleware that
//! dispatches forever.

use std::sync::Arc;

use crate::error::Result;
use crate::store::Store;

mod logger;
mod thunk;

pub use logger::LoggerMiddleware;
pub use thunk::{Thunk, ThunkAction, ThunkMiddleware};

type DispatchFn<S, A, R> = dyn Fn(&Store<S, A, R>, A) -> Result<R> + Send + Sync;

/// One link of a composed dispatch chain.
///
/// Cloning is cheap; clones call the same function.
pub struct Next<S, A, R = ()>
where
    S: Send + Sync + 'static,
{
    f: Arc<DispatchFn<S, A, R>>,
}

impl<S, A, R> Next<S, A, R>
where
    S: Send + Sync + 'static,
{
    /// Wrap a `(store, action) -> result` function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Store<S, A, R>, A) -> Result<R> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Run this link with `action`.
    pub fn call(&self, store: &Store<S, A, R>, action: A) -> Result<R> {
        (self.f)(store, action)
    }
}

impl<S, A, R> Clone for Next<S, A, R>
where
    S: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<S, A, R> std::fmt::Debug for Next<S, A, R>
where
    S: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// A wrapper around the dispatch step.
///
/// Any `Fn(Next) -> Next` closure is a middleware:
///
/// ```rust
/// use serde_json::Value;
/// use tickstore_core::pipeline::{Middleware, Next};
///
/// fn passthrough() -> impl Middleware<i64, Value> {
///     |next: Next<i64, Value>| {
///         Next::new(move |store, action| next.call(store, action))
///     }
/// }
/// ```
pub trait Middleware<S, A, R = ()>: Send + Sync
where
    S: Send + Sync + 'static,
{
    /// Return the function that runs in place of `next`.
    fn wrap(&self, next: Next<S, A, R>) -> Next<S, A, R>;
}

impl<S, A, R, F> Middleware<S, A, R> for F
where
    S: Send + Sync + 'static,
    F: Fn(Next<S, A, R>) -> Next<S, A, R> + Send + Sync,
{
    fn wrap(&self, next: Next<S, A, R>) -> Next<S, A, R> {
        self(next)
    }
}

/// Compose `middlewares` around `terminal`, first middleware outermost.
pub fn compose<S, A, R>(
    middlewares: &[Arc<dyn Middleware<S, A, R>>],
    terminal: Next<S, A, R>,
) -> Next<S, A, R>
where
    S: Send + Sync + 'static,
{
    middlewares
        .iter()
        .rev()
        .fold(terminal, |next, middleware| middleware.wrap(next))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
