//! ThunkMiddleware - runs function-valued actions against the store

use super::{Middleware, Next};
use crate::error::Result;
use crate::store::{Action, Store};

/// A deferred piece of work dispatched in place of an action.
///
/// The thunk receives the store and may read state or dispatch any number of
/// ordinary actions. Its return value is what the outer `dispatch` call
/// returns.
pub type Thunk<S, A, R = ()> = Box<dyn FnOnce(&Store<S, A, R>) -> Result<R> + Send>;

/// Action types that can carry a [`Thunk`].
///
/// Thunk variants usually report no discriminator, so a thunk dispatched to
/// a store without [`ThunkMiddleware`] fails with
/// [`MissingActionType`](crate::StoreError::MissingActionType).
pub trait ThunkAction<S, R = ()>: Action + Sized
where
    S: Send + Sync + 'static,
{
    /// Take the thunk out of this action, or hand the action back.
    fn into_thunk(self) -> std::result::Result<Thunk<S, Self, R>, Self>;
}

/// Invokes thunk actions with the store instead of forwarding them.
///
/// Every other action continues down the chain untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThunkMiddleware;

impl ThunkMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S, A, R> Middleware<S, A, R> for ThunkMiddleware
where
    S: Send + Sync + 'static,
    A: ThunkAction<S, R>,
    R: 'static,
{
    fn wrap(&self, next: Next<S, A, R>) -> Next<S, A, R> {
        Next::new(move |store: &Store<S, A, R>, action: A| match action.into_thunk() {
            Ok(thunk) => thunk(store),
            Err(action) => next.call(store, action),
        })
    }
}
