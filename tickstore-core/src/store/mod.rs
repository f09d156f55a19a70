//! Store
//!
//! The store owns the current state and is the only thing that replaces it.
//! Callers send actions through [`Store::dispatch`]; the composed middleware
//! chain decides what reaches the reducer, and every reduced action marks
//! the store as having a pending change. Observers are not told about each
//! transition. Instead the host calls [`Store::flush`] once per tick and the
//! store fires [`Store::changed`] at most once with the `(new, old)` pair
//! spanning every transition since the previous flush.
//!
//! # Lifecycle
//!
//! ```text
//! Constructed ──► Active { clean ⇄ pending } ──► Destroyed
//!                      dispatch: clean → pending
//!                      flush:    pending → clean
//! ```
//!
//! Construction runs the reducer once with [`Action::init`], bypassing
//! middleware. That transition is never pending: nothing can observe it
//! through `changed`. `destruct` is terminal; afterwards `dispatch` and
//! `flush` return [`StoreError::Destroyed`](crate::StoreError::Destroyed).
//!
//! # Threading
//!
//! A store is `Send + Sync` so it can be handed to a tick driver, but it is a
//! single-writer container. Reducer calls are serialized: a dispatch from
//! another thread waits until the running reducer returns. A reducer that
//! dispatches into its own store is rejected with
//! [`StoreError::DispatchInReducer`](crate::StoreError::DispatchInReducer).

mod action;
mod container;

pub use action::{Action, INIT_ACTION_TYPE};
pub use container::{StateChange, Store, StoreBuilder};

use std::sync::Arc;

/// A shared reducer: `(state, action) -> next state`.
///
/// Reducers must be pure. The same `(state, action)` pair must always yield
/// an equal result, and a reducer must never dispatch.
pub type Reducer<S, A> = Arc<dyn Fn(&S, &A) -> S + Send + Sync>;
