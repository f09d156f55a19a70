//! Reactive Primitives
//!
//! This module holds the notification side of the store: a synchronous
//! [`Signal`] with independently disconnectable listeners, and the RAII
//! [`FlagGuard`] the store uses to reject re-entrant reducer calls and
//! nested flushes.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal fires its listeners synchronously, in the order they were
//! connected, with a borrowed payload. Each `connect` returns a
//! [`Connection`] that removes exactly that registration.
//!
//! ## Guards
//!
//! A guard claims a boolean flag for the lifetime of a scope. Claiming a flag
//! that is already held fails, which is how the store recognises a reducer
//! that dispatches, or a listener that flushes during a flush.

mod guard;
mod listener;
mod signal;

pub use guard::FlagGuard;
pub use listener::{Connection, ListenerId};
pub use signal::Signal;
