//! Tickstore Core
//!
//! This crate provides a single-writer, observable state container. It
//! implements:
//!
//! - A store whose state is replaced only by a pure reducer
//! - A middleware pipeline composed around the reducer step
//! - Change notification batched per host tick through `flush`
//! - Teardown that is safe to trigger in the middle of a flush
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the `Signal` pub/sub primitive and re-entrancy guards
//! - `pipeline`: middleware composition, plus thunk and logger middleware
//! - `store`: the container itself, its builder and the `Action` trait
//! - `reducers`: table and combined reducer helpers
//! - `tick`: a driver that flushes registered stores once per tick
//!
//! # Example
//!
//! ```rust
//! use serde_json::{json, Value};
//! use tickstore_core::{Action, Store};
//!
//! let store = Store::new(
//!     |count: &i64, action: &Value| match action.action_type() {
//!         Some("inc") => count + 1,
//!         _ => *count,
//!     },
//!     0,
//! );
//!
//! store.changed().connect(|change| {
//!     println!("{} -> {}", change.old_state, change.new_state);
//! });
//!
//! store.dispatch(json!({ "type": "inc" })).unwrap();
//! store.dispatch(json!({ "type": "inc" })).unwrap();
//!
//! // Once per tick: a single notification for both dispatches.
//! store.flush().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod reactive;
pub mod reducers;
pub mod store;
pub mod tick;

pub use config::StoreConfig;
pub use error::{Operation, Result, StoreError};
pub use pipeline::{Middleware, Next};
pub use store::{Action, Reducer, StateChange, Store, StoreBuilder, INIT_ACTION_TYPE};
