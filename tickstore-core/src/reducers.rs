//! Reducer helpers.
//!
//! The store accepts any `Fn(&S, &A) -> S`. These helpers build common
//! shapes of reducer: a lookup table keyed by action discriminator, and a
//! keyed combination of per-slice reducers.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::store::{Action, Reducer};

/// State shape produced by [`combine_reducers`]: one slice per key.
pub type Slices<V> = IndexMap<String, V>;

/// A reducer that selects a handler by action discriminator.
///
/// Actions with no matching handler (including the init action, unless a
/// handler is registered for it) leave the state unchanged.
///
/// ```rust
/// use serde_json::{json, Value};
/// use tickstore_core::reducers::ReducerTable;
/// use tickstore_core::Store;
///
/// let reducer = ReducerTable::new()
///     .on("inc", |count: &i64, _: &Value| count + 1)
///     .on("reset", |_: &i64, _: &Value| 0);
///
/// let store = Store::new(reducer.into_reducer(), 5);
/// store.dispatch(json!({ "type": "inc" })).unwrap();
/// assert_eq!(*store.get_state(), 6);
/// ```
pub struct ReducerTable<S, A> {
    handlers: IndexMap<String, Reducer<S, A>>,
}

impl<S, A> ReducerTable<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    pub fn new() -> Self {
        Self {
            handlers: IndexMap::new(),
        }
    }

    /// Register the handler for `action_type`, replacing any previous one.
    pub fn on<F>(mut self, action_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        self.handlers.insert(action_type.into(), Arc::new(handler));
        self
    }

    pub fn reduce(&self, state: &S, action: &A) -> S {
        match action
            .action_type()
            .and_then(|action_type| self.handlers.get(action_type))
        {
            Some(handler) => handler(state, action),
            None => state.clone(),
        }
    }

    /// Turn the table into a plain reducer function.
    pub fn into_reducer(self) -> impl Fn(&S, &A) -> S + Send + Sync + 'static {
        move |state: &S, action: &A| self.reduce(state, action)
    }
}

impl<S, A> Default for ReducerTable<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Combine per-key reducers into one reducer over [`Slices`].
///
/// Every action goes to every slice reducer with that key's slice. A slice
/// missing from the incoming state starts from `V::default()`. Keys without
/// a reducer are dropped from the result, and the result keeps the reducer
/// order.
pub fn combine_reducers<V, A>(
    reducers: IndexMap<String, Reducer<V, A>>,
) -> impl Fn(&Slices<V>, &A) -> Slices<V> + Send + Sync + 'static
where
    V: Default + 'static,
    A: Action,
{
    move |state: &Slices<V>, action: &A| {
        reducers
            .iter()
            .map(|(key, reducer)| {
                let next = match state.get(key) {
                    Some(slice) => reducer(slice, action),
                    None => reducer(&V::default(), action),
                };
                (key.clone(), next)
            })
            .collect()
    }
}
