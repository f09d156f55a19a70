use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use super::{Action, Reducer};
use crate::config::StoreConfig;
use crate::error::{Operation, Result, StoreError};
use crate::pipeline::{compose, Middleware, Next};
use crate::reactive::{FlagGuard, Signal};

/// Payload of [`Store::changed`].
#[derive(Debug)]
pub struct StateChange<S> {
    /// State after the last dispatch before the flush.
    pub new_state: Arc<S>,
    /// State before the first dispatch after the previous flush.
    pub old_state: Arc<S>,
}

impl<S> Clone for StateChange<S> {
    fn clone(&self) -> Self {
        Self {
            new_state: Arc::clone(&self.new_state),
            old_state: Arc::clone(&self.old_state),
        }
    }
}

/// Current state plus the bookkeeping for the pending window.
struct Ledger<S> {
    current: Arc<S>,
    /// Snapshot taken by the first dispatch since the last flush.
    /// `Some` exactly while a change is pending.
    pending_since: Option<Arc<S>>,
}

struct StoreInner<S, A, R>
where
    S: Send + Sync + 'static,
{
    config: StoreConfig,
    reducer: Reducer<S, A>,
    /// Middleware chain composed around the reducer step. Fixed after build.
    dispatch: Next<S, A, R>,
    ledger: Mutex<Ledger<S>>,
    /// Serializes reducer calls across threads. Re-entrant, so a reducer
    /// that dispatches on its own thread reaches the `reducing` check
    /// instead of deadlocking.
    reduce_lock: ReentrantMutex<()>,
    reducing: AtomicBool,
    flushing: AtomicBool,
    destroyed: AtomicBool,
    changed: Signal<StateChange<S>>,
}

/// A single-writer state container.
///
/// Clones are handles to the same container.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use parking_lot::{Mutex, ReentrantMutex};
/// use serde_json::{json, Value};
/// use tickstore_core::{Action, Store};
///
/// let store = Store::new(
///     |count: &i64, action: &Value| match action.action_type() {
///         Some("inc") => count + 1,
///         _ => *count,
///     },
///     0,
/// );
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// store.changed().connect(move |change| {
///     sink.lock().push((*change.new_state, *change.old_state));
/// });
///
/// for _ in 0..3 {
///     store.dispatch(json!({ "type": "inc" })).unwrap();
/// }
/// store.flush().unwrap();
///
/// assert_eq!(*seen.lock(), vec![(3, 0)]);
/// assert_eq!(*store.get_state(), 3);
/// ```
pub struct Store<S, A, R = ()>
where
    S: Send + Sync + 'static,
{
    inner: Arc<StoreInner<S, A, R>>,
}

impl<S, A> Store<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    /// Create a store with no middleware and the default configuration.
    pub fn new<F>(reducer: F, initial_state: S) -> Self
    where
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        StoreBuilder::new(reducer).build(initial_state)
    }

    /// Start configuring a store whose dispatches return `()`.
    ///
    /// Use [`StoreBuilder::new`] directly for other result types.
    pub fn builder<F>(reducer: F) -> StoreBuilder<S, A>
    where
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        StoreBuilder::new(reducer)
    }
}

impl<S, A, R> Store<S, A, R>
where
    S: Send + Sync + 'static,
    A: Action,
    R: 'static,
{
    /// Send `action` through the middleware chain.
    ///
    /// Returns whatever the outermost middleware returns (`R::default()` when
    /// the action simply reaches the reducer). State is updated before this
    /// returns, but `changed` does not fire until the next [`flush`].
    ///
    /// [`flush`]: Store::flush
    pub fn dispatch(&self, action: A) -> Result<R> {
        self.ensure_active(Operation::Dispatch)?;
        self.inner.dispatch.call(self, action)
    }

    /// Get the current state.
    ///
    /// The returned `Arc` is a read-only view; the store replaces the value
    /// on every reduced action and never copies it.
    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(&self.inner.ledger.lock().current)
    }

    /// Fire `changed` once if anything was reduced since the last flush.
    ///
    /// Cheap when nothing is pending, so a tick driver can call it every
    /// frame. A flush requested by a listener while this store is already
    /// flushing does nothing; changes made by such a listener stay pending
    /// for the next flush.
    pub fn flush(&self) -> Result<()> {
        self.ensure_active(Operation::Flush)?;

        let Some(_flushing) = FlagGuard::try_enter(&self.inner.flushing) else {
            tracing::trace!(store = %self.name(), "flush already in progress, skipping");
            return Ok(());
        };

        let change = {
            let mut ledger = self.inner.ledger.lock();
            match ledger.pending_since.take() {
                Some(old_state) => StateChange {
                    new_state: Arc::clone(&ledger.current),
                    old_state,
                },
                None => return Ok(()),
            }
        };

        tracing::trace!(
            store = %self.name(),
            listeners = self.inner.changed.listener_count(),
            "firing changed"
        );
        self.inner.changed.fire(&change);
        Ok(())
    }

    /// Tear the store down.
    ///
    /// Disconnects every `changed` listener and drops any pending change.
    /// Idempotent. A flush in progress stops before its next listener.
    pub fn destruct(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.changed.disconnect_all();
        self.inner.ledger.lock().pending_since = None;

        tracing::debug!(store = %self.name(), "store destructed");
    }

    /// The signal fired by [`flush`](Store::flush) with `(new, old)` state.
    pub fn changed(&self) -> &Signal<StateChange<S>> {
        &self.inner.changed
    }

    /// The configured store name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Whether a dispatch has reduced since the last flush.
    pub fn has_pending_change(&self) -> bool {
        self.inner.ledger.lock().pending_since.is_some()
    }

    fn ensure_active(&self, operation: Operation) -> Result<()> {
        if self.is_destroyed() {
            return Err(StoreError::Destroyed {
                store: self.inner.config.name.clone(),
                operation,
            });
        }
        Ok(())
    }

    /// Terminal step of every dispatch chain.
    fn reduce(&self, action: A) -> Result<()> {
        let _serial = self.inner.reduce_lock.lock();
        self.ensure_active(Operation::Dispatch)?;

        let _reducing = FlagGuard::try_enter(&self.inner.reducing).ok_or_else(|| {
            StoreError::DispatchInReducer {
                store: self.inner.config.name.clone(),
            }
        })?;

        let action_type = action.action_type().ok_or(StoreError::MissingActionType)?;
        tracing::trace!(store = %self.name(), action = action_type, "reducing action");

        // The ledger stays unlocked while the reducer runs so that it can
        // still read state through a store handle.
        let previous = self.get_state();
        let next = Arc::new((self.inner.reducer)(&previous, &action));

        let mut ledger = self.inner.ledger.lock();
        // `destruct` raises the flag before clearing the ledger, so checking
        // it under the ledger lock cannot leave a pending change behind.
        if self.is_destroyed() {
            ledger.current = next;
            return Ok(());
        }
        if ledger.pending_since.is_none() {
            ledger.pending_since = Some(previous);
        }
        ledger.current = next;
        Ok(())
    }
}

impl<S, A, R> Clone for Store<S, A, R>
where
    S: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, R> Debug for Store<S, A, R>
where
    S: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.config.name)
            .field("destroyed", &self.inner.destroyed.load(Ordering::Acquire))
            .field(
                "pending_change",
                &self.inner.ledger.lock().pending_since.is_some(),
            )
            .field("listener_count", &self.inner.changed.listener_count())
            .finish()
    }
}

/// Builder for [`Store`].
///
/// Middleware runs in the order it is added: the first one added is the
/// outermost and sees each action first.
pub struct StoreBuilder<S, A, R = ()>
where
    S: Send + Sync + 'static,
{
    reducer: Reducer<S, A>,
    middlewares: Vec<Arc<dyn Middleware<S, A, R>>>,
    config: StoreConfig,
}

impl<S, A, R> StoreBuilder<S, A, R>
where
    S: Send + Sync + 'static,
    A: Action,
    R: Default + 'static,
{
    pub fn new<F>(reducer: F) -> Self
    where
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        Self {
            reducer: Arc::new(reducer),
            middlewares: Vec::new(),
            config: StoreConfig::default(),
        }
    }

    /// Append a middleware.
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<S, A, R> + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append a closure middleware.
    ///
    /// Same as [`middleware`](StoreBuilder::middleware), but pins the closure
    /// signature so its arguments need no annotations.
    pub fn middleware_fn<F>(self, middleware: F) -> Self
    where
        F: Fn(Next<S, A, R>) -> Next<S, A, R> + Send + Sync + 'static,
    {
        self.middleware(middleware)
    }

    /// Append several middlewares, keeping their order.
    pub fn middlewares<I>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware<S, A, R>>>,
    {
        self.middlewares.extend(middlewares);
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the store.
    ///
    /// The reducer runs once with [`Action::init`] so the starting state
    /// reflects the reducer's own defaults. That transition is not pending.
    pub fn build(self, initial_state: S) -> Store<S, A, R> {
        let terminal = Next::new(|store: &Store<S, A, R>, action: A| {
            store.reduce(action)?;
            Ok(R::default())
        });
        let dispatch = compose(&self.middlewares, terminal);

        let state = (self.reducer)(&initial_state, &A::init());

        tracing::debug!(
            store = %self.config.name,
            middleware = self.middlewares.len(),
            "store constructed"
        );

        let changed = Signal::with_slow_listener(self.config.slow_listener_threshold());
        Store {
            inner: Arc::new(StoreInner {
                config: self.config,
                reducer: self.reducer,
                dispatch,
                ledger: Mutex::new(Ledger {
                    current: Arc::new(state),
                    pending_since: None,
                }),
                reduce_lock: ReentrantMutex::new(()),
                reducing: AtomicBool::new(false),
                flushing: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
                changed,
            }),
        }
    }

    /// Build the store starting from `S::default()`.
    pub fn build_default(self) -> Store<S, A, R>
    where
        S: Default,
    {
        self.build(S::default())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::INIT_ACTION_TYPE;
    use serde_json::{json, Value};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;
    use std::sync::OnceLock;

    fn counter(state: &i64, action: &Value) -> i64 {
        match action.action_type() {
            Some("inc") => state + 1,
            Some("add") => state + action["by"].as_i64().unwrap_or(0),
            _ => *state,
        }
    }

    fn inc() -> Value {
        json!({ "type": "inc" })
    }

    fn count_fires(store: &Store<i64, Value>) -> Arc<AtomicUsize> {
        let fires = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&fires);
        store.changed().connect(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        fires
    }

    #[test]
    fn construction_runs_init_action_without_pending() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let store = Store::new(
            move |state: &i64, action: &Value| {
                sink.lock().push(action.action_type().map(str::to_string));
                if action.action_type() == Some(INIT_ACTION_TYPE) {
                    100
                } else {
                    *state
                }
            },
            0,
        );

        assert_eq!(*seen.lock(), vec![Some(INIT_ACTION_TYPE.to_string())]);
        assert_eq!(*store.get_state(), 100);
        assert!(!store.has_pending_change());

        let fires = count_fires(&store);
        store.flush().unwrap();
        assert_eq!(fires.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispatch_updates_state_without_firing() {
        let store = Store::new(counter, 0);
        let fires = count_fires(&store);

        store.dispatch(inc()).unwrap();

        assert_eq!(*store.get_state(), 1);
        assert!(store.has_pending_change());
        assert_eq!(fires.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn flush_coalesces_dispatches() {
        let store = Store::new(counter, 0);
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        store.changed().connect(move |change| {
            sink.lock().push((*change.new_state, *change.old_state));
        });

        store.dispatch(inc()).unwrap();
        store.dispatch(json!({ "type": "add", "by": 5 })).unwrap();
        store.flush().unwrap();
        store.flush().unwrap();

        store.dispatch(inc()).unwrap();
        store.flush().unwrap();

        assert_eq!(*changes.lock(), vec![(6, 0), (7, 6)]);
        assert!(!store.has_pending_change());
    }

    #[test]
    fn flush_without_dispatch_fires_nothing() {
        let store = Store::new(counter, 0);
        let fires = count_fires(&store);

        store.flush().unwrap();
        store.flush().unwrap();

        assert_eq!(fires.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_discriminator_is_rejected() {
        let store = Store::new(counter, 0);

        let err = store.dispatch(json!({ "by": 1 })).unwrap_err();

        assert!(matches!(err, StoreError::MissingActionType));
        assert!(!store.has_pending_change());
    }

    #[test]
    fn reducer_may_not_dispatch() {
        let slot: Arc<OnceLock<Store<i64, Value>>> = Arc::default();
        let errors = Arc::new(Mutex::new(Vec::new()));

        let store = {
            let slot = Arc::clone(&slot);
            let errors = Arc::clone(&errors);
            Store::new(
                move |state: &i64, action: &Value| {
                    if action.action_type() == Some("sneaky") {
                        if let Some(store) = slot.get() {
                            if let Err(err) = store.dispatch(inc()) {
                                errors.lock().push(err);
                            }
                        }
                    }
                    counter(state, action)
                },
                0,
            )
        };
        slot.set(store.clone()).unwrap();

        store.dispatch(json!({ "type": "sneaky" })).unwrap();

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StoreError::DispatchInReducer { .. }));
        drop(errors);

        // The guard is released once the reducer returns.
        store.dispatch(inc()).unwrap();
        assert_eq!(*store.get_state(), 1);
    }

    #[test]
    fn concurrent_dispatch_waits_for_reducer() {
        let entered = Arc::new(AtomicBool::new(false));
        let trail = Arc::new(Mutex::new(Vec::new()));

        let store = {
            let entered = Arc::clone(&entered);
            let trail = Arc::clone(&trail);
            Store::new(
                move |state: &i64, action: &Value| {
                    if action.action_type() == Some("slow") {
                        trail.lock().push("slow:start");
                        entered.store(true, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        trail.lock().push("slow:end");
                        return state + 1;
                    }
                    trail.lock().push("other");
                    counter(state, action)
                },
                0,
            )
        };

        let worker = {
            let store = store.clone();
            std::thread::spawn(move || store.dispatch(json!({ "type": "slow" })))
        };
        while !entered.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        store.dispatch(inc()).unwrap();
        worker.join().unwrap().unwrap();

        assert_eq!(*trail.lock(), vec!["slow:start", "slow:end", "other"]);
        assert_eq!(*store.get_state(), 2);
    }

    #[test]
    fn destruct_during_reduce_leaves_nothing_pending() {
        let slot: Arc<OnceLock<Store<i64, Value>>> = Arc::default();

        let store = {
            let slot = Arc::clone(&slot);
            Store::new(
                move |state: &i64, action: &Value| {
                    if action.action_type() == Some("teardown") {
                        if let Some(store) = slot.get() {
                            store.destruct();
                        }
                    }
                    counter(state, action)
                },
                0,
            )
        };
        slot.set(store.clone()).unwrap();

        store.dispatch(json!({ "type": "teardown" })).unwrap();

        assert!(store.is_destroyed());
        assert!(!store.has_pending_change());
    }

    #[test]
    fn panicking_reducer_releases_guard() {
        let store = Store::new(
            |state: &i64, action: &Value| {
                if action.action_type() == Some("explode") {
                    panic!("reducer failure");
                }
                counter(state, action)
            },
            0,
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = store.dispatch(json!({ "type": "explode" }));
        }));
        assert!(result.is_err());

        store.dispatch(inc()).unwrap();
        assert_eq!(*store.get_state(), 1);
    }

    #[test]
    fn listener_dispatch_stays_pending_for_next_flush() {
        let store = Store::new(counter, 0);
        let changes = Arc::new(Mutex::new(Vec::new()));

        {
            let handle = store.clone();
            let sink = Arc::clone(&changes);
            store.changed().connect(move |change| {
                sink.lock().push((*change.new_state, *change.old_state));
                if *change.new_state < 3 {
                    handle.dispatch(inc()).unwrap();
                    // Nested flush is a no-op while this one is firing.
                    handle.flush().unwrap();
                }
            });
        }

        store.dispatch(inc()).unwrap();
        store.flush().unwrap();
        assert_eq!(*changes.lock(), vec![(1, 0)]);

        store.flush().unwrap();
        assert_eq!(*changes.lock(), vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn destruct_is_idempotent_and_final() {
        let store = Store::new(counter, 0);
        let fires = count_fires(&store);

        store.dispatch(inc()).unwrap();
        store.destruct();
        store.destruct();

        assert!(store.is_destroyed());
        assert_eq!(store.changed().listener_count(), 0);
        assert!(matches!(
            store.dispatch(inc()),
            Err(StoreError::Destroyed {
                operation: Operation::Dispatch,
                ..
            })
        ));
        assert!(matches!(
            store.flush(),
            Err(StoreError::Destroyed {
                operation: Operation::Flush,
                ..
            })
        ));
        assert_eq!(fires.load(Ordering::SeqCst), 0);
        // State stays readable.
        assert_eq!(*store.get_state(), 1);
    }

    #[test]
    fn destruct_inside_listener_stops_the_pass() {
        let store = Store::new(counter, 0);
        let calls = Arc::new(Mutex::new(Vec::new()));

        {
            let handle = store.clone();
            let calls = Arc::clone(&calls);
            store.changed().connect(move |_| {
                calls.lock().push("first");
                handle.destruct();
            });
        }
        {
            let calls = Arc::clone(&calls);
            store.changed().connect(move |_| calls.lock().push("second"));
        }

        store.dispatch(inc()).unwrap();
        store.flush().unwrap();

        assert_eq!(*calls.lock(), vec!["first"]);
        assert!(store.flush().is_err());
    }

    #[test]
    fn build_default_uses_default_state() {
        let store: Store<i64, Value> = Store::builder(counter).build_default();
        assert_eq!(*store.get_state(), 0);
    }

    #[test]
    fn configured_name_appears_in_errors() {
        let store = Store::builder(counter)
            .config(StoreConfig::default().with_name("inventory"))
            .build(0);
        store.destruct();

        let err = store.dispatch(inc()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "store `inventory` has been destructed; dispatch is no longer allowed"
        );
        assert_eq!(store.name(), "inventory");
    }

    #[test]
    fn get_state_is_shared_not_copied() {
        let store = Store::new(counter, 0);

        let first = store.get_state();
        let second = store.get_state();
        assert!(Arc::ptr_eq(&first, &second));

        store.dispatch(inc()).unwrap();
        assert!(!Arc::ptr_eq(&first, &store.get_state()));
        assert_eq!(*first, 0);
    }
}
