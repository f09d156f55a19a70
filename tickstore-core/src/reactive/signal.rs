//! Signal Implementation
//!
//! A Signal is the change-notification primitive of the store. It keeps an
//! ordered set of listeners and fires them synchronously with a payload.
//!
//! # Firing Semantics
//!
//! 1. `fire` takes a snapshot of the connected listeners and releases the
//!    listener lock before invoking anything, so listeners are free to
//!    connect, disconnect, dispatch or fire again.
//!
//! 2. Listeners connected during a fire are not part of the snapshot and
//!    first run on the next fire.
//!
//! 3. A listener disconnected during a fire is skipped if the pass has not
//!    reached it yet. Listeners already invoked are unaffected, and the
//!    relative order of the remaining ones does not change.
//!
//! # Blocking Listeners
//!
//! Listeners are plain `Fn(&T)` closures returning `()`, so a listener cannot
//! suspend the firing call. A listener that blocks its thread still stalls
//! everything behind it; with a slow-listener threshold configured, each
//! overrun is reported through `tracing::warn!`.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::listener::{Connection, ListenerId, ListenerRegistry};

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A connected listener.
struct ListenerEntry<T> {
    id: ListenerId,
    callback: Callback<T>,
    /// Shared with the [`Connection`] handle.
    connected: Arc<AtomicBool>,
}

impl<T> ListenerEntry<T> {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

struct SignalInner<T> {
    /// Insertion order is firing order.
    listeners: RwLock<IndexMap<ListenerId, Arc<ListenerEntry<T>>>>,
    slow_listener: Option<Duration>,
}

impl<T: 'static> ListenerRegistry for SignalInner<T>
where
    T: Send + Sync,
{
    fn remove(&self, id: ListenerId) {
        self.listeners.write().shift_remove(&id);
    }
}

/// Synchronous pub/sub primitive.
///
/// Clones share the same listener set.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use tickstore_core::reactive::Signal;
///
/// let signal = Signal::<i32>::new();
/// let total = Arc::new(AtomicI32::new(0));
///
/// let sink = Arc::clone(&total);
/// let connection = signal.connect(move |value| {
///     sink.fetch_add(*value, Ordering::SeqCst);
/// });
///
/// signal.fire(&5);
/// connection.disconnect();
/// signal.fire(&5);
///
/// assert_eq!(total.load(Ordering::SeqCst), 5);
/// ```
pub struct Signal<T>
where
    T: Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Send + Sync + 'static,
{
    /// Create a signal with no listeners.
    pub fn new() -> Self {
        Self::with_slow_listener(None)
    }

    /// Create a signal that reports listeners running longer than `threshold`.
    pub fn with_slow_listener(threshold: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                listeners: RwLock::new(IndexMap::new()),
                slow_listener: threshold,
            }),
        }
    }

    /// Register a listener.
    ///
    /// Connecting the same closure twice produces two independent entries.
    pub fn connect<F>(&self, listener: F) -> Connection
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        let connected = Arc::new(AtomicBool::new(true));
        let entry = Arc::new(ListenerEntry {
            id,
            callback: Box::new(listener),
            connected: Arc::clone(&connected),
        });

        self.inner.listeners.write().insert(id, entry);

        let registry: Weak<dyn ListenerRegistry> =
            Arc::downgrade(&self.inner) as Weak<dyn ListenerRegistry>;
        Connection::new(id, connected, registry)
    }

    /// Invoke every connected listener, in registration order, with `payload`.
    pub fn fire(&self, payload: &T) {
        let snapshot: SmallVec<[Arc<ListenerEntry<T>>; 8]> =
            self.inner.listeners.read().values().cloned().collect();

        for entry in snapshot {
            if !entry.is_connected() {
                continue;
            }

            let started = Instant::now();
            (entry.callback)(payload);

            if let Some(threshold) = self.inner.slow_listener {
                let elapsed = started.elapsed();
                if elapsed > threshold {
                    tracing::warn!(
                        listener = entry.id.raw(),
                        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        threshold_ms = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX),
                        "listener blocked the firing thread"
                    );
                }
            }
        }
    }

    /// Disconnect every listener.
    ///
    /// Outstanding [`Connection`] handles report themselves as disconnected
    /// afterwards, and a fire already in progress skips the rest of its pass.
    pub fn disconnect_all(&self) {
        let drained = std::mem::take(&mut *self.inner.listeners.write());
        for entry in drained.values() {
            entry.connected.store(false, Ordering::Release);
        }
    }

    /// Get the number of connected listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl<T> Default for Signal<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Signal<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("listener_count", &self.listener_count())
            .field("slow_listener", &self.inner.slow_listener)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
