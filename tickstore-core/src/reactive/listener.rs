//! Listener identities and connection handles.
//!
//! Every `connect` call produces a fresh [`ListenerId`], even when the same
//! closure is connected twice, so each registration can be removed on its
//! own through the [`Connection`] it returned.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Unique identifier for a connected listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Something listeners can be removed from.
///
/// Implemented by the signal internals so that [`Connection`] does not have
/// to carry the signal's payload type.
pub(crate) trait ListenerRegistry: Send + Sync {
    fn remove(&self, id: ListenerId);
}

/// Handle returned by [`Signal::connect`](super::Signal::connect).
///
/// Dropping the handle does not disconnect the listener; call
/// [`disconnect`](Connection::disconnect) explicitly. The handle holds only a
/// weak reference to its signal, so it never keeps a signal alive.
pub struct Connection {
    id: ListenerId,
    connected: Arc<AtomicBool>,
    registry: Weak<dyn ListenerRegistry>,
}

impl Connection {
    pub(crate) fn new(
        id: ListenerId,
        connected: Arc<AtomicBool>,
        registry: Weak<dyn ListenerRegistry>,
    ) -> Self {
        Self {
            id,
            connected,
            registry,
        }
    }

    /// The listener this handle controls.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the listener is still connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Remove the listener from its signal.
    ///
    /// Idempotent. Safe to call from inside the listener itself while the
    /// signal is firing, and safe to call after the signal is gone.
    pub fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}
