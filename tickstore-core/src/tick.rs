//! Flush Scheduler
//!
//! Stores never decide on their own when a tick ends. The host owns that
//! boundary and calls `flush` once per tick; this module is a small driver
//! for hosts that want one place to do it.
//!
//! # Algorithm
//!
//! On every tick:
//!
//! 1. Snapshot the registered targets and release the registry lock, so
//!    listeners fired by a flush may register or unregister targets.
//! 2. Skip and forget targets that have been destructed.
//! 3. Flush every live target once, in registration order.
//!
//! [`FlushScheduler::run`] repeats this on a `tokio` interval until its
//! shutdown channel fires. Tests drive [`FlushScheduler::tick`] directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::store::{Action, Store};

/// Anything a tick can flush.
pub trait Flush: Send + Sync {
    fn flush(&self) -> Result<()>;

    fn is_destroyed(&self) -> bool;

    /// Name used in log fields.
    fn name(&self) -> &str;
}

impl<S, A, R> Flush for Store<S, A, R>
where
    S: Send + Sync + 'static,
    A: Action,
    R: 'static,
{
    fn flush(&self) -> Result<()> {
        Store::flush(self)
    }

    fn is_destroyed(&self) -> bool {
        Store::is_destroyed(self)
    }

    fn name(&self) -> &str {
        Store::name(self)
    }
}

/// Unique identifier for a registered flush target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

impl TargetId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Targets that were flushed.
    pub flushed: usize,
    /// Destructed targets removed from the scheduler.
    pub dropped: usize,
}

/// Calls `flush` on every registered target once per tick.
pub struct FlushScheduler {
    targets: Mutex<IndexMap<TargetId, Arc<dyn Flush>>>,
}

impl FlushScheduler {
    /// Create a scheduler with no targets.
    pub fn new() -> Self {
        Self {
            targets: Mutex::new(IndexMap::new()),
        }
    }

    /// Add a target. Targets are flushed in registration order.
    pub fn register<F>(&self, target: F) -> TargetId
    where
        F: Flush + 'static,
    {
        let id = TargetId::new();
        self.targets.lock().insert(id, Arc::new(target));
        id
    }

    /// Remove a target. Returns `false` if it was not registered.
    pub fn unregister(&self, id: TargetId) -> bool {
        self.targets.lock().shift_remove(&id).is_some()
    }

    /// Get the number of registered targets.
    pub fn target_count(&self) -> usize {
        self.targets.lock().len()
    }

    /// Flush every live target once.
    pub fn tick(&self) -> TickReport {
        let snapshot: SmallVec<[(TargetId, Arc<dyn Flush>); 8]> = self
            .targets
            .lock()
            .iter()
            .map(|(id, target)| (*id, Arc::clone(target)))
            .collect();

        let mut report = TickReport::default();
        let mut dead: SmallVec<[TargetId; 4]> = SmallVec::new();

        for (id, target) in snapshot {
            if target.is_destroyed() {
                dead.push(id);
                continue;
            }
            match target.flush() {
                Ok(()) => report.flushed += 1,
                // Only a store destructed between the check and the flush
                // gets here.
                Err(err) => {
                    tracing::debug!(store = target.name(), error = %err, "dropping flush target");
                    dead.push(id);
                }
            }
        }

        if !dead.is_empty() {
            let mut targets = self.targets.lock();
            for id in &dead {
                if targets.shift_remove(id).is_some() {
                    report.dropped += 1;
                }
            }
        }

        report
    }

    /// Tick every `period` until `shutdown` fires or its sender is dropped.
    pub async fn run(&self, period: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(period_ms = period.as_millis() as u64, "flush scheduler started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick();
                }
                _ = &mut shutdown => break,
            }
        }
        tracing::debug!("flush scheduler stopped");
    }
}

impl Default for FlushScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FlushScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushScheduler")
            .field("target_count", &self.target_count())
            .finish()
    }
}
