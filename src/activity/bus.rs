use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
};

use log::{debug, error};

use super::DailyActivityRecord;

pub type ActivityHandler = Arc<dyn Fn(&DailyActivityRecord) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, ActivityHandler)>>,
}

impl BusInner {
    fn handlers(&self) -> MutexGuard<'_, Vec<(u64, ActivityHandler)>> {
        match self.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Synchronous fan-out of "record changed" events.
///
/// Handlers run on the publishing task, in registration order, before
/// [`ActivityBus::publish`] returns. Nothing is queued: an event published
/// with no subscribers is gone.
#[derive(Clone, Default)]
pub struct ActivityBus {
    inner: Arc<BusInner>,
}

impl ActivityBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`. Registering the same closure twice delivers twice.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DailyActivityRecord) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers().push((id, Arc::new(handler)));
        debug!("Subscribed activity handler {id}");

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `record` to every current handler and return how many ran to
    /// completion. A panicking handler is logged and skipped.
    pub fn publish(&self, record: &DailyActivityRecord) -> usize {
        // Snapshot so handlers may subscribe or unsubscribe while being called.
        let handlers: Vec<(u64, ActivityHandler)> = self.inner.handlers().clone();

        let mut delivered = 0;
        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(record))) {
                Ok(()) => delivered += 1,
                Err(_) => error!("Activity handler {id} panicked while handling {}", record.date),
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers().len()
    }
}

/// Capability returned by [`ActivityBus::subscribe`].
#[must_use = "dropping a Subscription keeps the handler registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.handlers().retain(|(id, _)| *id != self.id);
            debug!("Unsubscribed activity handler {}", self.id);
        }
    }
}
