use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Removes a listener from its source. Called at most once.
pub type Teardown = Box<dyn FnOnce() + Send>;

/// A platform API that pushes events to registered listeners.
pub trait EventSource<E>: Send + Sync {
    fn add_listener(&self, listener: Listener<E>) -> Teardown;
}

struct HubInner<E> {
    listeners: RwLock<BTreeMap<u64, Listener<E>>>,
    next_id: AtomicU64,
}

/// In-process event source. Platform adapters push events in with
/// [`emit`](EventHub::emit) or [`forward_stream`](EventHub::forward_stream).
pub struct EventHub<E> {
    inner: Arc<HubInner<E>>,
}

impl<E> Clone for EventHub<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Send + Sync + 'static> EventHub<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                listeners: RwLock::new(BTreeMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Deliver an event to every listener in subscription order.
    ///
    /// Listeners run outside the lock, so they may unsubscribe themselves.
    pub fn emit(&self, event: E) -> usize {
        let listeners: Vec<Listener<E>> = self.inner.listeners.read().values().cloned().collect();
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Emit every item of `stream`, in order, from a background task.
    pub fn forward_stream<S>(&self, stream: S) -> JoinHandle<()>
    where
        S: Stream<Item = E> + Send + 'static,
    {
        let hub = self.clone();
        tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            while let Some(event) = stream.next().await {
                hub.emit(event);
            }
            debug!("Platform event stream ended");
        })
    }
}

impl<E: Send + Sync + 'static> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + Sync + 'static> EventSource<E> for EventHub<E> {
    fn add_listener(&self, listener: Listener<E>) -> Teardown {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().insert(id, listener);

        let inner = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.write().remove(&id);
            }
        })
    }
}

/// Scoped listener registration.
///
/// Dropping the guard unsubscribes. After `unsubscribe` returns, no event is
/// forwarded, even one the platform delivers late: deliveries hold the gate
/// shared and `unsubscribe` waits for any running on other threads.
///
/// The callback must not unsubscribe its own guard.
pub struct Subscription {
    active: Arc<RwLock<bool>>,
    teardown: Mutex<Option<Teardown>>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        *self.active.read()
    }

    /// Idempotent; the platform teardown runs once.
    pub fn unsubscribe(&self) {
        *self.active.write() = false;
        let teardown = self.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
            debug!("Subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Register `on_event` with `source`, gated by the returned guard.
pub fn subscribe<E, S, F>(source: &S, on_event: F) -> Subscription
where
    E: 'static,
    S: EventSource<E> + ?Sized,
    F: Fn(&E) + Send + Sync + 'static,
{
    let active = Arc::new(RwLock::new(true));
    let gate = Arc::clone(&active);
    let listener: Listener<E> = Arc::new(move |event: &E| {
        let open = gate.read();
        if *open {
            on_event(event);
        }
    });

    let teardown = source.add_listener(listener);
    Subscription {
        active,
        teardown: Mutex::new(Some(teardown)),
    }
}
