/// Synchronous event hubs for the cursor and active-document feeds.
///
/// Handlers run on the dispatching task, in subscription order. A
/// `Subscription` releases its handler exactly once, on `dispose` or drop;
/// a handler disposed mid-dispatch is not invoked again, even by the
/// dispatch already in flight.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tower_lsp::lsp_types::{Position, Url};

/// "The selection moved in document `uri`."
#[derive(Debug, Clone)]
pub(crate) struct SelectionEvent {
    pub uri: Url,
    pub position: Position,
}

/// "The active document is now `uri`" (`None` when no editor is focused).
#[derive(Debug, Clone)]
pub(crate) struct ActiveDocumentEvent {
    pub uri: Option<Url>,
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Entry<E> {
    id: u64,
    live: Arc<AtomicBool>,
    handler: Handler<E>,
}

struct HubInner<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<E>>>,
}

impl<E> HubInner<E> {
    fn remove(&self, id: u64) {
        self.entries.lock().retain(|e| e.id != id);
    }
}

pub(crate) struct EventHub<E> {
    inner: Arc<HubInner<E>>,
}

impl<E: 'static> EventHub<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                next_id: AtomicU64::new(0),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let live = Arc::new(AtomicBool::new(true));
        self.inner.entries.lock().push(Entry {
            id,
            live: live.clone(),
            handler: Arc::new(handler),
        });

        let hub: Weak<HubInner<E>> = Arc::downgrade(&self.inner);
        Subscription {
            live,
            release: Some(Box::new(move || {
                if let Some(hub) = hub.upgrade() {
                    hub.remove(id);
                }
            })),
        }
    }

    /// Deliver `event` to every live handler. Returns how many ran.
    ///
    /// The handler list is snapshotted first so handlers may subscribe or
    /// dispose without deadlocking the hub.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<(Arc<AtomicBool>, Handler<E>)> = self
            .inner
            .entries
            .lock()
            .iter()
            .map(|e| (e.live.clone(), e.handler.clone()))
            .collect();

        let mut delivered = 0;
        for (live, handler) in snapshot {
            if live.load(Ordering::SeqCst) {
                handler(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }
}

/// Handle to a registered handler.
pub(crate) struct Subscription {
    live: Arc<AtomicBool>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Release the handler. Returns `false` if it was already released.
    pub fn dispose(&mut self) -> bool {
        let was_live = self.live.swap(false, Ordering::SeqCst);
        if let Some(release) = self.release.take() {
            release();
        }
        was_live
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emit_reaches_subscribers() {
        let hub = EventHub::<u32>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _sub = hub.subscribe(move |n| {
            counter.fetch_add(*n as usize, Ordering::SeqCst);
        });
        assert_eq!(hub.emit(&3), 1);
        assert_eq!(hub.emit(&4), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn dispose_is_exactly_once() {
        let hub = EventHub::<()>::new();
        let mut sub = hub.subscribe(|_| {});
        assert_eq!(hub.len(), 1);
        assert!(sub.dispose());
        assert!(!sub.dispose());
        assert_eq!(hub.len(), 0);
        assert_eq!(hub.emit(&()), 0);
    }

    #[test]
    fn drop_releases_handler() {
        let hub = EventHub::<()>::new();
        {
            let _sub = hub.subscribe(|_| {});
            assert_eq!(hub.len(), 1);
        }
        assert_eq!(hub.len(), 0);
    }

    #[test]
    fn handler_disposed_during_dispatch_is_skipped() {
        let hub = EventHub::<()>::new();
        let victim_ran = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let target = slot.clone();
        let _killer = hub.subscribe(move |_| {
            if let Some(mut sub) = target.lock().take() {
                sub.dispose();
            }
        });
        let ran = victim_ran.clone();
        let victim = hub.subscribe(move |_| {
            ran.fetch_add(1, Ordering::SeqCst);
        });
        *slot.lock() = Some(victim);

        assert_eq!(hub.emit(&()), 1);
        assert_eq!(victim_ran.load(Ordering::SeqCst), 0);
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn subscription_outliving_hub_is_harmless() {
        let hub = EventHub::<()>::new();
        let mut sub = hub.subscribe(|_| {});
        drop(hub);
        assert!(sub.dispose());
    }
}
