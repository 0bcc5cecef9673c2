use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Callback registered against an event stream.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Entry<K, E> {
    id: ListenerId,
    kind: K,
    listener: Listener<E>,
}

struct Entries<K, E> {
    next_id: u64,
    entries: Vec<Entry<K, E>>,
}

/// Listeners keyed by event kind.
///
/// Dispatch works from a snapshot of ids and re-checks each id right before
/// the call, so a listener removed by an earlier listener in the same
/// dispatch never runs. No lock is held while a listener runs, which lets
/// listeners add or remove listeners on the same registry.
pub struct ListenerRegistry<K, E> {
    inner: Mutex<Entries<K, E>>,
}

impl<K, E> Default for ListenerRegistry<K, E> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Entries {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }
}

impl<K: Copy + PartialEq, E> ListenerRegistry<K, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: K, listener: Listener<E>) -> ListenerId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = ListenerId(inner.next_id);
        inner.entries.push(Entry { id, kind, listener });
        id
    }

    /// Returns false if the listener was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|entry| entry.id != id);
        inner.entries.len() != before
    }

    /// Deliver `event` to every listener registered for `kind`, in
    /// registration order. Returns how many listeners ran.
    pub fn dispatch(&self, kind: K, event: &E) -> usize {
        let ids: Vec<ListenerId> = self
            .inner
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.id)
            .collect();

        let mut delivered = 0;
        for id in ids {
            let listener = self
                .inner
                .lock()
                .entries
                .iter()
                .find(|entry| entry.id == id)
                .map(|entry| Arc::clone(&entry.listener));

            if let Some(listener) = listener {
                listener(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: K) -> usize {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

impl<K, E> fmt::Debug for ListenerRegistry<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.inner.lock().entries.len())
            .finish()
    }
}

/// Owned handle over a set of attached listeners.
///
/// `release` detaches them and is idempotent; dropping the handle releases
/// it too, so whichever path ends the owner's lifetime detaches exactly once.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
