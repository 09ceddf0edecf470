//! Subscriber types for the reactive system.
//!
//! A Subscriber is anything that wants to hear about changes to a reactive
//! source: an effect, a memo, or a plain callback registered by the view
//! layer. Each source owns a [`SubscriberSet`]; computations keep a
//! [`Dependencies`] record of the sets they joined so they can leave the
//! ones they no longer read.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

/// Unique identifier for a subscriber.
///
/// Each subscriber (effect, memo, or callback) gets a unique ID when created.
/// The ID is the identity used to deduplicate subscriptions and batched
/// notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a reactive source (a signal or a memo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscriber to reactive values.
///
/// Cloning a subscriber yields another handle to the same registration: the
/// ID and callback are shared.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    notify: Arc<dyn Fn() + Send + Sync>,
    /// Set while the owning computation executes. A subscriber that is
    /// running ignores notifications instead of re-entering itself.
    running: Option<Arc<AtomicBool>>,
    /// Immediate subscribers bypass batching (memo invalidation).
    immediate: bool,
}

impl Subscriber {
    /// Create a new subscriber with a fresh ID.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_id(SubscriberId::new(), notify)
    }

    /// Create a subscriber for an existing ID.
    pub fn with_id<F>(id: SubscriberId, notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id,
            notify: Arc::new(notify),
            running: None,
            immediate: false,
        }
    }

    /// Tie this subscriber to a running flag.
    pub(crate) fn guarded_by(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    /// Deliver notifications to this subscriber even inside a batch.
    pub(crate) fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the owning computation is currently executing.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Invoke the callback directly, bypassing the scheduler.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .field("immediate", &self.immediate)
            .finish()
    }
}

/// The set of subscribers registered on one reactive source.
///
/// Entries are keyed by [`SubscriberId`], so registering the same subscriber
/// twice is a no-op. Insertion order is the notification order.
#[derive(Default)]
pub struct SubscriberSet {
    entries: Mutex<IndexMap<SubscriberId, Subscriber>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Returns `false` if its ID was already present.
    pub fn insert(&self, subscriber: Subscriber) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(&subscriber.id) {
            return false;
        }
        entries.insert(subscriber.id, subscriber);
        true
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn remove(&self, id: SubscriberId) -> bool {
        self.entries.lock().shift_remove(&id).is_some()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy the current subscribers out of the lock.
    ///
    /// Callbacks must never run while the set is locked: they are free to
    /// subscribe and unsubscribe.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.entries.lock().values().cloned().collect()
    }

    /// Hand every current subscriber to the scheduler.
    ///
    /// Immediate subscribers (memo invalidators) go first, and the fan-out
    /// runs as one batch. A computation that reads both this source and a
    /// memo derived from it therefore runs once, after the memo is dirty.
    pub fn notify(&self) {
        let (immediate, deferred): (Vec<_>, Vec<_>) = self
            .snapshot()
            .into_iter()
            .partition(Subscriber::is_immediate);
        if immediate.is_empty() && deferred.is_empty() {
            return;
        }

        super::scheduler::batch(|| {
            for subscriber in immediate.into_iter().chain(deferred) {
                super::scheduler::schedule(subscriber);
            }
        });
    }
}

impl fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("len", &self.len())
            .finish()
    }
}

/// Handle that removes exactly one registration from a subscriber set.
///
/// Calling [`unsubscribe`](Self::unsubscribe) more than once is a no-op.
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone)]
#[must_use = "dropping the handle leaves the subscription registered"]
pub struct Unsubscribe {
    set: Weak<SubscriberSet>,
    id: SubscriberId,
}

impl Unsubscribe {
    pub(crate) fn new(set: &Arc<SubscriberSet>, id: SubscriberId) -> Self {
        Self {
            set: Arc::downgrade(set),
            id,
        }
    }

    /// The ID of the registration this handle removes.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the registration.
    pub fn unsubscribe(&self) {
        if let Some(set) = self.set.upgrade() {
            set.remove(self.id);
        }
    }
}

/// A source read during a tracked computation.
#[derive(Debug, Clone)]
pub struct TrackedSource {
    pub id: SourceId,
    pub subscribers: Weak<SubscriberSet>,
}

impl TrackedSource {
    pub fn new(id: SourceId, subscribers: &Arc<SubscriberSet>) -> Self {
        Self {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }
}

/// The sources one computation is currently subscribed to.
///
/// Holds weak references only: a computation never keeps a source alive.
#[derive(Debug, Default)]
pub struct Dependencies {
    sources: IndexMap<SourceId, Weak<SubscriberSet>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dependency set with the sources read by the latest run.
    ///
    /// Leaves every source that was not read this time and joins every
    /// source read for the first time. Sources read in both runs keep their
    /// existing registration.
    pub fn reconcile<I>(&mut self, tracked: I, subscriber: &Subscriber)
    where
        I: IntoIterator<Item = TrackedSource>,
    {
        let mut next: IndexMap<SourceId, Weak<SubscriberSet>> = IndexMap::new();
        for source in tracked {
            next.entry(source.id).or_insert(source.subscribers);
        }

        for (id, set) in &self.sources {
            if !next.contains_key(id) {
                if let Some(set) = set.upgrade() {
                    set.remove(subscriber.id());
                    debug!(subscriber = ?subscriber.id(), source = ?id, "dropped stale dependency");
                }
            }
        }

        for (id, set) in &next {
            if !self.sources.contains_key(id) {
                if let Some(set) = set.upgrade() {
                    set.insert(subscriber.clone());
                    debug!(subscriber = ?subscriber.id(), source = ?id, "added dependency");
                }
            }
        }

        self.sources = next;
    }

    /// Leave every source.
    pub fn clear(&mut self, id: SubscriberId) {
        for set in self.sources.values() {
            if let Some(set) = set.upgrade() {
                set.remove(id);
            }
        }
        self.sources.clear();
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_notify_calls_callback() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let subscriber = Subscriber::new(move || {
            called_clone.store(true, Ordering::SeqCst);
        });

        assert!(!called.load(Ordering::SeqCst));
        subscriber.notify();
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn set_deduplicates_by_id() {
        let set = SubscriberSet::new();
        let subscriber = Subscriber::new(|| {});

        assert!(set.insert(subscriber.clone()));
        assert!(!set.insert(subscriber.clone()));
        assert_eq!(set.len(), 1);

        assert!(set.remove(subscriber.id()));
        assert!(!set.remove(subscriber.id()));
        assert!(set.is_empty());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let set = Arc::new(SubscriberSet::new());
        let keep = Subscriber::new(|| {});
        let drop_me = Subscriber::new(|| {});
        set.insert(keep.clone());
        set.insert(drop_me.clone());

        let handle = Unsubscribe::new(&set, drop_me.id());
        handle.unsubscribe();
        handle.unsubscribe();

        assert_eq!(set.len(), 1);
        assert!(set.contains(keep.id()));
    }

    #[test]
    fn running_subscriber_reports_busy() {
        let flag = Arc::new(AtomicBool::new(false));
        let subscriber = Subscriber::new(|| {}).guarded_by(flag.clone());

        assert!(!subscriber.is_running());
        flag.store(true, Ordering::SeqCst);
        assert!(subscriber.is_running());
    }

    #[test]
    fn notify_delivers_immediate_subscribers_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new();

        let deferred_order = order.clone();
        set.insert(Subscriber::new(move || deferred_order.lock().push("deferred")));
        let immediate_order = order.clone();
        set.insert(Subscriber::new(move || immediate_order.lock().push("immediate")).immediate());

        set.notify();
        assert_eq!(*order.lock(), vec!["immediate", "deferred"]);
    }

    #[test]
    fn reconcile_prunes_and_adds() {
        let a = Arc::new(SubscriberSet::new());
        let b = Arc::new(SubscriberSet::new());
        let a_id = SourceId::new();
        let b_id = SourceId::new();

        let hits = Arc::new(AtomicI32::new(0));
        let hits_clone = hits.clone();
        let subscriber = Subscriber::new(move || {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut deps = Dependencies::new();
        deps.reconcile([TrackedSource::new(a_id, &a)], &subscriber);
        assert!(a.contains(subscriber.id()));
        assert!(!b.contains(subscriber.id()));

        deps.reconcile([TrackedSource::new(b_id, &b)], &subscriber);
        assert!(!a.contains(subscriber.id()));
        assert!(b.contains(subscriber.id()));
        assert_eq!(deps.len(), 1);
        assert!(deps.contains(b_id));

        deps.clear(subscriber.id());
        assert!(b.is_empty());
        assert!(deps.is_empty());
    }
}
