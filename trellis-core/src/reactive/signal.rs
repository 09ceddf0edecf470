//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    read is recorded; when the computation finishes it joins the signal's
//!    subscriber set.
//!
//! 2. When a signal's value changes, all subscribers are handed to the
//!    scheduler, which runs them now or at the end of the current batch.
//!
//! 3. A write that leaves the value equal to the current one notifies
//!    nobody.
//!
//! # Equality
//!
//! `Signal::new` compares values with `PartialEq`. Types that want identity
//! semantics (or no comparison at all) opt in explicitly through
//! [`Signal::with_equality`], e.g. `Signal::with_equality(Arc::new(x), Arc::ptr_eq)`.
//!
//! # Thread Safety
//!
//! The value is protected by a `parking_lot::RwLock`. Locks are never held
//! while subscribers run.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::subscriber::{SourceId, Subscriber, SubscriberSet, TrackedSource, Unsubscribe};

/// Comparator deciding whether a write changed the value.
pub type Equality<T> = fn(&T, &T) -> bool;

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: SourceId,

    /// The current value.
    value: Arc<RwLock<T>>,

    /// Effects, memos and callbacks notified on change.
    subscribers: Arc<SubscriberSet>,

    /// Change detection used by `set`.
    equals: Equality<T>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal that detects changes with `PartialEq`.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_equality(value, <T as PartialEq>::eq)
    }

    /// Create a new signal with a custom change comparator.
    ///
    /// `equals(old, new)` returning `true` suppresses the notification.
    pub fn with_equality(value: T, equals: Equality<T>) -> Self {
        Self {
            id: SourceId::new(),
            value: Arc::new(RwLock::new(value)),
            subscribers: Arc::new(SubscriberSet::new()),
            equals,
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.id
    }

    fn track(&self) {
        ReactiveContext::track(TrackedSource::new(self.id, &self.subscribers));
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also records the signal as
    /// a dependency of the running computation.
    pub fn get(&self) -> T {
        self.track();
        self.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Borrow the current value, tracking the read.
    ///
    /// The value stays locked for the duration of `f`; `f` must not write to
    /// this signal.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.track();
        f(&*self.value.read())
    }

    /// Borrow the current value without tracking the read.
    pub fn with_untracked<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&*self.value.read())
    }

    /// Set a new value and notify subscribers if it changed.
    ///
    /// Returns whether a notification fired.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let mut guard = self.value.write();
            if (self.equals)(&*guard, &value) {
                false
            } else {
                *guard = value;
                true
            }
        };

        if changed {
            self.subscribers.notify();
        }
        changed
    }

    /// Compute the next value from the current one.
    ///
    /// This is the function form of [`set`](Self::set).
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.value.read();
            f(&*guard)
        };
        self.set(next)
    }

    /// Register a callback invoked after every change.
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscriber = Subscriber::new(callback);
        let handle = Unsubscribe::new(&self.subscribers, subscriber.id());
        self.subscribers.insert(subscriber);
        handle
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Split into a read half and a write half.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (ReadSignal(self.clone()), WriteSignal(self))
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            subscribers: Arc::clone(&self.subscribers),
            equals: self.equals,
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Read half of a signal created with [`create_signal`].
#[derive(Clone)]
pub struct ReadSignal<T: Clone + Send + Sync + 'static>(Signal<T>);

impl<T> ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn get(&self) -> T {
        self.0.get()
    }

    pub fn get_untracked(&self) -> T {
        self.0.get_untracked()
    }

    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.0.with(f)
    }

    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.0.subscribe(callback)
    }
}

/// Write half of a signal created with [`create_signal`].
#[derive(Clone)]
pub struct WriteSignal<T: Clone + Send + Sync + 'static>(Signal<T>);

impl<T> WriteSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn set(&self, value: T) -> bool {
        self.0.set(value)
    }

    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        self.0.update(f)
    }
}

/// Create a signal and return its read and write halves.
pub fn create_signal<T>(initial: T) -> (ReadSignal<T>, WriteSignal<T>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    Signal::new(initial).split()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::scheduler::batch;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counter(signal: &Signal<i32>) -> (Arc<AtomicI32>, Unsubscribe) {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();
        let handle = signal.subscribe(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (call_count, handle)
    }

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(5);
        assert_eq!(signal.get(), 5);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v * 2);
        assert_eq!(signal.get(), 20);
    }

    #[test]
    fn signal_notifies_subscribers_once_per_change() {
        let signal = Signal::new(0);
        let (call_count, _handle) = counter(&signal);

        assert!(signal.set(1));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        assert!(signal.set(2));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn equal_write_does_not_notify() {
        let signal = Signal::new(3);
        let (call_count, _handle) = counter(&signal);

        assert!(!signal.set(3));
        assert!(!signal.update(|v| *v));
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn custom_equality_controls_notification() {
        let first = Arc::new(vec![1, 2, 3]);
        let signal = Signal::with_equality(first.clone(), Arc::ptr_eq);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();
        let _handle = signal.subscribe(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Same allocation: no change.
        signal.set(first);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        // Structurally equal but a different allocation: changed.
        signal.set(Arc::new(vec![1, 2, 3]));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn signal_unsubscribe() {
        let signal = Signal::new(0);
        let (call_count, handle) = counter(&signal);

        signal.set(1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        handle.unsubscribe();
        handle.unsubscribe();
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(2);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batched_writes_notify_once() {
        let signal = Signal::new(0);
        let (call_count, _handle) = counter(&signal);

        batch(|| {
            signal.set(1);
            signal.set(2);
            signal.set(3);
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.get(), 3);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn create_signal_splits_read_and_write() {
        let (count, set_count) = create_signal(0);
        set_count.set(5);
        assert_eq!(count.get(), 5);

        set_count.update(|v| v + 1);
        assert_eq!(count.with(|v| *v), 6);
    }
}
