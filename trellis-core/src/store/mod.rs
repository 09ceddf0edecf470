//! Stores
//!
//! A store is a signal with its own subscriber list and a `set` that can be
//! wrapped by middleware. Stores are the unit of shared application state.
//!
//! # Layers
//!
//! - [`SignalStore`] owns exactly one [`Signal`] and is the base of every
//!   stack.
//! - [`Selector`] is a read-only store derived from another store.
//! - [`Logged`] and [`Persisted`] wrap any store and intercept `set`.
//!
//! Every layer implements [`Store`], so middleware composes:
//!
//! ```rust
//! use trellis_core::store::{create_store, with_logging, with_persistence, MemoryStorage, Store};
//!
//! let storage = MemoryStorage::new();
//! let cart = with_logging(with_persistence(create_store(0u32), "cart", storage.clone()));
//! cart.set(3).unwrap();
//! assert_eq!(storage.raw("cart").as_deref(), Some("3"));
//! ```

mod middleware;
mod selector;
mod storage;

use std::sync::Arc;

use crate::error::InvalidOperation;
use crate::reactive::{untracked, Signal, Subscriber, SubscriberSet, Unsubscribe};

pub use middleware::{with_logging, with_persistence, Logged, Persisted};
pub use selector::{create_selector, Selector};
pub use storage::{KeyValueStorage, MemoryStorage};

/// Common interface of stores and store middleware.
pub trait Store: Send + Sync {
    type Value: Clone + Send + Sync + 'static;

    /// Read the current value. Tracked inside effects and memos.
    fn get(&self) -> Self::Value;

    /// Replace the value.
    ///
    /// Fails only for read-only stores.
    fn set(&self, value: Self::Value) -> Result<(), InvalidOperation>;

    /// Register a callback invoked with the new value after each change.
    fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&Self::Value) + Send + Sync + 'static;

    /// Compute the next value from the current one and `set` it.
    ///
    /// Goes through `set`, so middleware sees the update.
    fn update<F>(&self, f: F) -> Result<(), InvalidOperation>
    where
        F: FnOnce(&Self::Value) -> Self::Value,
        Self: Sized,
    {
        let current = untracked(|| self.get());
        self.set(f(&current))
    }
}

/// A store backed by a single signal.
pub struct SignalStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    signal: Signal<T>,
    /// Store-level subscribers, separate from the signal's own set.
    listeners: Arc<SubscriberSet>,
}

impl<T> SignalStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self
    where
        T: PartialEq,
    {
        Self::from_signal(Signal::new(initial))
    }

    /// Wrap an existing signal. The store shares the signal's value.
    pub fn from_signal(signal: Signal<T>) -> Self {
        Self {
            signal,
            listeners: Arc::new(SubscriberSet::new()),
        }
    }

    /// The owned signal.
    pub fn signal(&self) -> &Signal<T> {
        &self.signal
    }

    /// Write the value and notify store subscribers if it changed.
    pub fn replace(&self, value: T) -> bool {
        let changed = self.signal.set(value);
        if changed {
            self.listeners.notify();
        }
        changed
    }

    /// Get the number of store-level subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<T> Store for SignalStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn get(&self) -> T {
        self.signal.get()
    }

    fn set(&self, value: T) -> Result<(), InvalidOperation> {
        self.replace(value);
        Ok(())
    }

    fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let signal = self.signal.clone();
        let subscriber = Subscriber::new(move || {
            let value = signal.get_untracked();
            callback(&value);
        });
        let handle = Unsubscribe::new(&self.listeners, subscriber.id());
        self.listeners.insert(subscriber);
        handle
    }
}

impl<T> Clone for SignalStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T> std::fmt::Debug for SignalStore<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalStore")
            .field("signal", &self.signal)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a store holding `initial`.
pub fn create_store<T>(initial: T) -> SignalStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    SignalStore::new(initial)
}

/// Split a store into getter and setter closures for view code.
pub fn use_store<S>(
    store: &S,
) -> (
    impl Fn() -> S::Value + Send + Sync + 'static,
    impl Fn(S::Value) -> Result<(), InvalidOperation> + Send + Sync + 'static,
)
where
    S: Store + Clone + 'static,
{
    let reader = store.clone();
    let writer = store.clone();
    (move || reader.get(), move |value| writer.set(value))
}
