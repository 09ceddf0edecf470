//! Store middleware.
//!
//! Middleware wraps a store and intercepts `set`. Reads and subscriptions
//! pass straight through, so wrappers stack in any order.

use std::fmt::Debug;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{InvalidOperation, PersistenceError};
use crate::reactive::{untracked, Unsubscribe};

use super::{KeyValueStorage, Store};

/// Logs every update with the previous and the new value.
#[derive(Debug, Clone)]
pub struct Logged<S> {
    inner: S,
}

impl<S> Logged<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Store for Logged<S>
where
    S: Store,
    S::Value: Debug,
{
    type Value = S::Value;

    fn get(&self) -> S::Value {
        self.inner.get()
    }

    fn set(&self, value: S::Value) -> Result<(), InvalidOperation> {
        let prev = untracked(|| self.inner.get());
        self.inner.set(value)?;
        let next = untracked(|| self.inner.get());
        info!(target: "trellis::store", ?prev, ?next, "store updated");
        Ok(())
    }

    fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&S::Value) + Send + Sync + 'static,
    {
        self.inner.subscribe(callback)
    }
}

/// Mirrors the store's value into a key-value slot as JSON.
///
/// The slot is read once when the wrapper is created and written after
/// every successful `set`. Storage and codec failures are logged and never
/// reach the caller.
#[derive(Clone)]
pub struct Persisted<S> {
    inner: S,
    key: Arc<str>,
    storage: Arc<dyn KeyValueStorage>,
}

impl<S> Persisted<S>
where
    S: Store,
    S::Value: Serialize + DeserializeOwned,
{
    pub fn new(inner: S, key: impl Into<Arc<str>>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let persisted = Self {
            inner,
            key: key.into(),
            storage,
        };
        if let Err(err) = persisted.hydrate() {
            warn!(key = %persisted.key, error = %err, "failed to hydrate store");
        }
        persisted
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Load the stored value into the wrapped store.
    ///
    /// An absent or empty slot leaves the store untouched.
    fn hydrate(&self) -> Result<(), PersistenceError> {
        let raw = match self.storage.get(&self.key)? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(()),
        };
        let value = serde_json::from_str(&raw).map_err(|source| PersistenceError::Decode {
            key: self.key.to_string(),
            source,
        })?;
        if let Err(err) = self.inner.set(value) {
            warn!(key = %self.key, error = %err, "store rejected persisted value");
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), PersistenceError> {
        let value = untracked(|| self.inner.get());
        let raw = serde_json::to_string(&value).map_err(|source| PersistenceError::Encode {
            key: self.key.to_string(),
            source,
        })?;
        self.storage.set(&self.key, raw)?;
        Ok(())
    }
}

impl<S> Store for Persisted<S>
where
    S: Store,
    S::Value: Serialize + DeserializeOwned,
{
    type Value = S::Value;

    fn get(&self) -> S::Value {
        self.inner.get()
    }

    fn set(&self, value: S::Value) -> Result<(), InvalidOperation> {
        self.inner.set(value)?;
        if let Err(err) = self.persist() {
            warn!(key = %self.key, error = %err, "failed to persist store");
        }
        Ok(())
    }

    fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&S::Value) + Send + Sync + 'static,
    {
        self.inner.subscribe(callback)
    }
}

impl<S: Debug> Debug for Persisted<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persisted")
            .field("inner", &self.inner)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Wrap `store` so every update is logged at info level.
pub fn with_logging<S>(store: S) -> Logged<S>
where
    S: Store,
    S::Value: Debug,
{
    Logged::new(store)
}

/// Wrap `store` so its value survives in `storage` under `key`.
pub fn with_persistence<S, K>(store: S, key: &str, storage: K) -> Persisted<S>
where
    S: Store,
    S::Value: Serialize + DeserializeOwned,
    K: KeyValueStorage + 'static,
{
    Persisted::new(store, key, Arc::new(storage))
}
