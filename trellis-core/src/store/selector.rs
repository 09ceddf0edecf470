//! Derived read-only stores.
//!
//! A selector mirrors `select(upstream.get())`. An internal effect reads the
//! upstream store, so the mirror is refreshed whenever upstream changes, and
//! selector subscribers only hear about changes to the derived value.

use std::fmt;
use std::sync::Arc;

use crate::error::InvalidOperation;
use crate::reactive::{untracked, Effect, Unsubscribe};

use super::{SignalStore, Store};

struct SelectorInner<R>
where
    R: Clone + Send + Sync + 'static,
{
    mirror: SignalStore<R>,
    refresh: Effect,
}

impl<R> Drop for SelectorInner<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.refresh.dispose();
    }
}

/// A read-only store derived from another store.
///
/// Dropping the last handle stops following upstream.
pub struct Selector<R>
where
    R: Clone + Send + Sync + 'static,
{
    inner: Arc<SelectorInner<R>>,
}

impl<R> Selector<R>
where
    R: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new<S, F>(upstream: &S, select: F) -> Self
    where
        S: Store + Clone + 'static,
        F: Fn(&S::Value) -> R + Send + Sync + 'static,
    {
        let initial = untracked(|| select(&upstream.get()));
        let mirror = SignalStore::new(initial);

        let source = upstream.clone();
        let target = mirror.clone();
        let refresh = Effect::new(move || {
            let derived = select(&source.get());
            target.replace(derived);
        });

        Self {
            inner: Arc::new(SelectorInner { mirror, refresh }),
        }
    }
}

impl<R> Selector<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Stop following upstream. The last derived value stays readable.
    pub fn dispose(&self) {
        self.inner.refresh.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.refresh.is_disposed()
    }
}

impl<R> Store for Selector<R>
where
    R: Clone + Send + Sync + 'static,
{
    type Value = R;

    fn get(&self) -> R {
        self.inner.mirror.get()
    }

    fn set(&self, _value: R) -> Result<(), InvalidOperation> {
        Err(InvalidOperation::SetOnSelector)
    }

    fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.inner.mirror.subscribe(callback)
    }
}

impl<R> Clone for Selector<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for Selector<R>
where
    R: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("value", &self.inner.mirror.signal().get_untracked())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Derive a read-only store from `upstream`.
pub fn create_selector<S, R, F>(upstream: &S, select: F) -> Selector<R>
where
    S: Store + Clone + 'static,
    R: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&S::Value) -> R + Send + Sync + 'static,
{
    Selector::new(upstream, select)
}
