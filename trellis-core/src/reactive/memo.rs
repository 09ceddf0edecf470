//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation inside a
//!    [`ReactiveContext`] and caches the result.
//!
//! 2. The signals read by the computation are tracked like an effect's; the
//!    memo subscribes to them with an invalidation callback.
//!
//! 3. When a dependency changes, the memo is marked dirty at once (even
//!    inside a batch) and notifies its own dependents.
//!
//! 4. On the next access, a dirty memo recomputes.
//!
//! # Why This Matters
//!
//! This "lazy" approach avoids unnecessary recomputation: a memo nobody
//! reads stays dirty and costs nothing. A memo is also a source: an effect
//! that reads it re-runs when the memo is invalidated.
//!
//! # Lifetime
//!
//! Unlike effects, memos are held only by their handles. The invalidation
//! callback holds a weak reference, and dropping the last handle removes
//! the memo from every signal it subscribed to.

use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::context::ReactiveContext;
use super::subscriber::{
    Dependencies, SourceId, Subscriber, SubscriberId, SubscriberSet, TrackedSource,
};

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// The memo needs to recompute before its value can be returned.
    Dirty,
}

struct MemoInner<T> {
    /// Identity as a subscriber of the signals it reads.
    subscriber_id: SubscriberId,

    /// Identity as a source read by effects and other memos.
    source_id: SourceId,

    compute: Box<dyn Fn() -> T + Send + Sync>,

    /// The cached value (None if never computed).
    value: RwLock<Option<T>>,

    state: Mutex<MemoState>,

    dependencies: Mutex<Dependencies>,

    /// Computations that read this memo.
    dependents: Arc<SubscriberSet>,
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        self.dependencies.get_mut().clear(self.subscriber_id);
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{Memo, Signal};
///
/// let count = Signal::new(2);
/// let count_in = count.clone();
/// let doubled = Memo::new(move || count_in.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(MemoInner {
                subscriber_id: SubscriberId::new(),
                source_id: SourceId::new(),
                compute: Box::new(compute),
                value: RwLock::new(None),
                state: Mutex::new(MemoState::Dirty),
                dependencies: Mutex::new(Dependencies::new()),
                dependents: Arc::new(SubscriberSet::new()),
            }),
        }
    }

    /// Get the memo's unique source ID.
    pub fn id(&self) -> SourceId {
        self.inner.source_id
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        ReactiveContext::track(TrackedSource::new(
            self.inner.source_id,
            &self.inner.dependents,
        ));

        if self.state() == MemoState::Clean {
            if let Some(value) = self.inner.value.read().clone() {
                return value;
            }
        }
        self.recompute()
    }

    /// Mark the memo as needing recomputation and notify its dependents.
    ///
    /// Only the clean-to-dirty transition notifies.
    pub fn mark_dirty(&self) {
        Self::invalidate(&self.inner);
    }

    fn invalidate(inner: &MemoInner<T>) {
        let was_clean = {
            let mut state = inner.state.lock();
            let was_clean = *state == MemoState::Clean;
            *state = MemoState::Dirty;
            was_clean
        };
        if was_clean {
            inner.dependents.notify();
        }
    }

    /// The callback registered on every signal this memo reads.
    fn invalidator(&self) -> Subscriber {
        let weak: Weak<MemoInner<T>> = Arc::downgrade(&self.inner);
        Subscriber::with_id(self.inner.subscriber_id, move || {
            if let Some(inner) = weak.upgrade() {
                Self::invalidate(&inner);
            }
        })
        .immediate()
    }

    fn recompute(&self) -> T {
        let (value, sources) = {
            let _ctx = ReactiveContext::enter(self.inner.subscriber_id);
            let value = (self.inner.compute)();
            (value, ReactiveContext::take_sources())
        };

        self.inner
            .dependencies
            .lock()
            .reconcile(sources, &self.invalidator());
        *self.inner.value.write() = Some(value.clone());
        *self.inner.state.lock() = MemoState::Clean;

        value
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.lock()
    }

    /// Get the number of computations reading this memo.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.len()
    }

    /// Get the number of sources this memo reads.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.lock().len()
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.source_id)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

/// Create a lazily cached derived value.
pub fn memo<T, F>(compute: F) -> Memo<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Memo::new(compute)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
