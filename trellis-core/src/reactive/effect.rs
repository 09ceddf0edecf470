//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately to establish
//!    initial dependencies.
//!
//! 2. The body runs inside a [`ReactiveContext`]; every signal or memo read
//!    during the run is recorded.
//!
//! 3. After the run, the effect reconciles its subscriptions: it leaves the
//!    sources it no longer read and joins the new ones. The dependency graph
//!    therefore prunes itself on every run.
//!
//! 4. When any dependency changes, the scheduler re-runs the effect, either
//!    immediately or once at the end of the enclosing batch.
//!
//! # Cleanup
//!
//! The body may return a [`Cleanup`]. It runs before the next run and when
//! the effect is disposed.
//!
//! # Lifetime
//!
//! Subscribed sources hold the effect, so it keeps running after its handle
//! is dropped. [`Effect::dispose`] is the only way to stop it; disposing
//! releases the body and everything it captured.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::context::ReactiveContext;
use super::subscriber::{Dependencies, Subscriber, SubscriberId};

/// Teardown returned by an effect body.
pub struct Cleanup(Box<dyn FnOnce() + Send>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(f))
    }

    fn run(self) {
        (self.0)();
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect body may return.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

type Body = Box<dyn FnMut() -> Option<Cleanup> + Send>;

struct EffectInner {
    /// Identity used in subscriber sets and batch deduplication.
    id: SubscriberId,
    body: Mutex<Body>,
    cleanup: Mutex<Option<Cleanup>>,
    dependencies: Mutex<Dependencies>,
    /// Shared with the effect's subscriber registrations.
    running: Arc<AtomicBool>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Signal::new(0);
///
/// let (count_in, seen_in) = (count.clone(), seen.clone());
/// let effect = Effect::new(move || {
///     seen_in.set(count_in.get());
/// });
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// effect.dispose();
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

/// Resets the running flag when a run ends, even by panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Effect {
    /// Create a new effect and run it immediately.
    pub fn new<F, R>(body: F) -> Self
    where
        F: FnMut() -> R + Send + 'static,
        R: IntoCleanup,
    {
        let effect = Self::new_lazy(body);
        effect.run();
        effect
    }

    /// Create a new effect without running it.
    ///
    /// It has no dependencies until [`run`](Self::run) is first called.
    pub fn new_lazy<F, R>(mut body: F) -> Self
    where
        F: FnMut() -> R + Send + 'static,
        R: IntoCleanup,
    {
        Self {
            inner: Arc::new(EffectInner {
                id: SubscriberId::new(),
                body: Mutex::new(Box::new(move || body().into_cleanup())),
                cleanup: Mutex::new(None),
                dependencies: Mutex::new(Dependencies::new()),
                running: Arc::new(AtomicBool::new(false)),
                disposed: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the subscriber ID for this effect.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// The registration this effect places in the sets of its sources.
    fn subscriber(&self) -> Subscriber {
        let effect = self.clone();
        Subscriber::with_id(self.inner.id, move || effect.run())
            .guarded_by(Arc::clone(&self.inner.running))
    }

    /// Run the body now.
    ///
    /// Runs the previous cleanup first. A call made while the body is
    /// already executing is ignored.
    pub fn run(&self) {
        if self.is_disposed() {
            return;
        }
        if self.inner.running.swap(true, Ordering::SeqCst) {
            trace!(effect = ?self.inner.id, "skipping re-entrant effect run");
            return;
        }
        let _running = RunningGuard(&self.inner.running);

        let previous = self.inner.cleanup.lock().take();
        if let Some(cleanup) = previous {
            cleanup.run();
        }

        let (cleanup, sources) = {
            let _ctx = ReactiveContext::enter(self.inner.id);
            let mut body = self.inner.body.lock();
            let cleanup = (&mut **body)();
            (cleanup, ReactiveContext::take_sources())
        };

        if self.is_disposed() {
            // Disposed from inside its own body: nothing to subscribe to.
            let released = std::mem::replace(&mut *self.inner.body.lock(), Box::new(|| None));
            drop(released);
            if let Some(cleanup) = cleanup {
                cleanup.run();
            }
            return;
        }

        self.inner
            .dependencies
            .lock()
            .reconcile(sources, &self.subscriber());
        *self.inner.cleanup.lock() = cleanup;

        let runs = self.inner.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(effect = ?self.inner.id, runs, "effect ran");
    }

    /// Stop the effect.
    ///
    /// Unsubscribes from every source, runs the last cleanup and releases
    /// the body. Calling it again is a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.dependencies.lock().clear(self.inner.id);

        let cleanup = self.inner.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }

        // Locked when disposing from inside the body; `run` releases it
        // once the body returns.
        let released = self
            .inner
            .body
            .try_lock()
            .map(|mut body| std::mem::replace(&mut *body, Box::new(|| None)));
        drop(released);
        trace!(effect = ?self.inner.id, "effect disposed");
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Check if the body is executing.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Get the number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of sources the effect is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.lock().len()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Register an effect and run it immediately.
pub fn effect<F, R>(body: F) -> Effect
where
    F: FnMut() -> R + Send + 'static,
    R: IntoCleanup,
{
    Effect::new(body)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
