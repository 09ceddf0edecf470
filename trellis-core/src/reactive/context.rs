//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the read is recorded against the current computation.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When entering a reactive context (e.g., running a memo or effect), we push
//! an entry onto the stack. When the computation completes, we pop it and the
//! computation reconciles its subscriptions against the sources it read.
//!
//! This design supports nested reactive contexts (e.g., an effect that reads
//! a memo, which itself reads a signal). An untracked entry on top of the
//! stack suspends tracking for everything that runs inside it.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::subscriber::{SubscriberId, TrackedSource};

/// Sources read by a single run, in first-read order.
pub type TrackedSources = SmallVec<[TrackedSource; 4]>;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug)]
struct ContextEntry {
    /// The computation being tracked. `None` marks an untracked region.
    subscriber_id: Option<SubscriberId>,
    /// Sources read during this computation, deduplicated by ID.
    sources: TrackedSources,
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is on top of the stack, every signal read is
    /// recorded against `subscriber_id`.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Some(subscriber_id))
    }

    /// Enter an untracked region. Reads inside it are not recorded anywhere.
    pub fn suspend() -> Self {
        Self::push(None)
    }

    fn push(subscriber_id: Option<SubscriberId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                sources: SmallVec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the subscriber ID of the computation being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.subscriber_id))
    }

    /// Record a read of the given source.
    ///
    /// Called by signals and memos when they are read.
    pub fn track(source: TrackedSource) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.subscriber_id.is_none() {
                    return;
                }
                if !entry.sources.iter().any(|seen| seen.id == source.id) {
                    entry.sources.push(source);
                }
            }
        });
    }

    /// Take the sources recorded by the innermost context.
    pub fn take_sources() -> TrackedSources {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .map(|entry| std::mem::take(&mut entry.sources))
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

/// Run `f` without recording any of its reads.
pub fn untracked<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _ctx = ReactiveContext::suspend();
    f()
}
