//! Update Scheduler
//!
//! The scheduler decides whether a notification is delivered now or later.
//!
//! # Algorithm
//!
//! Outside a batch a direct [`schedule`] runs synchronously on the caller's
//! stack. A source's fan-out to its subscribers always runs as a batch of its
//! own, so one write counts as one batch. Inside a batch:
//!
//! 1. Each notified subscriber is added to a pending set keyed by its
//!    [`SubscriberId`]. Repeated notifications of the same subscriber
//!    collapse into one entry, no matter how many writes caused them.
//! 2. Nested `batch` calls only bump a depth counter; they never flush.
//! 3. When the outermost batch returns, the pending set is drained and each
//!    subscriber runs once. The scheduler stays in batching mode while it
//!    drains, so writes made by those subscribers are coalesced into a
//!    follow-up round. Rounds repeat until nothing is pending.
//!
//! Because every subscriber runs after the writes that triggered it, each
//! one observes the final value of the signals it depends on.
//!
//! A subscriber whose computation is already running is never scheduled:
//! a self-triggering effect is ignored rather than re-entered.

use std::cell::RefCell;

use indexmap::IndexMap;
use tracing::{trace, warn};

use super::subscriber::{Subscriber, SubscriberId};

/// Upper bound on follow-up rounds in a single flush. Reaching it means two
/// computations keep re-triggering each other.
const MAX_FLUSH_ROUNDS: usize = 100;

thread_local! {
    static SCHEDULER: RefCell<Scheduler> = RefCell::new(Scheduler::default());
}

#[derive(Default)]
struct Scheduler {
    /// Number of `batch` calls currently on the stack.
    depth: usize,
    /// Deferred notifications, deduplicated by subscriber identity.
    pending: IndexMap<SubscriberId, Subscriber>,
}

/// Deliver a notification now, or defer it if a batch is active.
pub fn schedule(subscriber: Subscriber) {
    if subscriber.is_running() {
        trace!(subscriber = ?subscriber.id(), "ignoring notification for running computation");
        return;
    }

    if subscriber.is_immediate() {
        subscriber.notify();
        return;
    }

    let immediate = SCHEDULER.with(|scheduler| {
        let mut scheduler = scheduler.borrow_mut();
        if scheduler.depth == 0 {
            return Some(subscriber);
        }
        scheduler
            .pending
            .entry(subscriber.id())
            .or_insert(subscriber);
        None
    });

    if let Some(subscriber) = immediate {
        subscriber.notify();
    }
}

/// Check whether a batch is active on this thread.
pub fn is_batching() -> bool {
    SCHEDULER.with(|scheduler| scheduler.borrow().depth > 0)
}

/// Run `f` with notification delivery deferred until it returns.
///
/// Every distinct subscriber notified inside `f` runs exactly once after
/// the outermost batch completes. Nested batches are absorbed into the
/// outer one.
pub fn batch<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let scope = BatchScope::enter();
    let result = f();
    if scope.outermost {
        flush();
    }
    drop(scope);
    result
}

/// Guard for one level of batching.
///
/// Dropping the outermost scope discards anything still pending, which only
/// happens when the batched closure or a flushed subscriber panicked.
struct BatchScope {
    outermost: bool,
}

impl BatchScope {
    fn enter() -> Self {
        let outermost = SCHEDULER.with(|scheduler| {
            let mut scheduler = scheduler.borrow_mut();
            scheduler.depth += 1;
            scheduler.depth == 1
        });
        Self { outermost }
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        SCHEDULER.with(|scheduler| {
            let mut scheduler = scheduler.borrow_mut();
            scheduler.depth = scheduler.depth.saturating_sub(1);
            if scheduler.depth == 0 {
                scheduler.pending.clear();
            }
        });
    }
}

fn flush() {
    for round in 0.. {
        let pending = SCHEDULER.with(|scheduler| std::mem::take(&mut scheduler.borrow_mut().pending));
        if pending.is_empty() {
            return;
        }
        if round == MAX_FLUSH_ROUNDS {
            warn!(
                rounds = MAX_FLUSH_ROUNDS,
                dropped = pending.len(),
                "batch flush did not settle; dropping pending notifications"
            );
            return;
        }

        trace!(round, count = pending.len(), "flushing batched notifications");
        for (_, subscriber) in pending {
            if !subscriber.is_running() {
                subscriber.notify();
            }
        }
    }
}
