//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, effects
//! and the batching scheduler. These primitives form the foundation that
//! stores and forms are built on.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the read is
//! recorded. When the signal's value changes, all dependents are notified.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only
//! when one of its dependencies changes, and only when it is read.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects synchronize reactive state with the outside
//! world.
//!
//! ## Batches
//!
//! [`batch`] defers notifications until a block of writes completes, so each
//! dependent runs once and sees only the final values.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking stack to detect
//! dependencies automatically, and a thread-local scheduler for batching.
//! Execution is synchronous: writes and the re-runs they trigger happen on
//! the caller's stack.

mod context;
mod effect;
mod memo;
mod scheduler;
mod signal;
mod subscriber;

pub use context::{untracked, ReactiveContext, TrackedSources};
pub use effect::{effect, Cleanup, Effect, IntoCleanup};
pub use memo::{memo, Memo, MemoState};
pub use scheduler::{batch, is_batching, schedule};
pub use signal::{create_signal, Equality, ReadSignal, Signal, WriteSignal};
pub use subscriber::{
    Dependencies, SourceId, Subscriber, SubscriberId, SubscriberSet, TrackedSource, Unsubscribe,
};
