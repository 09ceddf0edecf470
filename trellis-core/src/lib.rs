//! Trellis Core
//!
//! This crate provides the state runtime for the Trellis UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects) with automatic,
//!   self-pruning dependency tracking
//! - A batching scheduler that coalesces notifications
//! - Stores with composable middleware (logging, persistence, selectors)
//! - A validation-driven form engine
//!
//! Rendering, routing and animation live in the view layer, which only
//! consumes the public signal, store and form interfaces.
//!
//! # Architecture
//!
//! - `reactive`: signals, memos, effects, batching and dependency tracking
//! - `store`: stores, selectors, middleware and storage backends
//! - `runtime`: per-application registry of named stores and context values
//! - `form`: form state, validation rules and submission
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use trellis_core::reactive::{batch, Effect, Memo, Signal};
//!
//! let count = Signal::new(0);
//!
//! let count_in = count.clone();
//! let doubled = Memo::new(move || count_in.get() * 2);
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let (count_in, doubled_in, log_in) = (count.clone(), doubled.clone(), log.clone());
//! let effect = Effect::new(move || {
//!     log_in.lock().unwrap().push((count_in.get(), doubled_in.get()));
//! });
//!
//! batch(|| {
//!     count.set(4);
//!     count.set(5);
//! });
//!
//! assert_eq!(*log.lock().unwrap(), vec![(0, 0), (5, 10)]);
//! effect.dispose();
//! ```

pub mod error;
pub mod form;
pub mod reactive;
pub mod runtime;
pub mod store;

pub use error::{InvalidOperation, PersistenceError, StorageError, SubmitError};
pub use form::{create_form, Form, FormConfig, SubmitOutcome};
pub use reactive::{batch, create_signal, effect, memo, untracked, Effect, Memo, Signal};
pub use runtime::{Context, Runtime};
pub use store::{create_selector, create_store, use_store, with_logging, with_persistence, Store};
