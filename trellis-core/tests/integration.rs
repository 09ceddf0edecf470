//! Integration Tests for the Reactive System and Stores
//!
//! These tests verify that signals, memos, effects, batches and stores work
//! together correctly through the public API.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use trellis_core::reactive::{batch, create_signal, untracked, Cleanup, Effect, Memo, Signal};
use trellis_core::store::{
    create_selector, create_store, with_logging, with_persistence, MemoryStorage, Store,
};
use trellis_core::{InvalidOperation, Runtime};

/// Test the basic signal scenario: create, set, get.
#[test]
fn signal_set_then_get() {
    let (count, set_count) = create_signal(0);
    set_count.set(5);
    assert_eq!(count.get(), 5);
}

/// Test that an effect tracks signal dependencies without manual wiring.
#[test]
fn effect_tracks_signal_dependency() {
    let signal = Signal::new(0);
    let observed_value = Arc::new(AtomicI32::new(-1));
    let observed_clone = observed_value.clone();

    let signal_clone = signal.clone();
    let effect = Effect::new(move || {
        observed_clone.store(signal_clone.get(), Ordering::SeqCst);
    });

    // Effect runs on creation, captures initial value
    assert_eq!(observed_value.load(Ordering::SeqCst), 0);

    signal.set(42);
    assert_eq!(observed_value.load(Ordering::SeqCst), 42);
    assert_eq!(effect.run_count(), 2);
}

/// Test that memos can depend on other memos and invalidate automatically.
#[test]
fn memo_depends_on_memo() {
    let base_signal = Signal::new(5);

    let signal_clone = base_signal.clone();
    let doubled = Memo::new(move || signal_clone.get() * 2);

    let doubled_clone = doubled.clone();
    let plus_ten = Memo::new(move || doubled_clone.get() + 10);

    assert_eq!(doubled.get(), 10);
    assert_eq!(plus_ten.get(), 20);

    base_signal.set(10);

    assert_eq!(doubled.get(), 20);
    assert_eq!(plus_ten.get(), 30);
}

/// Test that a batch re-runs each dependent effect once with the final value.
#[test]
fn batch_coalesces_effect_reruns() {
    let signal = Signal::new('a');
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let signal_clone = signal.clone();
    let _effect = Effect::new(move || {
        seen_clone.lock().unwrap().push(signal_clone.get());
    });

    batch(|| {
        signal.set('b');
        signal.set('c');
        batch(|| signal.set('d'));
    });

    assert_eq!(*seen.lock().unwrap(), vec!['a', 'd']);
}

/// Test that an effect reading a signal and a memo of it runs once per write.
#[test]
fn effect_reading_signal_and_its_memo_runs_once() {
    let count = Signal::new(1);
    let count_in = count.clone();
    let doubled = Memo::new(move || count_in.get() * 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (count_in, doubled_in, seen_in) = (count.clone(), doubled.clone(), seen.clone());
    let effect = Effect::new(move || {
        seen_in.lock().unwrap().push((count_in.get(), doubled_in.get()));
    });

    count.set(5);

    assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (5, 10)]);
    assert_eq!(effect.run_count(), 2);
    effect.dispose();
}

/// Test that a memo re-subscribing after a prune is still fresh for an
/// effect registered before it on the shared signal.
#[test]
fn effect_sees_fresh_memo_after_memo_resubscribes() {
    let toggle = Signal::new(true);
    let count = Signal::new(1);
    let (toggle_in, count_in) = (toggle.clone(), count.clone());
    let gated = Memo::new(move || if toggle_in.get() { count_in.get() * 2 } else { 0 });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (count_in, gated_in, seen_in) = (count.clone(), gated.clone(), seen.clone());
    let effect = Effect::new(move || {
        seen_in.lock().unwrap().push((count_in.get(), gated_in.get()));
    });

    toggle.set(false);
    toggle.set(true);
    seen.lock().unwrap().clear();

    count.set(5);

    assert_eq!(*seen.lock().unwrap(), vec![(5, 10)]);
    effect.dispose();
}

/// Test that stale dependencies are pruned on re-run.
#[test]
fn effect_prunes_branch_it_stopped_reading() {
    let use_left = Signal::new(true);
    let left = Signal::new(1);
    let right = Signal::new(2);
    let runs = Arc::new(AtomicUsize::new(0));

    let (use_left_in, left_in, right_in, runs_in) =
        (use_left.clone(), left.clone(), right.clone(), runs.clone());
    let effect = Effect::new(move || {
        runs_in.fetch_add(1, Ordering::SeqCst);
        if use_left_in.get() {
            left_in.get();
        } else {
            right_in.get();
        }
    });
    assert_eq!(effect.dependency_count(), 2);

    use_left.set(false);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(left.subscriber_count(), 0);

    left.set(10);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    right.set(20);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// Test disposal: idempotent, runs cleanup once, stops reacting.
#[test]
fn disposed_effect_does_not_run() {
    let signal = Signal::new(0);
    let run_count = Arc::new(AtomicI32::new(0));
    let cleanups = Arc::new(AtomicI32::new(0));
    let (run_clone, cleanup_clone, signal_clone) =
        (run_count.clone(), cleanups.clone(), signal.clone());

    let effect = Effect::new(move || {
        signal_clone.get();
        run_clone.fetch_add(1, Ordering::SeqCst);
        let cleanups = cleanup_clone.clone();
        Cleanup::new(move || {
            cleanups.fetch_add(1, Ordering::SeqCst);
        })
    });

    assert_eq!(run_count.load(Ordering::SeqCst), 1);

    effect.dispose();
    effect.dispose();
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);

    signal.set(1);
    effect.run();
    assert_eq!(run_count.load(Ordering::SeqCst), 1);
    assert_eq!(signal.subscriber_count(), 0);
}

/// Test that an effect writing its own dependency does not recurse.
#[test]
fn self_triggering_effect_is_not_reentrant() {
    let signal = Signal::new(0);
    let signal_clone = signal.clone();

    let effect = Effect::new(move || {
        let value = signal_clone.get();
        signal_clone.set(value + 1);
    });

    assert_eq!(signal.get(), 1);
    assert_eq!(effect.run_count(), 1);
}

/// Test that untracked reads do not subscribe.
#[test]
fn untracked_reads_are_ignored() {
    let tracked = Signal::new(0);
    let ignored = Signal::new(0);
    let runs = Arc::new(AtomicUsize::new(0));

    let (tracked_in, ignored_in, runs_in) = (tracked.clone(), ignored.clone(), runs.clone());
    let _effect = Effect::new(move || {
        tracked_in.get();
        untracked(|| ignored_in.get());
        runs_in.fetch_add(1, Ordering::SeqCst);
    });

    ignored.set(1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    tracked.set(1);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Cart {
    items: Vec<String>,
    total_cents: u64,
}

/// Test the persistence round-trip against shared storage.
#[test]
fn persistence_round_trip() {
    let storage = MemoryStorage::new();
    let empty = Cart {
        items: vec![],
        total_cents: 0,
    };
    let cart = with_persistence(create_store(empty.clone()), "cart", storage.clone());

    let filled = Cart {
        items: vec!["tea".to_string(), "scones".to_string()],
        total_cents: 1250,
    };
    cart.set(filled.clone()).unwrap();

    let fresh = with_persistence(create_store(empty), "cart", storage);
    assert_eq!(fresh.get(), filled);
}

/// Test that selectors reject writes and keep following upstream.
#[test]
fn selector_set_fails_with_invalid_operation() {
    let cart = with_logging(create_store(Cart {
        items: vec!["tea".to_string()],
        total_cents: 300,
    }));
    let count = create_selector(&cart, |cart: &Cart| cart.items.len());

    assert_eq!(count.set(9), Err(InvalidOperation::SetOnSelector));

    cart.update(|c| Cart {
        items: vec!["tea".to_string(), "cake".to_string()],
        ..c.clone()
    })
    .unwrap();
    assert_eq!(count.get(), 2);
}

/// Test that effects react to store writes made through middleware.
#[test]
fn effect_observes_store_through_middleware() {
    let storage = MemoryStorage::new();
    let store = with_logging(with_persistence(create_store(1u32), "n", storage));
    let seen = Arc::new(AtomicUsize::new(0));

    let (store_in, seen_in) = (store.clone(), seen.clone());
    let effect = Effect::new(move || {
        seen_in.store(store_in.get() as usize, Ordering::SeqCst);
    });

    store.set(8).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 8);
    effect.dispose();
}

/// Test named stores on an explicit runtime.
#[test]
fn runtime_named_stores() {
    let runtime = Runtime::new();
    runtime.create_store("theme", "light".to_string()).unwrap();

    assert!(matches!(
        runtime.create_store("theme", "dark".to_string()),
        Err(InvalidOperation::StoreExists { .. })
    ));
    assert!(matches!(
        runtime.store::<String>("missing"),
        Err(InvalidOperation::StoreNotFound { .. })
    ));

    let (get, set) = runtime.use_store::<String>("theme").unwrap();
    set("dark".to_string()).unwrap();
    assert_eq!(get(), "dark");
}
