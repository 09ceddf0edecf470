//! Application Runtime
//!
//! A [`Runtime`] is the registry for one application: stores looked up by
//! name and context values looked up by [`Context`] key. Nothing here is
//! global; independent runtimes can coexist in the same process and are
//! passed explicitly to the code that needs them.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::InvalidOperation;
use crate::store::SignalStore;

/// Typed key for a context value, with a fallback default.
///
/// A `Context` is usually created once (e.g. in a `static` or at
/// application start-up) and shared by providers and consumers.
#[derive(Debug, Clone)]
pub struct Context<T> {
    id: u64,
    default: T,
}

impl<T> Context<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(default: T) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            default,
        }
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }
}

type Slot = Box<dyn Any + Send + Sync>;

/// One application's named stores and context values.
#[derive(Default)]
pub struct Runtime {
    stores: DashMap<String, Slot>,
    contexts: DashMap<u64, Slot>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named store.
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::StoreExists`] if the name is taken.
    pub fn create_store<T>(
        &self,
        name: &str,
        initial: T,
    ) -> Result<SignalStore<T>, InvalidOperation>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        match self.stores.entry(name.to_string()) {
            Entry::Occupied(_) => Err(InvalidOperation::StoreExists {
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                let store = SignalStore::new(initial);
                slot.insert(Box::new(store.clone()));
                debug!(name, value_type = type_name::<T>(), "registered store");
                Ok(store)
            }
        }
    }

    /// Look up a named store.
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::StoreNotFound`] for unknown names and
    /// [`InvalidOperation::StoreTypeMismatch`] when the store holds another
    /// value type.
    pub fn store<T>(&self, name: &str) -> Result<SignalStore<T>, InvalidOperation>
    where
        T: Clone + Send + Sync + 'static,
    {
        let slot = self
            .stores
            .get(name)
            .ok_or_else(|| InvalidOperation::StoreNotFound {
                name: name.to_string(),
            })?;

        slot.value()
            .as_ref()
            .downcast_ref::<SignalStore<T>>()
            .cloned()
            .ok_or_else(|| InvalidOperation::StoreTypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Getter and setter closures for a named store.
    #[allow(clippy::type_complexity)]
    pub fn use_store<T>(
        &self,
        name: &str,
    ) -> Result<
        (
            impl Fn() -> T + Send + Sync + 'static,
            impl Fn(T) -> Result<(), InvalidOperation> + Send + Sync + 'static,
        ),
        InvalidOperation,
    >
    where
        T: Clone + Send + Sync + 'static,
    {
        let store = self.store::<T>(name)?;
        Ok(crate::store::use_store(&store))
    }

    pub fn contains_store(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    /// Remove a named store. Existing handles keep working.
    pub fn remove_store(&self, name: &str) -> bool {
        self.stores.remove(name).is_some()
    }

    /// Provide a value for `context`, replacing any earlier one.
    pub fn provide<T>(&self, context: &Context<T>, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.contexts.insert(context.id, Box::new(value));
    }

    /// The provided value for `context`, or its default.
    pub fn use_context<T>(&self, context: &Context<T>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        self.contexts
            .get(&context.id)
            .and_then(|slot| slot.value().as_ref().downcast_ref::<T>().cloned())
            .unwrap_or_else(|| context.default.clone())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.stores.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("Runtime")
            .field("stores", &names)
            .field("contexts", &self.contexts.len())
            .finish()
    }
}
