//! Context map shared by the nodes of one chain traversal
//!
//! Handlers use the map to pass signals and data downstream. Values are
//! untyped; typed reads go through [`ContextMap::get_as`], which treats a
//! type mismatch as an absent value.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Key of the continuation flag consulted after every handler
pub const NEXT_KEY: &str = "next";

/// Untyped value stored in a [`ContextMap`]
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Context map shared by reference between requests or chains
pub type SharedContext = Arc<Mutex<ContextMap>>;

/// String-keyed map of untyped values passed between chain nodes
#[derive(Clone, Default)]
pub struct ContextMap {
    values: HashMap<String, ContextValue>,
}

impl ContextMap {
    /// Create an empty context map
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Wrap this map into a handle that several traversals can share
    pub fn into_shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }

    /// Insert or overwrite the value bound to `key`
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Any + Send + Sync,
    {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Get the value bound to `key`, if any
    pub fn get(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.values.get(key).map(|value| value.as_ref())
    }

    /// Get the value bound to `key` as a `T`
    ///
    /// Returns `None` both when the key is unbound and when the stored value
    /// is of another type.
    pub fn get_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.get(key)?.downcast_ref::<T>()
    }

    /// Remove the value bound to `key`, returning it
    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.values.remove(key)
    }

    /// Check if `key` is bound
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of bound keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no key is bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over bound keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Set the continuation flag
    pub fn set_next(&mut self, next: bool) {
        self.set(NEXT_KEY, next);
    }

    /// Whether the continuation flag holds the boolean `true`
    ///
    /// Any other value under [`NEXT_KEY`], or none at all, reads as `false`.
    pub fn should_next(&self) -> bool {
        matches!(self.get_as::<bool>(NEXT_KEY), Some(true))
    }
}

impl fmt::Debug for ContextMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("ContextMap").field("keys", &keys).finish()
    }
}
