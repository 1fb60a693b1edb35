//! Per-message context shared between pipeline stages

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A value stored in a [`Context`]
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Immutable string-keyed store of arbitrary values
///
/// Middleware attaches data for later stages by deriving a changed message;
/// the context itself is never mutated once a message holds it.
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<HashMap<String, ContextValue>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context with `key` set to `value`
    pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        Arc::make_mut(&mut self.entries).insert(key.into(), Arc::new(value));
        self
    }

    /// Typed lookup; `None` if missing or stored with another type
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Untyped lookup
    pub fn get_raw(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn updated(&self, updates: Vec<(String, Option<ContextValue>)>) -> Context {
        if updates.is_empty() {
            return self.clone();
        }
        let mut entries = HashMap::clone(&self.entries);
        for (key, value) in updates {
            match value {
                Some(value) => {
                    entries.insert(key, value);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
        Context {
            entries: Arc::new(entries),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
