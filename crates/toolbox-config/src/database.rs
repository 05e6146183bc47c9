//! The global configuration database.
//!
//! Wraps a [`NamespaceStore`] and reserves one top-level prefix for
//! orchestration bookkeeping. Ordinary loads and writes may not touch that
//! prefix; the `*_internal` entry points bypass the check.

use serde_json::{Map, Value};
use tracing::debug;

use crate::flatten::flatten;
use crate::merge::apply;
use crate::resolve::Resolver;
use crate::store::{NamespaceStore, WritePolicy};
use crate::{ConfigError, ConfigResult};

#[derive(Debug, Clone)]
pub struct Database {
    store: NamespaceStore,
    protected: String,
}

impl Database {
    /// Create an empty database guarding `protected` (e.g. `"internal"`).
    pub fn new(protected: impl Into<String>) -> Self {
        Self {
            store: NamespaceStore::new(),
            protected: protected.into(),
        }
    }

    pub fn protected_prefix(&self) -> &str {
        &self.protected
    }

    pub fn store(&self) -> &NamespaceStore {
        &self.store
    }

    /// Whether `path` lies inside the protected namespace.
    pub fn is_protected(&self, path: &str) -> bool {
        path == self.protected
            || path
                .strip_prefix(self.protected.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }

    fn check(&self, path: &str) -> ConfigResult<()> {
        if self.is_protected(path) {
            return Err(ConfigError::ProtectedNamespace {
                key: path.to_string(),
                prefix: self.protected.clone(),
            });
        }
        Ok(())
    }

    /// Merge user configuration. Every key is checked before anything is
    /// written, so a rejected load changes nothing.
    pub fn load(&mut self, incoming: &Map<String, Value>) -> ConfigResult<()> {
        let flat = flatten(incoming.clone());
        for key in flat.keys() {
            self.check(key)?;
        }
        apply(&mut self.store, flat)
    }

    /// Merge bookkeeping data, including into the protected namespace.
    pub fn load_internal(&mut self, incoming: &Map<String, Value>) -> ConfigResult<()> {
        apply(&mut self.store, flatten(incoming.clone()))
    }

    pub fn get(&self, path: &str) -> ConfigResult<&Value> {
        self.store.get(path)
    }

    pub fn get_as<T: serde::de::DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        self.store.get_as(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.store.contains(path)
    }

    /// Single guarded write.
    pub fn set(&mut self, path: &str, value: Value, policy: WritePolicy) -> ConfigResult<()> {
        self.check(path)?;
        self.store.set(path, value, policy)
    }

    pub fn set_internal(&mut self, path: &str, value: Value) -> ConfigResult<()> {
        self.store.set(path, value, WritePolicy::Overwrite)
    }

    pub fn delete(&mut self, path: &str) -> ConfigResult<Value> {
        self.check(path)?;
        self.store.delete(path)
    }

    /// Resolve every `${...}` marker in the database in place.
    pub fn resolve(&mut self, strict: bool) -> ConfigResult<()> {
        let resolved = Resolver::new(&self.store, strict).resolve_map(self.store.as_map())?;
        self.store = NamespaceStore::from_map(resolved);
        debug!(strict, "Resolved configuration namespace");
        Ok(())
    }

    /// Deep copy of the current contents, for a later [`Database::restore`].
    pub fn snapshot(&self) -> NamespaceStore {
        self.store.clone()
    }

    pub fn restore(&mut self, snapshot: NamespaceStore) {
        self.store = snapshot;
    }
}
