//! Nested namespace store with dot-path addressing.
//!
//! Interior nodes are mappings keyed by single path segments; a dot path such
//! as `a.b.c` walks one mapping level per segment. Dots are reserved as the
//! delimiter and never appear inside a stored key written through this API.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ConfigError, ConfigResult};

/// How `set` treats an existing value at the terminal segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Replace whatever is there, including whole subtrees.
    #[default]
    Overwrite,
    /// Concatenate onto an existing sequence.
    Append,
    /// Write only if the key does not exist yet.
    Protected,
}

/// Outcome of walking a dot path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    /// No key at segment `depth` (0-based).
    Missing { depth: usize },
    /// Segment `depth` holds a non-mapping while more segments remain.
    NotTraversable { depth: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceStore {
    root: Map<String, Value>,
}

/// Split a dot path into segments, rejecting empty segments.
pub(crate) fn segments(path: &str) -> ConfigResult<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

fn prefix(parts: &[&str], depth: usize) -> String {
    parts[..=depth].join(".")
}

impl NamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Walk `path` and report where it ends.
    pub fn lookup(&self, path: &str) -> Lookup<'_> {
        let mut current = &self.root;
        let mut parts = path.split('.').enumerate().peekable();
        while let Some((depth, key)) = parts.next() {
            let Some(value) = current.get(key) else {
                return Lookup::Missing { depth };
            };
            if parts.peek().is_none() {
                return Lookup::Found(value);
            }
            match value {
                Value::Object(map) => current = map,
                _ => return Lookup::NotTraversable { depth },
            }
        }
        Lookup::Missing { depth: 0 }
    }

    pub fn get(&self, path: &str) -> ConfigResult<&Value> {
        let parts = segments(path)?;
        match self.lookup(path) {
            Lookup::Found(value) => Ok(value),
            Lookup::Missing { depth } => Err(ConfigError::KeyNotFound(prefix(&parts, depth))),
            Lookup::NotTraversable { depth } => Err(ConfigError::TypeNotTraversable {
                path: path.to_string(),
                segment: prefix(&parts, depth),
            }),
        }
    }

    /// Deserialize the value at `path` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        let value = self.get(path)?;
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidValue {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        matches!(self.lookup(path), Lookup::Found(_))
    }

    /// Write `value` at `path`, creating intermediate mappings as needed.
    pub fn set(&mut self, path: &str, value: Value, policy: WritePolicy) -> ConfigResult<()> {
        let parts = segments(path)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(ConfigError::InvalidPath(path.to_string()));
        };

        let mut current = &mut self.root;
        for (depth, key) in parents.iter().enumerate() {
            let child = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match child {
                Value::Object(map) => map,
                _ => {
                    return Err(ConfigError::IllegalRedefinition {
                        path: path.to_string(),
                        segment: prefix(&parts, depth),
                    });
                }
            };
        }

        match policy {
            WritePolicy::Overwrite => {
                current.insert(last.to_string(), value);
            }
            WritePolicy::Append => {
                let existing = match current.get_mut(*last) {
                    Some(Value::Array(items)) => items,
                    Some(_) => {
                        return Err(ConfigError::AppendType {
                            path: path.to_string(),
                            message: "existing value is not a sequence".to_string(),
                        });
                    }
                    None => {
                        return Err(ConfigError::AppendType {
                            path: path.to_string(),
                            message: "no existing sequence".to_string(),
                        });
                    }
                };
                let Value::Array(extra) = value else {
                    return Err(ConfigError::AppendType {
                        path: path.to_string(),
                        message: "appended value is not a sequence".to_string(),
                    });
                };
                existing.extend(extra);
            }
            WritePolicy::Protected => {
                if current.contains_key(*last) {
                    return Err(ConfigError::Redefinition(path.to_string()));
                }
                current.insert(last.to_string(), value);
            }
        }
        Ok(())
    }

    /// Remove the value at `path`. Parents left empty are kept.
    pub fn delete(&mut self, path: &str) -> ConfigResult<Value> {
        let parts = segments(path)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(ConfigError::InvalidPath(path.to_string()));
        };

        let mut current = &mut self.root;
        for (depth, key) in parents.iter().enumerate() {
            current = match current.get_mut(*key) {
                Some(Value::Object(map)) => map,
                Some(_) => {
                    return Err(ConfigError::TypeNotTraversable {
                        path: path.to_string(),
                        segment: prefix(&parts, depth),
                    });
                }
                None => return Err(ConfigError::KeyNotFound(prefix(&parts, depth))),
            };
        }

        current
            .shift_remove(*last)
            .ok_or_else(|| ConfigError::KeyNotFound(path.to_string()))
    }
}

impl From<Map<String, Value>> for NamespaceStore {
    fn from(root: Map<String, Value>) -> Self {
        Self::from_map(root)
    }
}
