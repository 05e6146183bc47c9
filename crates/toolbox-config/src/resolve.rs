//! Variable resolution for namespace values.
//!
//! String values may reference other dot paths of the namespace:
//! - `${a.b.c}` spanning the whole string is replaced by the referenced
//!   value itself, keeping its type (numbers stay numbers, mappings and
//!   sequences are substituted wholesale)
//! - `${a}_suffix` splices the textual form of a scalar into the string
//! - `${a}/${b}` concatenates; every referenced value must be a string
//!
//! References are followed transitively. A reference that reappears while it
//! is still being resolved is a cycle. There is no escape syntax for a
//! literal `${...}`.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::warn;

use crate::store::{Lookup, NamespaceStore};
use crate::{ConfigError, ConfigResult};

/// Longest chain of references followed from a single value. Nesting of
/// mappings and sequences does not count towards it.
pub const MAX_RESOLUTION_DEPTH: usize = 512;

// Regex for matching ${dot.path} markers
static MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([a-zA-Z0-9._]+)\}").expect("marker pattern is valid"));

/// Resolves markers against a fixed source namespace.
pub struct Resolver<'a> {
    source: &'a NamespaceStore,
    strict: bool,
}

impl<'a> Resolver<'a> {
    /// With `strict`, a marker naming a missing path is an error; otherwise it
    /// is left in place.
    pub fn new(source: &'a NamespaceStore, strict: bool) -> Self {
        Self { source, strict }
    }

    /// Resolve every value of a mapping.
    pub fn resolve_map(&self, map: &Map<String, Value>) -> ConfigResult<Map<String, Value>> {
        self.resolve_entries(map, "", &mut Vec::new())
    }

    /// Resolve a single value found at `path`.
    pub fn resolve_value(&self, value: &Value, path: &str) -> ConfigResult<Value> {
        self.resolve_at(value, path, &mut Vec::new())
    }

    fn resolve_entries(
        &self,
        map: &Map<String, Value>,
        path: &str,
        chain: &mut Vec<String>,
    ) -> ConfigResult<Map<String, Value>> {
        let mut resolved = Map::new();
        for (key, value) in map {
            let child = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            resolved.insert(key.clone(), self.resolve_at(value, &child, chain)?);
        }
        Ok(resolved)
    }

    /// `chain` holds the references currently being followed.
    fn resolve_at(
        &self,
        value: &Value,
        path: &str,
        chain: &mut Vec<String>,
    ) -> ConfigResult<Value> {
        match value {
            Value::String(text) => self.resolve_string(text, path, chain),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_at(item, path, chain))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => self.resolve_entries(map, path, chain).map(Value::Object),
            other => Ok(other.clone()),
        }
    }

    fn follow(
        &self,
        target: &Value,
        reference: &str,
        chain: &mut Vec<String>,
    ) -> ConfigResult<Value> {
        if chain.len() >= MAX_RESOLUTION_DEPTH || chain.iter().any(|r| r == reference) {
            return Err(ConfigError::CircularReference(reference.to_string()));
        }
        chain.push(reference.to_string());
        let resolved = self.resolve_at(target, reference, chain)?;
        chain.pop();
        Ok(resolved)
    }

    fn resolve_string(
        &self,
        text: &str,
        path: &str,
        chain: &mut Vec<String>,
    ) -> ConfigResult<Value> {
        let markers: Vec<Captures<'_>> = MARKER_REGEX.captures_iter(text).collect();
        if markers.is_empty() {
            return Ok(Value::String(text.to_string()));
        }

        let mut values = Vec::with_capacity(markers.len());
        for caps in &markers {
            let reference = &caps[1];
            match self.source.lookup(reference) {
                Lookup::Found(target) => {
                    values.push(Some(self.follow(target, reference, chain)?));
                }
                _ if self.strict => {
                    return Err(ConfigError::UnresolvedReference(reference.to_string()));
                }
                _ => {
                    warn!(path = %path, reference = %reference, "Leaving unresolved reference in place");
                    values.push(None);
                }
            }
        }

        if let [single] = values.as_slice() {
            let spans_whole = markers[0].get(0).map(|m| m.range()) == Some(0..text.len());
            return match single {
                None => Ok(Value::String(text.to_string())),
                Some(value) if spans_whole => Ok(value.clone()),
                Some(Value::Array(_) | Value::Object(_)) => {
                    Err(ConfigError::ConcatenationType(path.to_string()))
                }
                Some(value) => Ok(Value::String(splice(text, &markers, &[Some(value)]))),
            };
        }

        if values.iter().flatten().any(|v| !v.is_string()) {
            return Err(ConfigError::ConcatenationType(path.to_string()));
        }
        let refs: Vec<Option<&Value>> = values.iter().map(Option::as_ref).collect();
        Ok(Value::String(splice(text, &markers, &refs)))
    }
}

/// Replace each marker with its value's text, leaving `None` markers as written.
fn splice(text: &str, markers: &[Captures<'_>], values: &[Option<&Value>]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (caps, value) in markers.iter().zip(values) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        match value {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Dot paths referenced by markers in `text`, in order of appearance.
pub fn references(text: &str) -> Vec<&str> {
    MARKER_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}
