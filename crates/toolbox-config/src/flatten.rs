//! Conversion between nested mappings and flat dot-keyed mappings.

use serde_json::{Map, Value};

use crate::store::{NamespaceStore, WritePolicy};
use crate::{ConfigResult, Resolver};

/// Flatten a nested mapping into `dot.path -> leaf` entries.
///
/// The tree is consumed depth-first in insertion order. A leaf is any value
/// that is not a non-empty mapping, so `{}` survives as a leaf. Keys that
/// already contain dots are kept as written and joined with their parents,
/// which is how dotted and nested spellings of the same path meet.
pub fn flatten(tree: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(tree, None, &mut flat);
    flat
}

fn flatten_into(tree: Map<String, Value>, parent: Option<&str>, flat: &mut Map<String, Value>) {
    for (key, value) in tree {
        let path = match parent {
            Some(parent) => format!("{}.{}", parent, key),
            None => key,
        };
        match value {
            Value::Object(child) if !child.is_empty() => flatten_into(child, Some(path.as_str()), flat),
            leaf => {
                flat.insert(path, leaf);
            }
        }
    }
}

/// Rebuild a nested store from flat entries.
///
/// Entries are applied in sorted key order, so `a.b` is always written
/// before `a.b.c`. A scalar at `a.b` then makes `a.b.c` fail with
/// `IllegalRedefinition`, which is how a dotted key colliding with a nested
/// one is reported.
pub fn expand(flat: Map<String, Value>) -> ConfigResult<NamespaceStore> {
    let mut entries: Vec<(String, Value)> = flat.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut store = NamespaceStore::new();
    for (path, value) in entries {
        store.set(&path, value, WritePolicy::Overwrite)?;
    }
    Ok(store)
}

/// Normalize a mapping that mixes dotted and nested keys, then resolve every
/// `${...}` reference in it.
pub fn expand_and_resolve(tree: Map<String, Value>) -> ConfigResult<NamespaceStore> {
    let store = expand(flatten(tree))?;
    let resolved = Resolver::new(&store, true).resolve_map(store.as_map())?;
    Ok(NamespaceStore::from_map(resolved))
}
