//! Layered merging of configuration into a namespace store.

use serde_json::{Map, Value};

use crate::flatten::flatten;
use crate::store::{NamespaceStore, WritePolicy};
use crate::ConfigResult;

/// Merge `incoming` into `into`, last write wins.
///
/// The incoming mapping is copied and flattened, then every entry is written
/// with `WritePolicy::Overwrite`. Writes are staged on a copy of the store,
/// so a failing entry leaves `into` untouched.
pub fn load(into: &mut NamespaceStore, incoming: &Map<String, Value>) -> ConfigResult<()> {
    apply(into, flatten(incoming.clone()))
}

/// Write already-flattened entries into `into`, all or nothing.
pub(crate) fn apply(into: &mut NamespaceStore, flat: Map<String, Value>) -> ConfigResult<()> {
    let mut staged = into.clone();
    for (path, value) in flat {
        staged.set(&path, value, WritePolicy::Overwrite)?;
    }
    *into = staged;
    Ok(())
}
