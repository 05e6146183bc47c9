//! YAML file loading.

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{ConfigError, ConfigResult};

/// Read a YAML file whose top level is a mapping.
///
/// An empty file yields an empty mapping.
pub fn load_yaml_file(path: &Path) -> ConfigResult<Map<String, Value>> {
    if !path.is_file() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), "Loaded YAML file");
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
    }
}
