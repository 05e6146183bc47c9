//! Tool descriptors.
//!
//! Every tool plugin directory carries a `tool.yml` describing the tool:
//! its name, the namespace its properties live under, the properties
//! themselves (default value, schema, description) and, optionally, other
//! tools whose namespaces it also owns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::{Error, Result};

/// Parsed `tool.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolDescriptor {
    /// Tool name, unique within a tool manifest.
    pub name: String,
    /// Namespace the properties are stored under. Defaults to the tool name.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Tools whose namespaces this tool also owns and validates.
    #[serde(default)]
    pub inherits: Vec<String>,
    /// Named schema fragments, referenced from property schemas as `#/$defs/<name>`.
    #[serde(default)]
    pub includes: Map<String, Value>,
    /// Declared properties, in declaration order.
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

/// A single declared property of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertySpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Initial value. `None` means the value must come from configuration.
    #[serde(default)]
    pub default: Option<Value>,
    /// JSON Schema the value must satisfy. The empty schema accepts anything.
    #[serde(default = "any_schema")]
    pub schema: Value,
}

fn any_schema() -> Value {
    Value::Object(Map::new())
}

impl ToolDescriptor {
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.name)
    }

    /// Dot path of a property inside the global namespace.
    pub fn property_path(&self, property: &str) -> String {
        format!("{}.{}", self.namespace(), property)
    }

    /// Default values keyed by their dot path, in declaration order.
    pub fn defaults(&self) -> Map<String, Value> {
        self.properties
            .iter()
            .filter_map(|p| {
                p.default
                    .clone()
                    .map(|value| (self.property_path(&p.name), value))
            })
            .collect()
    }

    /// Check the descriptor for structural problems.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidDescriptor("tool name is empty".to_string()));
        }
        if self.name.contains('.') {
            return Err(Error::InvalidDescriptor(format!(
                "tool name '{}' must not contain '.'",
                self.name
            )));
        }
        if self.namespace().split('.').any(str::is_empty) {
            return Err(Error::InvalidDescriptor(format!(
                "tool '{}' has malformed namespace '{}'",
                self.name,
                self.namespace()
            )));
        }

        let mut seen = HashSet::new();
        for property in &self.properties {
            if property.name.is_empty() || property.name.contains('.') {
                return Err(Error::InvalidDescriptor(format!(
                    "tool '{}' declares invalid property name '{}'",
                    self.name, property.name
                )));
            }
            if !seen.insert(property.name.as_str()) {
                return Err(Error::Duplicate(format!(
                    "property '{}' of tool '{}'",
                    property.name, self.name
                )));
            }
        }

        if self.inherits.iter().any(|parent| parent == &self.name) {
            return Err(Error::InvalidDescriptor(format!(
                "tool '{}' inherits from itself",
                self.name
            )));
        }

        Ok(())
    }
}
