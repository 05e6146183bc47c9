//! Schema validation of namespace values.

use jsonschema::Draft;
use serde_json::{Map, Value};

/// Checks a value against a declarative schema.
///
/// Errors are human-readable strings; no structured error is needed at this
/// boundary.
pub trait SchemaValidator {
    fn validate(&self, value: &Value, schema: &Value) -> Result<(), String>;
}

/// JSON Schema (Draft 2020-12) validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value, schema: &Value) -> Result<(), String> {
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|err| format!("invalid schema: {}", err))?;
        let messages: Vec<String> = compiled
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(messages.join("; "))
        }
    }
}

/// Attach named schema fragments as `$defs` so a property schema can use
/// `{"$ref": "#/$defs/<name>"}`. Definitions already in the schema win.
pub fn with_includes(schema: &Value, includes: &Map<String, Value>) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    if includes.is_empty() {
        return schema.clone();
    }

    let mut map = map.clone();
    let mut defs = includes.clone();
    if let Some(Value::Object(existing)) = map.get("$defs") {
        for (name, def) in existing {
            defs.insert(name.clone(), def.clone());
        }
    }
    map.insert("$defs".to_string(), Value::Object(defs));
    Value::Object(map)
}
