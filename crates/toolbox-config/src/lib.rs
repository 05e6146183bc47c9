//! Configuration namespace engine for the toolbox job runner.
//!
//! This crate handles:
//! - The nested namespace store and dot-path addressing
//! - Flattening to and expanding from dotted keys
//! - `${dot.path}` variable resolution
//! - Layered merging of configuration, with a protected internal namespace
//! - YAML file loading and schema validation

pub mod database;
pub mod error;
pub mod flatten;
pub mod loader;
pub mod merge;
pub mod resolve;
pub mod schema;
pub mod store;

pub use database::Database;
pub use error::{ConfigError, ConfigResult};
pub use flatten::{expand, expand_and_resolve, flatten};
pub use loader::load_yaml_file;
pub use merge::load;
pub use resolve::{MAX_RESOLUTION_DEPTH, Resolver};
pub use schema::{JsonSchemaValidator, SchemaValidator, with_includes};
pub use store::{Lookup, NamespaceStore, WritePolicy};
