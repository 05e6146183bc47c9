//! Configuration namespace errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("cannot traverse '{path}': '{segment}' is not a mapping")]
    TypeNotTraversable { path: String, segment: String },

    #[error("illegal redefinition of '{path}': '{segment}' already holds a value")]
    IllegalRedefinition { path: String, segment: String },

    #[error("cannot overwrite protected field '{0}'")]
    Redefinition(String),

    #[error("cannot append to '{path}': {message}")]
    AppendType { path: String, message: String },

    #[error("can only concatenate strings in '{0}'")]
    ConcatenationType(String),

    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("maximum resolution depth reached, likely a circular reference involving '{0}'")]
    CircularReference(String),

    #[error("'{key}' is inside the protected namespace '{prefix}'")]
    ProtectedNamespace { key: String, prefix: String },

    #[error("invalid value for {path}: {message}")]
    InvalidValue { path: String, message: String },

    #[error("invalid dot path: '{0}'")]
    InvalidPath(String),

    #[error("{0} does not contain a mapping")]
    NotAMapping(PathBuf),

    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
