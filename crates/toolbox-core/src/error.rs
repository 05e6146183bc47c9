//! Error types for toolbox domain objects.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tool descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("invalid job definition: {0}")]
    InvalidJob(String),

    #[error("duplicate definition: {0}")]
    Duplicate(String),
}

pub type Result<T> = std::result::Result<T, Error>;
