//! Error types for proxy generation, caching and loading
//!
//! Reflection failures are recovered inside the synthesizer and never reach
//! the host. Storage failures propagate out of the rewrite pass and the
//! loader, where they abort the current request.

use thiserror::Error;

/// Errors raised while reflecting over a class in the catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReflectionError {
    #[error("Class or interface not found: {0}")]
    UnknownClass(String),

    #[error("Parent class '{parent}' of '{class}' not found")]
    UnknownParent { class: String, parent: String },

    #[error("Inheritance cycle detected at class '{0}'")]
    InheritanceCycle(String),

    #[error("Unsupported default value for parameter ${parameter} of {class}::{method}: {value}")]
    UnsupportedDefault {
        class: String,
        method: String,
        parameter: String,
        value: String,
    },
}

/// Errors raised by a generation cache backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid cache entry identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Cache entry not found: {0}")]
    NotFound(String),

    #[error("Corrupt cache entry {0}: missing source markers")]
    Corrupt(String),

    #[error("I/O error on cache entry {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error for the rewrite pass and the dynamic loader
#[derive(Error, Debug)]
pub enum HookcheckError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for rewrite and load operations
pub type Result<T> = std::result::Result<T, HookcheckError>;
