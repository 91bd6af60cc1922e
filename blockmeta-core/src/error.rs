//! Error types for block field redirection

use crate::{DocumentId, MetaKey};
use thiserror::Error;

/// Metadata store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Read of {key} for document {document_id} failed: {reason}")]
    ReadFailed {
        document_id: DocumentId,
        key: MetaKey,
        reason: String,
    },

    #[error("Write of {key_count} keys for document {document_id} failed: {reason}")]
    WriteFailed {
        document_id: DocumentId,
        key_count: usize,
        reason: String,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },
}

/// Master error type for block field redirection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlockMetaError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for block field redirection.
pub type BlockMetaResult<T> = Result<T, BlockMetaError>;
