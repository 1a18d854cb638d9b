//! Persistence backend abstraction.
//!
//! A backend is an asynchronous key-value store holding JSON values. Plain
//! backends only offer whole-value `get`/`set`, so two writers doing
//! read-modify-write on the same key can lose one side's change. Backends
//! that can detect concurrent writes expose [`VersionedBackend`] through
//! [`Backend::versioned`], and the store switches to conditional writes.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by a persistence backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to encode stored value: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A stored value together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub value: Value,
    pub version: u64,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write happened; the key is now at `version`.
    Applied { version: u64 },
    /// Someone else wrote first. `current` is `None` if the key was deleted.
    Conflict { current: Option<u64> },
}

/// Asynchronous key-value store holding whole JSON values.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs (e.g., "memory", "sqlite")
    fn name(&self) -> &str;

    /// Read the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, BackendError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), BackendError>;

    /// Optimistic-concurrency extension, if this backend supports it.
    fn versioned(&self) -> Option<&dyn VersionedBackend> {
        None
    }
}

/// Compare-and-set extension for backends that track a version per key.
#[async_trait]
pub trait VersionedBackend: Send + Sync {
    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, BackendError>;

    /// Write `value` only if the key is still at `expected` (`None` = absent).
    async fn set_if_version(
        &self,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<WriteOutcome, BackendError>;
}
