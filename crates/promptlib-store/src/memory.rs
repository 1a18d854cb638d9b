//! In-memory backend, used by tests and by `--database :memory:`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{Backend, BackendError, Versioned, VersionedBackend, WriteOutcome};

#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Versioned>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-seeded with `value` under `key`.
    pub fn with_value(key: &str, value: Value) -> Self {
        let backend = Self::new();
        if let Ok(mut entries) = backend.entries.lock() {
            entries.insert(key.to_string(), Versioned { value, version: 1 });
        }
        backend
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Versioned>>, BackendError> {
        self.entries
            .lock()
            .map_err(|_| BackendError::Unavailable("memory backend lock poisoned".to_string()))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
        Ok(self.lock()?.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), BackendError> {
        let mut entries = self.lock()?;
        let version = entries.get(key).map_or(1, |entry| entry.version + 1);
        entries.insert(key.to_string(), Versioned { value, version });
        Ok(())
    }

    fn versioned(&self) -> Option<&dyn VersionedBackend> {
        Some(self)
    }
}

#[async_trait]
impl VersionedBackend for MemoryBackend {
    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, BackendError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set_if_version(
        &self,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<WriteOutcome, BackendError> {
        let mut entries = self.lock()?;
        let current = entries.get(key).map(|entry| entry.version);

        if current != expected {
            return Ok(WriteOutcome::Conflict { current });
        }

        let version = current.map_or(1, |v| v + 1);
        entries.insert(key.to_string(), Versioned { value, version });
        Ok(WriteOutcome::Applied { version })
    }
}
