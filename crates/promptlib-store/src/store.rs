//! The prompt store: list, search, add and remove over a single backend key.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{Backend, WriteOutcome};
use crate::collection;
use crate::error::StoreError;
use crate::model::{format_timestamp, parse_tags, Prompt};
use crate::search::PromptFilter;

/// Key the whole collection is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "prompts";

/// Re-reads allowed after a conflicting write before giving up.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Result of [`PromptStore::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// This many prompts carried the id and were dropped.
    Removed(usize),
    /// No prompt had the id; nothing was written.
    NotFound,
}

/// Prompt collection persisted under one key of a [`Backend`].
///
/// Every mutation reads the full collection, changes a local copy and
/// writes the full collection back. With a plain backend, two writers racing
/// through that sequence can drop one side's change. When the backend
/// supports versioned writes, the write is conditional and a conflict causes
/// the mutation to be replayed on a fresh snapshot.
#[derive(Clone)]
pub struct PromptStore {
    backend: Arc<dyn Backend>,
    key: String,
    conflict_retries: u32,
}

impl PromptStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            key: DEFAULT_STORAGE_KEY.to_string(),
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Read the whole collection in stored order. An absent key is an empty collection.
    pub async fn list_all(&self) -> Result<Vec<Prompt>, StoreError> {
        let prompts = match self.backend.get(&self.key).await? {
            Some(value) => collection::decode(value)?,
            None => Vec::new(),
        };

        debug!(key = %self.key, count = prompts.len(), "Loaded prompts");
        Ok(prompts)
    }

    /// Matching prompts, newest first.
    pub async fn search(&self, filter: &PromptFilter) -> Result<Vec<Prompt>, StoreError> {
        let prompts = self.list_all().await?;
        Ok(filter.apply(prompts))
    }

    /// Get a prompt by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Prompt>, StoreError> {
        let prompts = self.list_all().await?;
        Ok(prompts.into_iter().find(|p| p.id == id))
    }

    /// Create a prompt and append it to the collection.
    ///
    /// `raw_tags` is a comma-separated list; blank entries are dropped.
    pub async fn add(
        &self,
        text: &str,
        modality: &str,
        raw_tags: &str,
    ) -> Result<Prompt, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Validation(
                "prompt text must not be empty".to_string(),
            ));
        }

        let modality = modality.trim().to_string();
        let tags = parse_tags(raw_tags);
        let timestamp = format_timestamp(Utc::now());

        let prompt = self
            .mutate(|prompts| {
                let prompt = Prompt {
                    id: fresh_id(prompts),
                    text: text.to_string(),
                    modality: modality.clone(),
                    tags: tags.clone(),
                    timestamp: timestamp.clone(),
                };
                prompts.push(prompt.clone());
                (prompt, true)
            })
            .await?;

        info!(id = %prompt.id, modality = %prompt.modality, tags = prompt.tags.len(), "Prompt added");
        Ok(prompt)
    }

    /// Drop every prompt with this id. Unknown ids are a no-op.
    pub async fn remove(&self, id: &str) -> Result<RemoveOutcome, StoreError> {
        let outcome = self
            .mutate(|prompts| {
                let before = prompts.len();
                prompts.retain(|p| p.id != id);
                let removed = before - prompts.len();

                if removed == 0 {
                    (RemoveOutcome::NotFound, false)
                } else {
                    (RemoveOutcome::Removed(removed), true)
                }
            })
            .await?;

        match outcome {
            RemoveOutcome::Removed(count) => info!(id = %id, count, "Prompt removed"),
            RemoveOutcome::NotFound => debug!(id = %id, "Remove of unknown prompt ignored"),
        }

        Ok(outcome)
    }

    /// Read-modify-write the collection.
    ///
    /// `apply` returns its output and whether the collection changed; an
    /// unchanged collection is not written back. `apply` may run more than
    /// once when a versioned write conflicts.
    async fn mutate<T, F>(&self, mut apply: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnMut(&mut Vec<Prompt>) -> (T, bool) + Send,
    {
        let Some(versioned) = self.backend.versioned() else {
            let mut prompts = self.list_all().await?;
            let (output, changed) = apply(&mut prompts);
            if changed {
                let count = prompts.len();
                self.backend
                    .set(&self.key, collection::encode(prompts)?)
                    .await?;
                debug!(key = %self.key, count, "Wrote prompts");
            }
            return Ok(output);
        };

        let max_attempts = self.conflict_retries.saturating_add(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let (mut prompts, expected) = match versioned.get_versioned(&self.key).await? {
                Some(stored) => (collection::decode(stored.value)?, Some(stored.version)),
                None => (Vec::new(), None),
            };

            let (output, changed) = apply(&mut prompts);
            if !changed {
                return Ok(output);
            }

            let count = prompts.len();
            let value = collection::encode(prompts)?;

            match versioned.set_if_version(&self.key, value, expected).await? {
                WriteOutcome::Applied { version } => {
                    debug!(key = %self.key, count, version, "Wrote prompts");
                    return Ok(output);
                }
                WriteOutcome::Conflict { current } => {
                    warn!(
                        key = %self.key,
                        attempt = attempts,
                        expected = ?expected,
                        current = ?current,
                        "Concurrent write detected"
                    );
                    if attempts >= max_attempts {
                        return Err(StoreError::Conflict { attempts });
                    }
                }
            }
        }
    }
}

/// A random id not used by any prompt in the snapshot.
fn fresh_id(existing: &[Prompt]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !existing.iter().any(|p| p.id == id) {
            return id;
        }
    }
}
