use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Stored prompts are corrupt: {0}")]
    Corrupt(String),

    #[error("Stored prompts use schema version {found}, newest supported is {supported}")]
    UnsupportedSchema { found: u64, supported: u32 },

    #[error("Write conflicted with another writer {attempts} time(s)")]
    Conflict { attempts: u32 },
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
