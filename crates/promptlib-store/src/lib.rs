//! # promptlib-store
//!
//! Prompt storage for promptlib.
//!
//! A [`PromptStore`] keeps the whole prompt collection as one JSON value under
//! a single key of a [`Backend`], and offers list, search, add and remove over
//! it. Filtering and sorting happen client-side on every call; nothing is
//! cached between calls.
//!
//! ## Backends
//!
//! - [`MemoryBackend`] - process-local, for tests and throwaway sessions
//! - [`SqliteBackend`] - on-disk, shareable between processes
//!
//! Both implement [`VersionedBackend`], so concurrent writers are detected
//! and the losing mutation is replayed instead of silently dropped.

mod backend;
mod collection;
mod error;
mod memory;
mod model;
mod search;
mod sqlite;
mod store;

pub use backend::{Backend, BackendError, Versioned, VersionedBackend, WriteOutcome};
pub use collection::SCHEMA_VERSION;
pub use error::StoreError;
pub use memory::MemoryBackend;
pub use model::{format_timestamp, parse_tags, parse_timestamp, Prompt};
pub use search::{sort_newest_first, PromptFilter};
pub use sqlite::SqliteBackend;
pub use store::{PromptStore, RemoveOutcome, DEFAULT_CONFLICT_RETRIES, DEFAULT_STORAGE_KEY};
