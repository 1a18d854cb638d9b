//! SQLite-backed key-value storage.
//!
//! Stores values at ~/.local/share/promptlib/promptlib.db by default. Each key
//! carries a version that is bumped on every write, so several processes
//! sharing the same file get compare-and-set semantics.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;

use crate::backend::{Backend, BackendError, Versioned, VersionedBackend, WriteOutcome};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open or create a database at the default location.
    pub fn open() -> Result<Self, BackendError> {
        Self::open_at(&Self::default_path())
    }

    /// Open or create a database at a specific path.
    pub fn open_at(path: &Path) -> Result<Self, BackendError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!(path = %path.display(), "Opening prompt database");
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, BackendError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the default database path.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("promptlib")
            .join("promptlib.db")
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                version INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, BackendError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| BackendError::Unavailable("database lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| BackendError::Unavailable(format!("database task failed: {}", e)))?
    }

    fn read(conn: &Connection, key: &str) -> Result<Option<Versioned>, BackendError> {
        let row = conn
            .query_row(
                "SELECT value, version FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            Some((text, version)) => Ok(Some(Versioned {
                value: serde_json::from_str(&text)?,
                version: version as u64,
            })),
            None => Ok(None),
        }
    }

    fn current_version(conn: &Connection, key: &str) -> Result<Option<u64>, BackendError> {
        let version = conn
            .query_row(
                "SELECT version FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(version.map(|v| v as u64))
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
        let key = key.to_string();
        let stored = self.with_conn(move |conn| Self::read(conn, &key)).await?;
        Ok(stored.map(|s| s.value))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), BackendError> {
        let key = key.to_string();
        let text = serde_json::to_string(&value)?;

        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT INTO kv (key, value, version, updated_at)
                VALUES (?1, ?2, 1, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    version = kv.version + 1,
                    updated_at = excluded.updated_at
                "#,
                params![key, text, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    fn versioned(&self) -> Option<&dyn VersionedBackend> {
        Some(self)
    }
}

#[async_trait]
impl VersionedBackend for SqliteBackend {
    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, BackendError> {
        let key = key.to_string();
        self.with_conn(move |conn| Self::read(conn, &key)).await
    }

    async fn set_if_version(
        &self,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<WriteOutcome, BackendError> {
        let key = key.to_string();
        let text = serde_json::to_string(&value)?;

        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            let rows_affected = match expected {
                None => conn.execute(
                    r#"
                    INSERT INTO kv (key, value, version, updated_at)
                    VALUES (?1, ?2, 1, ?3)
                    ON CONFLICT(key) DO NOTHING
                    "#,
                    params![key, text, now],
                )?,
                Some(version) => conn.execute(
                    r#"
                    UPDATE kv SET value = ?2, version = version + 1, updated_at = ?3
                    WHERE key = ?1 AND version = ?4
                    "#,
                    params![key, text, now, version as i64],
                )?,
            };

            if rows_affected == 1 {
                Ok(WriteOutcome::Applied {
                    version: expected.map_or(1, |v| v + 1),
                })
            } else {
                Ok(WriteOutcome::Conflict {
                    current: Self::current_version(conn, &key)?,
                })
            }
        })
        .await
    }
}
