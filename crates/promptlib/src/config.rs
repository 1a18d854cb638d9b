//! Global configuration file support for promptlib.
//!
//! Loads `config.toml` from the platform config directory
//! (e.g. `~/.config/promptlib/config.toml`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use promptlib_clipboard::ClipboardKind;
use promptlib_logging::LogFormat;
use promptlib_store::{DEFAULT_CONFLICT_RETRIES, DEFAULT_STORAGE_KEY};

/// Directory name under the platform config dir
pub const GLOBAL_CONFIG_DIR: &str = "promptlib";

/// The config file name
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// `database` value selecting a throwaway in-memory store
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Global configuration loaded from `config.toml`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GlobalConfig {
    /// SQLite file holding the prompts, or `:memory:`
    pub database: Option<PathBuf>,
    /// Key the prompt collection is stored under
    pub storage_key: String,
    /// Modality vocabulary offered by pickers and the API
    pub modalities: Vec<String>,
    /// Quiet interval before a live search runs
    pub search_debounce_ms: u64,
    /// Re-reads allowed after a conflicting concurrent write
    pub conflict_retries: u32,
    /// Clipboard mechanism: auto, osc52 or command
    pub clipboard: String,
    /// Default notice and diagnostics format
    pub log_format: LogFormat,
    /// Directory for the diagnostics log and notice history
    pub log_dir: Option<PathBuf>,
    /// HTTP API settings
    pub server: ServerConfig,
    /// Content relay settings
    pub relay: RelayConfig,
}

/// Configuration for `promptlib serve`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Configuration for `promptlib relay`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct RelayConfig {
    /// Command printing the current text selection on stdout
    pub selection_command: Option<Vec<String>>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            database: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            modalities: vec!["text".to_string(), "image".to_string()],
            search_debounce_ms: 150,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            clipboard: ClipboardKind::Auto.to_string(),
            log_format: LogFormat::Pretty,
            log_dir: None,
            server: ServerConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
        }
    }
}

impl GlobalConfig {
    /// Default location of the global config file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE))
    }

    /// Load configuration.
    ///
    /// Returns:
    /// - the parsed file at `explicit` (missing file is an error)
    /// - otherwise the parsed default file, or defaults if it does not exist
    /// - `Err(...)` if a file exists but fails to parse (hard error)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GlobalConfig = toml::from_str(content)?;
        config.clipboard_kind()?;
        Ok(config)
    }

    pub fn clipboard_kind(&self) -> Result<ClipboardKind> {
        self.clipboard
            .parse::<ClipboardKind>()
            .map_err(anyhow::Error::msg)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// True if prompts should live only for this process.
    pub fn is_in_memory(&self) -> bool {
        self.database
            .as_deref()
            .is_some_and(|path| path == Path::new(IN_MEMORY_DATABASE))
    }

    /// Notice history file inside `log_dir`, if one is configured.
    pub fn notice_log_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join("notices.jsonl"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlobalConfig::default();
        assert_eq!(config.storage_key, "prompts");
        assert_eq!(config.modalities, vec!["text", "image"]);
        assert_eq!(config.search_debounce(), Duration::from_millis(150));
        assert_eq!(config.clipboard_kind().unwrap(), ClipboardKind::Auto);
        assert_eq!(config.server.port, 7878);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = GlobalConfig::from_toml(
            r#"
            modalities = ["text", "image", "audio"]
            clipboard = "osc52"
            log_format = "json"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.modalities.len(), 3);
        assert_eq!(config.clipboard_kind().unwrap(), ClipboardKind::Osc52);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.search_debounce_ms, 150);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(GlobalConfig::from_toml("colour = \"blue\"").is_err());
    }

    #[test]
    fn test_bad_clipboard_kind_is_rejected() {
        assert!(GlobalConfig::from_toml("clipboard = \"carrier-pigeon\"").is_err());
    }

    #[test]
    fn test_in_memory_database() {
        let config = GlobalConfig::from_toml("database = \":memory:\"").unwrap();
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(GlobalConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "storage_key = \"snippets\"\n").unwrap();

        let config = GlobalConfig::load(Some(&path)).unwrap();
        assert_eq!(config.storage_key, "snippets");
    }
}
