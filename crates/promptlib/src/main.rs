mod api;
mod commands;
mod config;
mod debounce;
mod popup;
mod relay;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use promptlib_clipboard::{create_clipboard, Clipboard, Osc52Clipboard};
use promptlib_logging::{init_tracing, LogFormat, Logger};
use promptlib_store::{Backend, MemoryBackend, PromptStore, SqliteBackend};

use crate::config::GlobalConfig;
use crate::popup::Popup;
use crate::relay::CommandSelection;

#[derive(Parser, Debug)]
#[command(
    name = "promptlib",
    about = "A personal library of reusable prompts",
    version,
    author
)]
struct Cli {
    /// Config file (default: ~/.config/promptlib/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database holding the prompts, or `:memory:`
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Notice and diagnostics format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatChoice>,

    /// Diagnostics filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every prompt, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Search prompt text and tags
    Search {
        /// Case-insensitive text to look for
        query: Option<String>,

        /// Only prompts with exactly this modality
        #[arg(short, long)]
        modality: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Save a new prompt (`-` reads the text from stdin)
    Add {
        text: String,

        #[arg(short, long, default_value = "text")]
        modality: String,

        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Copy a prompt's text to the clipboard
    Copy {
        /// Prompt id or unique id prefix (interactive picker if omitted)
        id: Option<String>,
    },
    /// Delete a prompt after confirmation
    Rm {
        /// Prompt id or unique id prefix (interactive picker if omitted)
        id: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Search as you type: one query per stdin line
    Live {
        #[arg(short, long)]
        modality: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Serve the prompt library over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run as a browser native-messaging host
    Relay {
        /// Command printing the current selection (overrides the config)
        #[arg(long = "selection-cmd", num_args = 1.., allow_hyphen_values = true)]
        selection_cmd: Option<Vec<String>>,
    },
    /// List the configured modalities
    Modalities,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = GlobalConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = Some(database);
    }

    let log_format: LogFormat = cli.log_format.map(Into::into).unwrap_or(config.log_format);

    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    let _guard = init_tracing(&cli.log_level, log_format, config.log_dir.as_deref());

    let logger = Arc::new(match config.notice_log_path() {
        Some(path) => Logger::with_file(log_format, &path)
            .with_context(|| format!("Failed to open {}", path.display()))?,
        None => Logger::new(log_format),
    });

    run_command(cli.command, config, logger).await
}

/// Dispatch one command. Only commands that read or write prompts open the database.
async fn run_command(command: Commands, config: GlobalConfig, logger: Arc<Logger>) -> Result<()> {
    match command {
        Commands::Serve { host, port } => {
            let store = open_store(&config)?;
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            serve::handle_serve_command(store, config.modalities, &host, port, &logger).await
        }
        Commands::Relay { selection_cmd } => {
            let command = selection_cmd.or(config.relay.selection_command);
            let source = match command {
                Some(command) => CommandSelection::new(&command)
                    .context("Selection command must name a program")?,
                None => CommandSelection::platform_default(),
            };
            let mut stdin = tokio::io::stdin();
            let mut stdout = tokio::io::stdout();
            relay::serve(&mut stdin, &mut stdout, &source).await
        }
        Commands::Copy { id } => {
            let mut popup = open_popup(&config, logger, true)?;
            commands::handle_copy(&mut popup, id).await
        }
        Commands::Rm { id, yes } => {
            let mut popup = open_popup(&config, logger, false)?;
            commands::handle_remove(&mut popup, id, yes).await
        }
        Commands::List { json } => {
            let mut popup = open_popup(&config, logger, false)?;
            commands::handle_list(&mut popup, json).await
        }
        Commands::Search {
            query,
            modality,
            json,
        } => {
            let mut popup = open_popup(&config, logger, false)?;
            commands::handle_search(&mut popup, query, modality, json).await
        }
        Commands::Add {
            text,
            modality,
            tags,
            json,
        } => {
            let mut popup = open_popup(&config, logger, false)?;
            commands::handle_add(&mut popup, text, modality, tags, json).await
        }
        Commands::Live { modality, json } => {
            let mut popup = open_popup(&config, logger, false)?;
            commands::handle_live(&mut popup, modality, config.search_debounce(), json).await
        }
        Commands::Modalities => {
            commands::handle_modalities(&config.modalities);
            Ok(())
        }
    }
}

fn open_store(config: &GlobalConfig) -> Result<PromptStore> {
    let backend: Arc<dyn Backend> = if config.is_in_memory() {
        Arc::new(MemoryBackend::new())
    } else {
        let path = config
            .database
            .clone()
            .unwrap_or_else(SqliteBackend::default_path);
        Arc::new(
            SqliteBackend::open_at(&path)
                .with_context(|| format!("Failed to open database {}", path.display()))?,
        )
    };

    Ok(PromptStore::new(backend)
        .with_key(config.storage_key.clone())
        .with_conflict_retries(config.conflict_retries))
}

/// A missing clipboard is only fatal when `needs_clipboard` is set.
fn open_popup(
    config: &GlobalConfig,
    logger: Arc<Logger>,
    needs_clipboard: bool,
) -> Result<Popup> {
    let store = open_store(config)?;
    let clipboard: Arc<dyn Clipboard> = match create_clipboard(config.clipboard_kind()?) {
        Ok(clipboard) => Arc::from(clipboard),
        Err(e) if !needs_clipboard => {
            warn!(error = %e, "Clipboard unavailable");
            Arc::new(Osc52Clipboard::stdout())
        }
        Err(e) => return Err(e).context("Failed to open clipboard"),
    };

    Ok(Popup::new(store, clipboard, logger))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_logger() -> Arc<Logger> {
        Arc::new(Logger::new(LogFormat::Compact))
    }

    #[tokio::test]
    async fn test_modalities_does_not_create_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let database = dir.path().join("data").join("promptlib.db");
        let config = GlobalConfig {
            database: Some(database.clone()),
            ..GlobalConfig::default()
        };

        run_command(Commands::Modalities, config, quiet_logger())
            .await
            .unwrap();

        assert!(!database.exists());
        assert!(!dir.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_list_opens_configured_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let database = dir.path().join("data").join("promptlib.db");
        let config = GlobalConfig {
            database: Some(database.clone()),
            clipboard: "osc52".to_string(),
            ..GlobalConfig::default()
        };

        run_command(Commands::List { json: true }, config, quiet_logger())
            .await
            .unwrap();

        assert!(database.exists());
    }

    #[test]
    fn test_cli_parses_relay_selection_command() {
        let cli = Cli::try_parse_from([
            "promptlib",
            "relay",
            "--selection-cmd",
            "xsel",
            "-o",
        ])
        .unwrap();

        match cli.command {
            Commands::Relay { selection_cmd } => {
                assert_eq!(selection_cmd, Some(vec!["xsel".to_string(), "-o".to_string()]));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
