use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// How a notice should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// User-facing notices, the CLI equivalent of the popup's toasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notice {
    PromptSaved {
        id: String,
    },
    PromptDeleted {
        id: String,
    },
    NothingToDelete {
        id: String,
    },
    DeleteCancelled {
        id: String,
    },
    PromptCopied {
        id: String,
        chars: usize,
    },
    CopyFailed {
        id: String,
        error: String,
    },
    EmptyPrompt,
    StorageFailed {
        action: String,
        error: String,
    },
    ServerListening {
        addr: String,
    },
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::PromptSaved { .. }
            | Notice::PromptDeleted { .. }
            | Notice::PromptCopied { .. } => NoticeLevel::Success,
            Notice::NothingToDelete { .. }
            | Notice::DeleteCancelled { .. }
            | Notice::ServerListening { .. } => NoticeLevel::Info,
            Notice::CopyFailed { .. } | Notice::EmptyPrompt | Notice::StorageFailed { .. } => {
                NoticeLevel::Error
            }
        }
    }

    /// The short sentence shown to the user.
    pub fn message(&self) -> String {
        match self {
            Notice::PromptSaved { .. } => "Prompt saved successfully".to_string(),
            Notice::PromptDeleted { .. } => "Prompt deleted".to_string(),
            Notice::NothingToDelete { id } => format!("No prompt with id {}", id),
            Notice::DeleteCancelled { .. } => "Delete cancelled".to_string(),
            Notice::PromptCopied { .. } => "Prompt copied to clipboard".to_string(),
            Notice::CopyFailed { .. } => "Failed to copy".to_string(),
            Notice::EmptyPrompt => "Please enter a prompt".to_string(),
            Notice::StorageFailed { action, .. } => format!("Failed to {}", action),
            Notice::ServerListening { addr } => format!("Listening on http://{}", addr),
        }
    }

    /// Extra detail for verbose output, if any.
    fn detail(&self) -> Option<&str> {
        match self {
            Notice::PromptSaved { id }
            | Notice::PromptDeleted { id }
            | Notice::PromptCopied { id, .. } => Some(id.as_str()),
            Notice::CopyFailed { error, .. } | Notice::StorageFailed { error, .. } => {
                Some(error.as_str())
            }
            _ => None,
        }
    }

    /// Serialize with a timestamp, for the notice log file
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Prints notices to stderr and optionally appends them to a JSON-lines file
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn log(&self, notice: &Notice) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", notice.with_timestamp());
            }
        }

        let _ = writeln!(std::io::stderr(), "{}", self.render(notice));
    }

    /// Render a notice as one line in this logger's format.
    pub fn render(&self, notice: &Notice) -> String {
        match self.format {
            LogFormat::Json => serde_json::to_string(notice).unwrap_or_default(),
            LogFormat::Pretty => Self::render_pretty(notice),
            LogFormat::Compact => Self::render_compact(notice),
        }
    }

    fn render_pretty(notice: &Notice) -> String {
        let message = notice.message();
        let line = match notice.level() {
            NoticeLevel::Success => format!("{} {}", "✓".bright_green(), message.bold()),
            NoticeLevel::Info => format!("{} {}", "→".bright_blue(), message),
            NoticeLevel::Error => format!("{} {}", "✗".bright_red(), message.bright_red()),
        };

        match notice.detail() {
            Some(detail) => format!("{} {}", line, format!("({})", detail).dimmed()),
            None => line,
        }
    }

    fn render_compact(notice: &Notice) -> String {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let level = match notice.level() {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        format!("[{}] {}: {}", timestamp, level, notice.message())
    }
}
