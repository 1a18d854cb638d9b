use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while writing to the clipboard
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Failed to reach clipboard: {0}")]
    Io(#[from] std::io::Error),

    #[error("Clipboard command '{program}' exited with code {code}")]
    CommandFailed { program: String, code: i32 },

    #[error("No clipboard available: {0}")]
    Unavailable(String),

    #[error("Text too large for clipboard ({len} bytes, limit {limit})")]
    TooLarge { len: usize, limit: usize },
}

/// Which clipboard mechanism to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClipboardKind {
    /// System clipboard command if one is installed, else OSC 52
    #[default]
    Auto,
    /// Terminal escape sequence, works over SSH
    Osc52,
    /// System clipboard command (pbcopy, wl-copy, xclip, xsel, clip)
    Command,
}

impl std::fmt::Display for ClipboardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipboardKind::Auto => write!(f, "auto"),
            ClipboardKind::Osc52 => write!(f, "osc52"),
            ClipboardKind::Command => write!(f, "command"),
        }
    }
}

impl std::str::FromStr for ClipboardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ClipboardKind::Auto),
            "osc52" | "osc-52" | "terminal" => Ok(ClipboardKind::Osc52),
            "command" | "system" => Ok(ClipboardKind::Command),
            _ => Err(format!("Unknown clipboard kind: {}", s)),
        }
    }
}

/// Somewhere prompt text can be copied to
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Human-readable name (e.g., "osc52", "wl-copy")
    fn name(&self) -> &str;

    /// Replace the clipboard contents with `text`
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [ClipboardKind::Auto, ClipboardKind::Osc52, ClipboardKind::Command] {
            assert_eq!(kind.to_string().parse::<ClipboardKind>().unwrap(), kind);
        }
        assert_eq!("System".parse::<ClipboardKind>().unwrap(), ClipboardKind::Command);
        assert!("paper".parse::<ClipboardKind>().is_err());
    }
}
