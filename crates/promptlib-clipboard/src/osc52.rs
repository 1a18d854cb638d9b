//! Copy through the terminal with an OSC 52 escape sequence.
//!
//! Works in most modern terminal emulators and across SSH, since the
//! terminal itself owns the clipboard.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::{Clipboard, ClipboardError};

/// Larger payloads are silently dropped by several terminals.
pub const MAX_OSC52_BYTES: usize = 74_994;

pub struct Osc52Clipboard<W: Write + Send> {
    writer: Mutex<W>,
    tmux: bool,
}

impl Osc52Clipboard<std::io::Stdout> {
    /// Write to stdout, wrapping for tmux when `$TMUX` is set.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout()).with_tmux(std::env::var_os("TMUX").is_some())
    }
}

impl<W: Write + Send> Osc52Clipboard<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            tmux: false,
        }
    }

    /// Wrap the sequence in a tmux DCS passthrough.
    pub fn with_tmux(mut self, tmux: bool) -> Self {
        self.tmux = tmux;
        self
    }

    /// Build the escape sequence for `text`.
    pub fn sequence(&self, text: &str) -> Result<String, ClipboardError> {
        if text.len() > MAX_OSC52_BYTES {
            return Err(ClipboardError::TooLarge {
                len: text.len(),
                limit: MAX_OSC52_BYTES,
            });
        }

        let encoded = STANDARD.encode(text.as_bytes());
        let osc = format!("\x1b]52;c;{}\x07", encoded);

        if self.tmux {
            Ok(format!("\x1bPtmux;\x1b{}\x1b\\", osc))
        } else {
            Ok(osc)
        }
    }

    pub fn into_inner(self) -> Result<W, ClipboardError> {
        self.writer
            .into_inner()
            .map_err(|_| ClipboardError::Unavailable("terminal writer lock poisoned".to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> Clipboard for Osc52Clipboard<W> {
    fn name(&self) -> &str {
        "osc52"
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let sequence = self.sequence(text)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ClipboardError::Unavailable("terminal writer lock poisoned".to_string()))?;

        writer.write_all(sequence.as_bytes())?;
        writer.flush()?;

        debug!(bytes = text.len(), tmux = self.tmux, "Wrote OSC 52 sequence");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_escape_sequence() {
        let clipboard = Osc52Clipboard::new(Vec::new());
        clipboard.write_text("hello").await.unwrap();

        let written = clipboard.into_inner().unwrap();
        assert_eq!(written, b"\x1b]52;c;aGVsbG8=\x07");
    }

    #[test]
    fn test_tmux_passthrough() {
        let clipboard = Osc52Clipboard::new(Vec::new()).with_tmux(true);
        let seq = clipboard.sequence("hi").unwrap();

        assert!(seq.starts_with("\x1bPtmux;\x1b\x1b]52;c;"));
        assert!(seq.ends_with("\x07\x1b\\"));
    }

    #[tokio::test]
    async fn test_rejects_oversized_text() {
        let clipboard = Osc52Clipboard::new(Vec::new());
        let big = "x".repeat(MAX_OSC52_BYTES + 1);

        let err = clipboard.write_text(&big).await.unwrap_err();
        assert!(matches!(err, ClipboardError::TooLarge { .. }));
        assert!(clipboard.into_inner().unwrap().is_empty());
    }
}
