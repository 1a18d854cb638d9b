//! # promptlib-clipboard
//!
//! Clipboard backends for copying prompt text.
//!
//! - [`Osc52Clipboard`] - terminal escape sequence, works over SSH
//! - [`CommandClipboard`] - pipes into `pbcopy`, `wl-copy`, `xclip`, `xsel` or `clip`

mod command;
mod osc52;
mod traits;

pub use command::CommandClipboard;
pub use osc52::{Osc52Clipboard, MAX_OSC52_BYTES};
pub use traits::{Clipboard, ClipboardError, ClipboardKind};

/// Create a clipboard by kind
pub fn create_clipboard(kind: ClipboardKind) -> Result<Box<dyn Clipboard>, ClipboardError> {
    match kind {
        ClipboardKind::Osc52 => Ok(Box::new(Osc52Clipboard::stdout())),
        ClipboardKind::Command => CommandClipboard::detect()
            .map(|c| Box::new(c) as Box<dyn Clipboard>)
            .ok_or_else(|| {
                ClipboardError::Unavailable("no clipboard command found on PATH".to_string())
            }),
        ClipboardKind::Auto => Ok(match CommandClipboard::detect() {
            Some(command) => Box::new(command),
            None => Box::new(Osc52Clipboard::stdout()),
        }),
    }
}
