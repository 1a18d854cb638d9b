//! Content relay, served as a browser native-messaging host.
//!
//! Each message on stdin/stdout is a JSON document prefixed by its length as
//! a 32-bit native-endian integer. Requests are tagged by `action`:
//!
//! - `getSelectedText` - replies `{"text": "<current selection>"}`
//! - `performAction` - acknowledged with no reply

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Browsers refuse host messages larger than this.
pub const MAX_OUTGOING_BYTES: usize = 1024 * 1024;

/// Incoming messages above this size are treated as a broken stream.
pub const MAX_INCOMING_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayRequest {
    GetSelectedText,
    PerformAction,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub text: String,
}

/// Where the current text selection comes from
#[async_trait]
pub trait SelectionSource: Send + Sync {
    async fn selected_text(&self) -> Result<String>;
}

/// Reads the selection from a command's stdout (e.g. `xclip -o -selection primary`).
pub struct CommandSelection {
    program: String,
    args: Vec<String>,
}

impl CommandSelection {
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Platform default selection reader.
    pub fn platform_default() -> Self {
        let command: Vec<String> = if cfg!(target_os = "macos") {
            vec!["pbpaste".into()]
        } else if cfg!(windows) {
            vec!["powershell".into(), "-NoProfile".into(), "-Command".into(), "Get-Clipboard".into()]
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            vec!["wl-paste".into(), "--primary".into(), "--no-newline".into()]
        } else {
            vec!["xclip".into(), "-o".into(), "-selection".into(), "primary".into()]
        };

        Self {
            program: command[0].clone(),
            args: command[1..].to_vec(),
        }
    }
}

#[async_trait]
impl SelectionSource for CommandSelection {
    async fn selected_text(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with code {}",
                self.program,
                output.status.code().unwrap_or(-1)
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Read one framed message. `Ok(None)` on a clean end of stream.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    let first = reader
        .read(&mut len_bytes)
        .await
        .context("Failed to read message length")?;
    if first == 0 {
        return Ok(None);
    }
    reader
        .read_exact(&mut len_bytes[first..])
        .await
        .context("Truncated message length")?;

    let len = u32::from_ne_bytes(len_bytes) as usize;
    if len > MAX_INCOMING_BYTES {
        anyhow::bail!("Incoming message of {} bytes exceeds limit", len);
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .context("Truncated message body")?;
    Ok(Some(body))
}

/// Write one framed message.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> Result<()> {
    if body.len() > MAX_OUTGOING_BYTES {
        anyhow::bail!("Reply of {} bytes exceeds the host message limit", body.len());
    }

    let len = body.len() as u32;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Answer one request. `None` means no reply is sent.
pub async fn handle_request(
    request: &RelayRequest,
    source: &dyn SelectionSource,
) -> Option<SelectionResponse> {
    match request {
        RelayRequest::GetSelectedText => {
            let text = match source.selected_text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Could not read selection");
                    String::new()
                }
            };
            Some(SelectionResponse { text })
        }
        RelayRequest::PerformAction => {
            info!("Action performed");
            None
        }
        RelayRequest::Unknown => {
            debug!("Ignoring unknown relay action");
            None
        }
    }
}

/// Serve requests until the browser closes the stream.
pub async fn serve<R, W>(reader: &mut R, writer: &mut W, source: &dyn SelectionSource) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(body) = read_message(reader).await? {
        let request: RelayRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed relay message");
                continue;
            }
        };

        debug!(request = ?request, "Relay request");

        if let Some(response) = handle_request(&request, source).await {
            let mut reply = serde_json::to_vec(&response)?;
            if reply.len() > MAX_OUTGOING_BYTES {
                warn!(bytes = reply.len(), "Selection too large, replying with empty text");
                reply = serde_json::to_vec(&SelectionResponse {
                    text: String::new(),
                })?;
            }
            write_message(writer, &reply).await?;
        }
    }

    debug!("Relay input closed");
    Ok(())
}
