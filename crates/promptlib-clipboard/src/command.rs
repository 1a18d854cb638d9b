//! Copy by piping text into a system clipboard command.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::{Clipboard, ClipboardError};

/// Candidate commands in preference order for this platform.
fn candidates() -> Vec<(&'static str, Vec<&'static str>)> {
    if cfg!(target_os = "macos") {
        vec![("pbcopy", vec![])]
    } else if cfg!(windows) {
        vec![("clip", vec![])]
    } else {
        let mut list = Vec::new();
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            list.push(("wl-copy", vec![]));
        }
        list.push(("xclip", vec!["-selection", "clipboard"]));
        list.push(("xsel", vec!["--clipboard", "--input"]));
        list
    }
}

/// Locate `program` on `$PATH`.
fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

pub struct CommandClipboard {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandClipboard {
    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());

        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
            name,
        }
    }

    /// First installed clipboard command for this platform, if any.
    pub fn detect() -> Option<Self> {
        candidates().into_iter().find_map(|(program, args)| {
            find_in_path(program).map(|path| {
                debug!(program, path = %path.display(), "Found clipboard command");
                Self::new(path, &args)
            })
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        debug!(
            program = %self.program.display(),
            args = ?self.args,
            bytes = text.len(),
            "Spawning clipboard command"
        );

        // Some of these tools fork and keep serving the selection, so no
        // output pipes are held open.
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipboardError::Unavailable("stdin not captured".to_string()))?;
        stdin.write_all(text.as_bytes()).await?;
        stdin.shutdown().await?;
        drop(stdin);

        let status = child.wait().await?;
        if !status.success() {
            return Err(ClipboardError::CommandFailed {
                program: self.name.clone(),
                code: status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }
}
