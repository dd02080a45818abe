//! Control socket: server (during `vayu copy`) and client (for `vayu pause` etc.).
//! Protocol: one command per line: "pause", "resume" or "cancel".

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use vayu_core::TransferEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    Cancel,
}

impl ControlCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlCommand::Pause => "pause",
            ControlCommand::Resume => "resume",
            ControlCommand::Cancel => "cancel",
        }
    }

    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "pause" => Some(ControlCommand::Pause),
            "resume" => Some(ControlCommand::Resume),
            "cancel" => Some(ControlCommand::Cancel),
            _ => None,
        }
    }

    fn apply(self, engine: &TransferEngine) {
        match self {
            ControlCommand::Pause => engine.pause(),
            ControlCommand::Resume => engine.resume(),
            ControlCommand::Cancel => engine.cancel(),
        }
    }
}

/// Removes the socket file when the copy finishes.
pub struct ControlListener {
    path: PathBuf,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        self.task.abort();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Binds `path` and applies each received command to `engine`. Ignores malformed lines.
pub fn spawn_control_listener(
    engine: TransferEngine,
    path: impl AsRef<Path>,
) -> Result<ControlListener> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    let task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let engine = engine.clone();
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            match ControlCommand::parse(&line) {
                                Some(cmd) => {
                                    tracing::debug!(command = cmd.as_str(), "control command");
                                    cmd.apply(&engine);
                                }
                                None => tracing::debug!("ignoring control line {:?}", line),
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(ControlListener { path, task })
}

/// Sends `cmd` to the control socket. Returns `false` if no copy is listening.
pub async fn send_command(socket_path: &Path, cmd: ControlCommand) -> Result<bool> {
    if !socket_path.exists() {
        return Ok(false);
    }
    let mut stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let msg = format!("{}\n", cmd.as_str());
    stream.write_all(msg.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(true)
}
