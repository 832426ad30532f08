use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

/// Split `<surface> [payload]` at the first run of whitespace.
///
/// Returns `None` for blank lines. The payload keeps its inner spacing.
pub fn split_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((surface, payload)) => Some((surface, payload.trim_start())),
        None => Some((line, "")),
    }
}

/// Forward stdin lines until EOF
pub async fn read_stdin(tx: mpsc::Sender<String>) -> Result<()> {
    tracing::info!("Reading commands from stdin");
    forward_lines(BufReader::new(tokio::io::stdin()), &tx).await?;
    tracing::info!("Stdin closed");
    Ok(())
}

/// Bind the command socket, replacing a file left behind by an earlier run
pub fn bind_socket(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        tracing::debug!("Removing stale socket {:?}", path);
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove stale socket: {:?}", path))?;
    }

    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind command socket: {:?}", path))?;
    tracing::info!("Listening for commands on {:?}", path);
    Ok(listener)
}

/// Accept clients forever; each one gets its own reader task
pub async fn listen_socket(listener: UnixListener, tx: mpsc::Sender<String>) -> Result<()> {
    loop {
        let (stream, _addr) = listener
            .accept()
            .await
            .context("Failed to accept command client")?;
        tracing::debug!("Command client connected");
        tokio::spawn(serve_client(stream, tx.clone()));
    }
}

async fn serve_client(stream: UnixStream, tx: mpsc::Sender<String>) {
    match forward_lines(BufReader::new(stream), &tx).await {
        Ok(()) => tracing::debug!("Command client disconnected"),
        Err(e) => tracing::warn!("Command client failed: {:#}", e),
    }
}

async fn forward_lines<R>(reader: R, tx: &mpsc::Sender<String>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        if tx.send(line).await.is_err() {
            // Dispatch loop is gone
            break;
        }
    }
    Ok(())
}
