//! Line-delimited protocol server.
//!
//! One read loop accepts messages in arrival order and never waits on a job:
//! each invocation runs in its own task and replies through a single writer
//! task, so completions may reorder but frames never interleave. Native
//! envelopes and MCP JSON-RPC share the same stream; a `jsonrpc` member selects
//! the latter.

mod mcp;
mod native;

#[cfg(test)]
mod tests;

use super::gateway::Gateway;
use super::inflight::InFlightGuard;
use crate::domain::ServiceError;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("output writer task failed: {0}")]
    Writer(#[from] JoinError),
}

/// Serve the protocol on the process's stdin and stdout until stdin closes.
pub async fn run(gateway: Arc<Gateway>) -> Result<(), StdioError> {
    info!("Serving tool protocol on stdio");
    serve(gateway, BufReader::new(io::stdin()), io::stdout()).await
}

/// Serve the protocol over any line stream. Returns after end of input, once
/// every in-flight invocation has been cancelled and joined and all replies
/// have been written.
pub async fn serve<R, W>(gateway: Arc<Gateway>, reader: R, writer: W) -> Result<(), StdioError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbound, inbound) = mpsc::channel(OUTBOUND_CAPACITY);
    let writer_task = tokio::spawn(write_frames(writer, inbound));

    let mut session = Session {
        gateway,
        outbound,
        workers: JoinSet::new(),
        cancel: CancellationToken::new(),
    };
    let read_result = session.read_loop(reader).await;
    session.shutdown().await;
    drop(session);

    let write_result = writer_task.await?;
    read_result?;
    write_result?;
    info!("Stdio session finished");
    Ok(())
}

async fn write_frames<W>(mut writer: W, mut inbound: mpsc::Receiver<String>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = inbound.recv().await {
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

fn encode<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(error) => {
            error!(%error, "Failed to serialise reply");
            None
        }
    }
}

struct Session {
    gateway: Arc<Gateway>,
    outbound: mpsc::Sender<String>,
    workers: JoinSet<()>,
    /// Parent of every invocation token admitted by this session.
    cancel: CancellationToken,
}

impl Session {
    async fn read_loop<R>(&mut self, mut reader: R) -> Result<(), StdioError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buffer = Vec::new();
        loop {
            tokio::select! {
                read = reader.read_until(b'\n', &mut buffer) => {
                    if read? == 0 {
                        debug!("Input closed");
                        return Ok(());
                    }
                    let line = std::mem::take(&mut buffer);
                    self.handle_line(line).await;
                }
                Some(joined) = self.workers.join_next(), if !self.workers.is_empty() => {
                    reap(joined);
                }
            }
        }
    }

    async fn handle_line(&mut self, raw: Vec<u8>) {
        let Ok(text) = String::from_utf8(raw) else {
            self.send(&native::failure(None, "line is not valid UTF-8"))
                .await;
            return;
        };
        let line = text.trim();
        if line.is_empty() {
            return;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) if value.get("jsonrpc").is_some() => self.handle_mcp(value).await,
            Ok(value) => self.handle_native(value).await,
            Err(error) if line.contains("\"jsonrpc\"") => {
                self.send(&mcp::parse_error(&error)).await;
            }
            Err(error) => {
                self.send(&native::failure(None, &format!("invalid JSON: {error}")))
                    .await;
            }
        }
    }

    async fn send<T: Serialize>(&self, message: &T) {
        if let Some(frame) = encode(message) {
            if self.outbound.send(frame).await.is_err() {
                debug!("Output closed; dropping reply");
            }
        }
    }

    /// Run an admitted invocation in its own task. `reply` turns the outcome
    /// into a frame, or `None` to stay silent.
    fn spawn_invocation<F>(&mut self, guard: InFlightGuard, tool: String, params: Value, reply: F)
    where
        F: FnOnce(Result<Value, ServiceError>) -> Option<String> + Send + 'static,
    {
        let gateway = Arc::clone(&self.gateway);
        let outbound = self.outbound.clone();
        self.workers.spawn(async move {
            let result = gateway.invoke(&guard, &tool, params).await;
            drop(guard);
            if let Some(frame) = reply(result) {
                if outbound.send(frame).await.is_err() {
                    debug!(tool = tool.as_str(), "Output closed; dropping reply");
                }
            }
        });
    }

    /// Cancel everything this session started and wait for it to finish.
    async fn shutdown(&mut self) {
        if !self.workers.is_empty() {
            info!(
                pending = self.workers.len(),
                "Cancelling in-flight invocations"
            );
        }
        self.cancel.cancel();
        while let Some(joined) = self.workers.join_next().await {
            reap(joined);
        }
    }
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(error) = joined {
        error!(%error, "Invocation task ended abnormally");
    }
}
