//! TCP transport layer for the RPC server.
//!
//! Handles TCP connections with newline-delimited JSON framing. Each
//! connection runs a reader task that dispatches frames in arrival order
//! and a writer task that owns the socket's write half. Responses and
//! notifications both reach the socket through the writer's queue, so
//! frames are never interleaved.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::connections::{ConnectionManager, OutboundFrame};
use super::dispatch::{Dispatcher, Reply};
use super::framing::{DEFAULT_MAX_FRAME_BYTES, Frame, FrameReader, encode_frame};
use super::protocol::{INVALID_REQUEST, Response, RpcError};

/// Default depth of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// How long a closing connection may spend flushing queued frames.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors raised by the server itself (never by individual requests).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind RPC listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode reply: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Per-connection resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportLimits {
    pub max_frame_bytes: usize,
    pub outbound_queue: usize,
}

impl Default for TransportLimits {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

/// Manages the TCP transport layer.
pub struct Transport {
    listener: TcpListener,
    dispatcher: Dispatcher,
    connections: ConnectionManager,
    limits: TransportLimits,
}

impl Transport {
    pub async fn bind(
        bind_addr: SocketAddr,
        dispatcher: Dispatcher,
        connections: ConnectionManager,
        limits: TransportLimits,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr,
                source,
            })?;

        Ok(Self {
            listener,
            dispatcher,
            connections,
            limits,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the shutdown signal is received, then wait
    /// for open connections to close.
    pub async fn listen(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        info!(addr = %self.local_addr()?, "RPC server listening");
        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            info!(peer = %peer_addr, "RPC client connected");
                            let dispatcher = self.dispatcher.clone();
                            let connections = self.connections.clone();
                            let limits = self.limits;
                            let shutdown = shutdown.resubscribe();
                            tracker.spawn(async move {
                                if let Err(e) = handle_connection(
                                    stream,
                                    peer_addr,
                                    dispatcher,
                                    connections,
                                    limits,
                                    shutdown,
                                )
                                .await
                                {
                                    debug!(peer = %peer_addr, error = %e, "Connection error");
                                }
                                info!(peer = %peer_addr, "RPC client disconnected");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("RPC server shutting down");
                    break;
                }
            }
        }

        tracker.close();
        tracker.wait().await;
        Ok(())
    }
}

/// Handle a single client connection.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    dispatcher: Dispatcher,
    connections: ConnectionManager,
    limits: TransportLimits,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let (reader, writer) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(limits.outbound_queue.max(1));

    let id = connections.register(peer_addr, outbound_tx.clone());
    let writer_task = tokio::spawn(write_frames(writer, outbound_rx));
    let mut frames = FrameReader::new(BufReader::new(reader), limits.max_frame_bytes);

    let result = async {
        loop {
            let frame = tokio::select! {
                frame = frames.next_frame() => frame?,
                _ = outbound_tx.closed() => break,
                _ = shutdown.recv() => break,
            };

            let reply = match frame {
                Frame::Line(line) => dispatcher.handle_frame(&line),
                Frame::Oversized { limit } => {
                    warn!(peer = %peer_addr, limit, "Frame too large");
                    Reply::Single(Response::error(
                        Value::Null,
                        RpcError::new(
                            INVALID_REQUEST,
                            format!("Invalid Request: frame exceeds {limit} bytes"),
                        ),
                    ))
                }
                Frame::Eof => break,
            };

            let line: OutboundFrame = encode_frame(&reply)?.into();
            // A peer that stops reading fills the queue; shutdown must
            // still get through.
            tokio::select! {
                sent = outbound_tx.send(line) => {
                    if sent.is_err() {
                        break;
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        Ok::<(), ServerError>(())
    }
    .await;

    // Once the registry and this task drop their senders, the writer
    // drains whatever is queued and exits. A writer stuck on a peer that
    // never reads is abandoned after the grace period.
    connections.remove(id);
    drop(outbound_tx);
    let mut writer_task = writer_task;
    match timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task).await {
        Ok(Ok(Err(e))) => debug!(peer = %peer_addr, error = %e, "Write failed"),
        Ok(Err(e)) => warn!(peer = %peer_addr, error = %e, "Writer task failed"),
        Ok(Ok(Ok(()))) => {}
        Err(_) => {
            warn!(peer = %peer_addr, "Peer stopped reading, dropping unsent replies");
            writer_task.abort();
        }
    }

    result
}

/// Drain a connection's outbound queue onto its socket.
async fn write_frames(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<OutboundFrame>,
) -> std::io::Result<()> {
    while let Some(frame) = outbound.recv().await {
        writer.write_all(frame.as_bytes()).await?;
    }
    writer.shutdown().await
}
