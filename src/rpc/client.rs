//! RPC client for connecting to a running instance.
//!
//! Provides a simple client for sending JSON-RPC requests and for
//! following the notifications the server pushes to every connection.

use std::net::SocketAddr;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;

use super::framing::{DEFAULT_MAX_FRAME_BYTES, Frame, FrameReader, encode_frame};
use super::protocol::{Notification, Request, Response, RpcError};

/// RPC client for communicating with a running instance.
pub struct RpcClient {
    addr: SocketAddr,
}

/// Error returned by RPC client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Communication error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize request: {0}")]
    Serialize(serde_json::Error),
    #[error("Failed to parse response: {0}")]
    Parse(serde_json::Error),
    #[error("Connection closed before a response arrived")]
    Closed,
    #[error("Server sent a frame larger than {0} bytes")]
    Oversized(usize),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl RpcClient {
    /// Create a new client that will connect to the given address.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Call an RPC method and return the result.
    ///
    /// A response that carries neither `result` nor `error` decodes as
    /// JSON `null`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let mut stream = self.connect().await?;

        let request = Request::new(method, params, Value::Number(1.into()));
        let request_line = encode_frame(&request).map_err(ClientError::Serialize)?;
        stream.write_all(request_line.as_bytes()).await?;

        let (reader, _writer) = stream.into_split();
        let mut frames = FrameReader::new(BufReader::new(reader), DEFAULT_MAX_FRAME_BYTES);

        // Notifications may arrive ahead of our response; skip them.
        let response = loop {
            let line = match frames.next_frame().await? {
                Frame::Line(line) => line,
                Frame::Oversized { limit } => return Err(ClientError::Oversized(limit)),
                Frame::Eof => return Err(ClientError::Closed),
            };
            let value: Value = serde_json::from_slice(&line).map_err(ClientError::Parse)?;
            if value.get("method").is_some() && value.get("id").is_none() {
                continue;
            }
            break serde_json::from_value::<Response>(value).map_err(ClientError::Parse)?;
        };

        if let Some(error) = response.error {
            return Err(ClientError::Rpc(error));
        }

        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(ClientError::Parse)
    }

    /// Call an RPC method with no parameters.
    pub async fn call_no_params<T: DeserializeOwned>(
        &self,
        method: &str,
    ) -> Result<T, ClientError> {
        self.call(method, None).await
    }

    /// Open a connection that only listens for pushed notifications.
    pub async fn subscribe(&self) -> Result<NotificationStream, ClientError> {
        let stream = self.connect().await?;
        let (reader, writer) = stream.into_split();

        Ok(NotificationStream {
            frames: FrameReader::new(BufReader::new(reader), DEFAULT_MAX_FRAME_BYTES),
            _writer: writer,
        })
    }

    async fn connect(&self) -> Result<TcpStream, ClientError> {
        TcpStream::connect(self.addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.addr,
                source,
            })
    }
}

/// Notifications pushed by the server over one connection.
pub struct NotificationStream {
    frames: FrameReader<BufReader<OwnedReadHalf>>,
    // Held so the server does not see the connection as half-closed.
    _writer: tokio::net::tcp::OwnedWriteHalf,
}

impl NotificationStream {
    /// Wait for the next notification. Returns `None` once the server
    /// closes the connection.
    pub async fn next(&mut self) -> Result<Option<Notification>, ClientError> {
        loop {
            match self.frames.next_frame().await? {
                Frame::Line(line) => {
                    let notification =
                        serde_json::from_slice(&line).map_err(ClientError::Parse)?;
                    return Ok(Some(notification));
                }
                Frame::Oversized { limit } => {
                    tracing::warn!(limit, "Skipping oversized notification");
                }
                Frame::Eof => return Ok(None),
            }
        }
    }
}
