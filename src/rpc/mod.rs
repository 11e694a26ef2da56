//! RPC server for inspecting and controlling a running client or server.
//!
//! Provides a JSON-RPC 2.0 interface over TCP, one JSON document per line.
//!
//! ## Architecture
//!
//! - `framing`: newline-delimited frame reader/encoder
//! - `message`: sorts a frame into single request, batch, or malformed input
//! - `methods`: method registry populated by domain modules at startup
//! - `dispatch`: resolves requests to handlers and builds responses
//! - `connections`: tracks live connections
//! - `broadcast`: pushes notifications to every live connection
//! - `transport`: TCP listener and per-connection tasks
//! - `client`: client for connecting to a running instance

mod broadcast;
pub mod client;
mod connections;
mod dispatch;
mod framing;
mod message;
mod methods;
mod protocol;
mod transport;

use std::net::SocketAddr;
use tokio::sync::broadcast as shutdown_channel;

pub use broadcast::Broadcaster;
pub use client::{ClientError, NotificationStream, RpcClient};
pub use connections::{ConnectionId, ConnectionManager};
pub use dispatch::{Dispatcher, Reply};
pub use framing::{DEFAULT_MAX_FRAME_BYTES, Frame, FrameReader, encode_frame};
pub use message::{Message, classify};
pub use methods::{MethodRegistry, RpcMethod};
pub use protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, MethodResult,
    Notification, PARSE_ERROR, Params, Request, Response, RpcError,
};
pub use transport::{DEFAULT_OUTBOUND_QUEUE, ServerError, TransportLimits};

use transport::Transport;

/// RPC server that exposes registered methods to clients.
pub struct RpcServer {
    transport: Transport,
    shutdown_tx: shutdown_channel::Sender<()>,
}

impl RpcServer {
    /// Bind the listener. The registry is frozen from here on.
    pub async fn bind(
        bind_addr: SocketAddr,
        registry: MethodRegistry,
        connections: ConnectionManager,
        limits: TransportLimits,
    ) -> Result<Self, ServerError> {
        let dispatcher = Dispatcher::new(registry);
        let transport = Transport::bind(bind_addr, dispatcher, connections, limits).await?;
        let (shutdown_tx, _) = shutdown_channel::channel(1);

        Ok(Self {
            transport,
            shutdown_tx,
        })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Start the RPC server. Runs until shutdown() is called.
    pub async fn start(&self) -> Result<(), ServerError> {
        let shutdown_rx = self.shutdown_tx.subscribe();
        self.transport.listen(shutdown_rx).await
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// A handle that can trigger shutdown from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }
}

/// Cloneable trigger for [`RpcServer::shutdown`].
#[derive(Clone)]
pub struct ShutdownHandle(shutdown_channel::Sender<()>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.0.send(());
    }
}
