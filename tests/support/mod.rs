#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jamrpc::rpc::{ConnectionManager, MethodRegistry, RpcServer, TransportLimits};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(2);

pub struct TestServer {
    pub server: Arc<RpcServer>,
    pub addr: SocketAddr,
    pub connections: ConnectionManager,
    pub task: JoinHandle<()>,
}

pub async fn start_server(registry: MethodRegistry) -> TestServer {
    start_server_with(registry, ConnectionManager::new(), TransportLimits::default()).await
}

pub async fn start_server_with(
    registry: MethodRegistry,
    connections: ConnectionManager,
    limits: TransportLimits,
) -> TestServer {
    let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let server = RpcServer::bind(bind, registry, connections.clone(), limits)
        .await
        .expect("bind test server");
    let addr = server.local_addr().unwrap();
    let server = Arc::new(server);

    let running = server.clone();
    let task = tokio::spawn(async move {
        running.start().await.expect("server run");
    });

    TestServer {
        server,
        addr,
        connections,
        task,
    }
}

/// Wait until the server tracks exactly `expected` connections.
pub async fn wait_for_connections(connections: &ConnectionManager, expected: usize) {
    timeout(WAIT, async {
        while connections.len() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "expected {expected} connections, have {}",
            connections.len()
        )
    });
}

/// A raw line-oriented peer.
pub struct Peer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Peer {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Write raw bytes, newline included by the caller.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write");
    }

    pub async fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    /// Next line from the server, unparsed.
    pub async fn recv_line(&mut self) -> String {
        let mut line = String::new();
        let read = timeout(WAIT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .expect("read");
        assert!(read > 0, "server closed the connection");
        line
    }

    pub async fn recv(&mut self) -> Value {
        let line = self.recv_line().await;
        assert!(line.ends_with('\n'), "frame must be newline-terminated");
        serde_json::from_str(&line).expect("server sent valid JSON")
    }

    pub async fn call(&mut self, line: &str) -> Value {
        self.send(line).await;
        self.recv().await
    }

    /// True if nothing arrives within `wait`.
    pub async fn is_quiet(&mut self, wait: Duration) -> bool {
        let mut line = String::new();
        timeout(wait, self.reader.read_line(&mut line)).await.is_err()
    }
}
