//! Live connection tracking.
//!
//! [`ConnectionManager`] is the single source of truth for which peers are
//! connected. Each entry holds the sending side of that peer's outbound
//! queue; the connection's writer task drains the queue onto the socket.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

/// A fully encoded, newline-terminated frame shared between queues.
pub type OutboundFrame = Arc<str>;

/// Identity of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Peer {
    addr: SocketAddr,
    outbound: mpsc::Sender<OutboundFrame>,
}

/// Thread-safe set of live connections.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    inner: Arc<Mutex<HashMap<ConnectionId, Peer>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly accepted connection.
    pub(crate) fn register(
        &self,
        addr: SocketAddr,
        outbound: mpsc::Sender<OutboundFrame>,
    ) -> ConnectionId {
        let id = ConnectionId::new();
        self.lock().insert(id, Peer { addr, outbound });
        tracing::debug!(connection = %id, peer = %addr, "Connection registered");
        id
    }

    /// Stop tracking a connection. Returns false if it was already gone.
    pub(crate) fn remove(&self, id: ConnectionId) -> bool {
        match self.lock().remove(&id) {
            Some(peer) => {
                tracing::debug!(connection = %id, peer = %peer.addr, "Connection removed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy out every outbound queue so callers can deliver without
    /// holding the lock.
    pub(crate) fn snapshot(&self) -> Vec<(ConnectionId, mpsc::Sender<OutboundFrame>)> {
        self.lock()
            .iter()
            .map(|(id, peer)| (*id, peer.outbound.clone()))
            .collect()
    }

    // A panic while the lock is held cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Peer>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
