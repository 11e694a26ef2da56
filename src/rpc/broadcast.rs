//! Notification fan-out to every live connection.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use super::connections::{ConnectionManager, OutboundFrame};
use super::framing::encode_frame;
use super::protocol::Notification;
use crate::logging::LogThrottle;

/// Pushes JSON-RPC notifications to all tracked connections.
///
/// Delivery is best-effort: a peer whose queue is full or already closed
/// is skipped without affecting the others.
#[derive(Clone)]
pub struct Broadcaster {
    connections: ConnectionManager,
    drop_warning: Arc<LogThrottle>,
}

impl Broadcaster {
    pub fn new(connections: ConnectionManager) -> Self {
        Self {
            connections,
            drop_warning: Arc::new(LogThrottle::new(Duration::from_secs(5))),
        }
    }

    /// Send `{"jsonrpc":"2.0","method":method,"params":params}` to every
    /// connection. Returns how many queues accepted the frame.
    pub fn broadcast(&self, method: &str, params: Value) -> usize {
        self.notify(&Notification::new(method, params))
    }

    pub fn notify(&self, notification: &Notification) -> usize {
        let frame: OutboundFrame = match encode_frame(notification) {
            Ok(line) => line.into(),
            Err(e) => {
                warn!(method = %notification.method, error = %e, "Failed to encode notification");
                return 0;
            }
        };

        let mut delivered = 0;
        for (id, outbound) in self.connections.snapshot() {
            match outbound.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    if let Some(suppressed) = self.drop_warning.check() {
                        warn!(
                            connection = %id,
                            method = %notification.method,
                            suppressed,
                            "Peer is not keeping up, dropping notification"
                        );
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(connection = %id, "Skipping notification for closing connection");
                }
            }
        }

        debug!(method = %notification.method, delivered, "Notification broadcast");
        delivered
    }
}
