//! State of the local client as seen through the RPC interface.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::json;
use tracing::info;

use super::models::{ChannelInfo, SkillLevel};
use crate::rpc::Broadcaster;

/// Longest channel name, in characters. Longer names are truncated.
pub const MAX_NAME_CHARS: usize = 16;

#[derive(Default)]
struct ClientInner {
    connected: bool,
    channel: ChannelInfo,
}

/// Shared handle on the client's connection and channel state.
///
/// State changes that remote tools care about are pushed to every RPC
/// connection as notifications.
#[derive(Clone)]
pub struct ClientState {
    inner: Arc<RwLock<ClientInner>>,
    broadcaster: Broadcaster,
}

impl ClientState {
    pub fn new(name: &str, broadcaster: Broadcaster) -> Self {
        let inner = ClientInner {
            connected: false,
            channel: ChannelInfo {
                name: truncate_name(name),
                skill_level: None,
            },
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
            broadcaster,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.read().connected
    }

    pub fn channel_info(&self) -> ChannelInfo {
        self.read().channel.clone()
    }

    /// Set the channel name, returning the name actually stored.
    pub fn set_name(&self, name: &str) -> String {
        let name = truncate_name(name);
        self.write().channel.name = name.clone();
        name
    }

    pub fn set_skill_level(&self, skill_level: Option<SkillLevel>) {
        self.write().channel.skill_level = skill_level;
    }

    /// Record a change in the connection to the server. Notifies only on
    /// actual transitions.
    pub fn set_connected(&self, connected: bool) {
        let changed = {
            let mut inner = self.write();
            let changed = inner.connected != connected;
            inner.connected = connected;
            changed
        };

        if changed {
            info!(connected, "Client connection state changed");
            let method = if connected {
                "jamulusclient/connected"
            } else {
                "jamulusclient/disconnected"
            };
            self.broadcaster.broadcast(method, json!({}));
        }
    }

    pub fn chat_text_received(&self, chat_text: &str) {
        self.broadcaster.broadcast(
            "jamulusclient/chatTextReceived",
            json!({ "chatText": chat_text }),
        );
    }

    pub fn channel_levels_received(&self, levels: &[u16]) {
        self.broadcaster.broadcast(
            "jamulusclient/channelLevelListReceived",
            json!({ "channelLevelList": levels }),
        );
    }

    fn read(&self) -> RwLockReadGuard<'_, ClientInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClientInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}
