//! Live command channels to connected devices, keyed by owner and device id.
//!
//! Every connection is owned by a single task. Other parts of the server
//! reach it through that connection's bounded queue.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::device::{Capability, CapabilityValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAction {
    TurnOn,
    TurnOff,
}

/// Frame pushed to a device, e.g. `{"action":"turn_on"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub action: DeviceAction,
}

impl DeviceCommand {
    pub fn turn_on() -> Self {
        Self { action: DeviceAction::TurnOn }
    }

    pub fn turn_off() -> Self {
        Self { action: DeviceAction::TurnOff }
    }

    pub fn for_capability(capability: Capability, value: CapabilityValue) -> Self {
        match (capability, value) {
            (Capability::OnOff, CapabilityValue::Bool(true)) => Self::turn_on(),
            (Capability::OnOff, CapabilityValue::Bool(false)) => Self::turn_off(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered; the device has not said anything yet.
    Connected,
    /// At least one frame received from the device.
    Active,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Inbound,
    Closed,
}

impl ConnectionState {
    pub fn on_event(self, event: ConnectionEvent) -> Self {
        match (self, event) {
            (ConnectionState::Disconnected, _) => ConnectionState::Disconnected,
            (_, ConnectionEvent::Closed) => ConnectionState::Disconnected,
            (_, ConnectionEvent::Inbound) => ConnectionState::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("device '{0}' is not connected")]
    NotConnected(String),
    #[error("connection to device '{0}' is closed")]
    Closed(String),
}

/// Identity a device connects under. A connection bound to an owner only
/// receives that owner's commands; an unbound one receives commands for its
/// device id from any owner that has no bound connection of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    pub owner_id: Option<String>,
    pub device_id: String,
}

impl ChannelKey {
    pub fn owned(owner_id: &str, device_id: &str) -> Self {
        Self { owner_id: Some(owner_id.to_string()), device_id: device_id.to_string() }
    }

    pub fn unbound(device_id: &str) -> Self {
        Self { owner_id: None, device_id: device_id.to_string() }
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.owner_id {
            Some(owner) => write!(f, "{}/{}", owner, self.device_id),
            None => f.write_str(&self.device_id),
        }
    }
}

struct ChannelHandle {
    connection_id: Uuid,
    commands: mpsc::Sender<DeviceCommand>,
}

/// What a newly registered connection gets back: its identity and the
/// receiving end of its command queue.
#[derive(Debug)]
pub struct Registration {
    pub connection_id: Uuid,
    pub commands: mpsc::Receiver<DeviceCommand>,
}

#[derive(Clone)]
pub struct DeviceChannels {
    inner: Arc<RwLock<HashMap<ChannelKey, ChannelHandle>>>,
    capacity: usize,
}

impl DeviceChannels {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), capacity: capacity.max(1) }
    }

    /// Registers a connection under `key`. An existing connection with the
    /// same key loses its queue and shuts down.
    pub async fn register(&self, key: ChannelKey) -> Registration {
        let (tx, rx) = mpsc::channel(self.capacity);
        let connection_id = Uuid::new_v4();
        let previous = self
            .inner
            .write()
            .await
            .insert(key.clone(), ChannelHandle { connection_id, commands: tx });
        if let Some(previous) = previous {
            tracing::info!(
                %key,
                replaced = %previous.connection_id,
                %connection_id,
                "device channel replaced"
            );
        }
        Registration { connection_id, commands: rx }
    }

    /// Removes the entry only if it still belongs to `connection_id`.
    pub async fn unregister(&self, key: &ChannelKey, connection_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        match inner.get(key) {
            Some(handle) if handle.connection_id == connection_id => {
                inner.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Queues a command for the owner's device, preferring a connection bound
    /// to that owner over an unbound one. Waits while the queue is full.
    pub async fn send(
        &self,
        owner_id: &str,
        device_id: &str,
        command: DeviceCommand,
    ) -> Result<(), ChannelError> {
        let tx = {
            let inner = self.inner.read().await;
            inner
                .get(&ChannelKey::owned(owner_id, device_id))
                .or_else(|| inner.get(&ChannelKey::unbound(device_id)))
                .map(|h| h.commands.clone())
                .ok_or_else(|| ChannelError::NotConnected(device_id.to_string()))?
        };
        tx.send(command)
            .await
            .map_err(|_| ChannelError::Closed(device_id.to_string()))
    }

    pub async fn is_connected(&self, key: &ChannelKey) -> bool {
        self.inner.read().await.contains_key(key)
    }

    pub async fn connected(&self) -> Vec<ChannelKey> {
        let mut keys: Vec<ChannelKey> = self.inner.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
