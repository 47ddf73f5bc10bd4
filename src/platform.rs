//! Wire types of the voice platform's smart-home API and the mapping from
//! registry devices into them.

use serde::{Deserialize, Serialize};

use crate::models::device::{Capability, CapabilityValue, Device};

#[derive(Debug, Serialize)]
pub struct Envelope<P> {
    pub request_id: String,
    pub payload: P,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryPayload {
    pub user_id: String,
    pub devices: Vec<DiscoveredDevice>,
}

#[derive(Debug, Serialize)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: &'static str,
    pub capabilities: Vec<CapabilityInfo>,
}

#[derive(Debug, Serialize)]
pub struct CapabilityInfo {
    #[serde(rename = "type")]
    pub capability_type: &'static str,
    pub retrievable: bool,
}

#[derive(Debug, Serialize)]
pub struct DevicesPayload<D> {
    pub devices: Vec<D>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub devices: Vec<DeviceRef>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceRef {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceStateReport {
    pub id: String,
    pub capabilities: Vec<CapabilityStateReport>,
}

#[derive(Debug, Serialize)]
pub struct CapabilityStateReport {
    #[serde(rename = "type")]
    pub capability_type: &'static str,
    pub state: InstanceValue,
}

#[derive(Debug, Serialize)]
pub struct InstanceValue {
    pub instance: &'static str,
    pub value: CapabilityValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub payload: ActionPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionPayload {
    #[serde(default)]
    pub devices: Vec<ActionDevice>,
}

#[derive(Debug, Deserialize)]
pub struct ActionDevice {
    pub id: String,
    #[serde(default)]
    pub capabilities: Vec<RequestedCapability>,
}

#[derive(Debug, Deserialize)]
pub struct RequestedCapability {
    #[serde(rename = "type")]
    pub capability_type: String,
    #[serde(default)]
    pub state: RequestedState,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestedState {
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ActionDeviceResult {
    pub id: String,
    pub capabilities: Vec<ActionCapabilityResult>,
}

#[derive(Debug, Serialize)]
pub struct ActionCapabilityResult {
    #[serde(rename = "type")]
    pub capability_type: String,
    pub state: ActionResultState,
}

#[derive(Debug, Serialize)]
pub struct ActionResultState {
    pub instance: String,
    pub action_result: ActionResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ActionErrorCode>,
}

impl ActionResult {
    pub fn done() -> Self {
        Self { status: ActionStatus::Done, error_code: None }
    }

    pub fn error(code: ActionErrorCode) -> Self {
        Self { status: ActionStatus::Error, error_code: Some(code) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionErrorCode {
    DeviceNotFound,
    NotSupported,
    InvalidValue,
}

impl From<&Device> for DiscoveredDevice {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
            device_type: device.kind.platform_type(),
            capabilities: device
                .capabilities
                .iter()
                .map(|c| CapabilityInfo { capability_type: c.platform_type(), retrievable: true })
                .collect(),
        }
    }
}

impl From<&Device> for DeviceStateReport {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            capabilities: device
                .state
                .iter()
                .map(|(c, v)| CapabilityStateReport {
                    capability_type: c.platform_type(),
                    state: InstanceValue { instance: c.instance(), value: *v },
                })
                .collect(),
        }
    }
}

impl ActionCapabilityResult {
    /// Builds a result echoing the requested type; the instance falls back to
    /// the capability's own when the request left it empty.
    pub fn for_request(requested: &RequestedCapability, result: ActionResult) -> Self {
        let instance = if requested.state.instance.is_empty() {
            Capability::from_platform_type(&requested.capability_type)
                .map(|c| c.instance().to_string())
                .unwrap_or_default()
        } else {
            requested.state.instance.clone()
        };
        Self {
            capability_type: requested.capability_type.clone(),
            state: ActionResultState { instance, action_result: result },
        }
    }
}
