use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Controllable device attribute, named the way devices are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    OnOff,
}

impl Capability {
    pub fn platform_type(self) -> &'static str {
        match self {
            Capability::OnOff => "devices.capabilities.on_off",
        }
    }

    pub fn from_platform_type(value: &str) -> Option<Self> {
        match value {
            "devices.capabilities.on_off" => Some(Capability::OnOff),
            _ => None,
        }
    }

    /// Instance name reported next to the value in state payloads.
    pub fn instance(self) -> &'static str {
        match self {
            Capability::OnOff => "on",
        }
    }

    pub fn default_value(self) -> CapabilityValue {
        match self {
            Capability::OnOff => CapabilityValue::Bool(false),
        }
    }

    /// Interprets a raw platform value for this capability.
    pub fn parse_value(self, value: &serde_json::Value) -> Option<CapabilityValue> {
        match self {
            Capability::OnOff => value.as_bool().map(CapabilityValue::Bool),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Relay,
    Switch,
    Socket,
    Light,
}

impl DeviceKind {
    pub fn platform_type(self) -> &'static str {
        match self {
            DeviceKind::Relay | DeviceKind::Switch => "devices.types.switch",
            DeviceKind::Socket => "devices.types.socket",
            DeviceKind::Light => "devices.types.light",
        }
    }
}

/// Configured shape of a device every user gets on first login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTemplate {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub capabilities: BTreeSet<Capability>,
    /// Keys are always a subset of `capabilities`.
    pub state: BTreeMap<Capability, CapabilityValue>,
}

impl Device {
    pub fn from_template(owner_id: &str, template: &DeviceTemplate) -> Self {
        let capabilities: BTreeSet<Capability> = template.capabilities.iter().copied().collect();
        let state = capabilities.iter().map(|c| (*c, c.default_value())).collect();
        Self {
            id: template.id.clone(),
            owner_id: owner_id.to_string(),
            name: template.name.clone(),
            kind: template.kind,
            capabilities,
            state,
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn value(&self, capability: Capability) -> Option<CapabilityValue> {
        self.state.get(&capability).copied()
    }
}
