use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    device::{Capability, CapabilityValue, Device},
    token::{AuthorizationCode, TokenPair},
};

pub mod memory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token not found")]
    NotFound,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("device '{0}' not found")]
    DeviceNotFound(String),
    #[error("device '{device_id}' does not support {capability:?}")]
    NotSupported { device_id: String, capability: Capability },
}

/// Authorization codes, access tokens and refresh tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn issue_code(&self, user_id: &str, client_id: &str, redirect_uri: &str) -> String;
    /// Removes the code; a second call for the same code is `NotFound`.
    async fn consume_code(&self, code: &str) -> Result<AuthorizationCode, TokenError>;
    async fn issue_tokens(&self, user_id: &str, client_id: &str) -> TokenPair;
    async fn resolve_access(&self, token: &str) -> Result<String, TokenError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError>;
}

/// Per-user devices and their capability state.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Creates the user's devices from the configured templates if absent.
    async fn ensure_user(&self, user_id: &str);
    async fn list_for_owner(&self, owner_id: &str) -> Vec<Device>;
    async fn get(&self, owner_id: &str, device_id: &str) -> Option<Device>;
    async fn set_capability(
        &self,
        owner_id: &str,
        device_id: &str,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<Device, RegistryError>;
}
