use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::clock::Clock;
use crate::config::OAuthCfg;
use crate::models::{
    device::{Capability, CapabilityValue, Device, DeviceTemplate},
    token::{is_expired, AccessToken, AuthorizationCode, RefreshToken, TokenPair},
};
use crate::repos::{DeviceRegistry, RegistryError, TokenError, TokenStore};
use crate::security::{generate_token, hash_token, TOKEN_BYTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub code_ttl: Duration,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub rotate_refresh: bool,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self::from(&OAuthCfg::default())
    }
}

impl From<&OAuthCfg> for TokenPolicy {
    fn from(cfg: &OAuthCfg) -> Self {
        Self {
            code_ttl: Duration::seconds(cfg.code_ttl_secs),
            access_ttl: Duration::seconds(cfg.access_ttl_secs),
            refresh_ttl: Duration::seconds(cfg.refresh_ttl_secs),
            rotate_refresh: cfg.rotate_refresh_tokens,
        }
    }
}

/// Process-local token store. Entries are keyed by token hash; expired
/// entries are dropped whenever new ones are issued.
pub struct MemoryTokenStore {
    policy: TokenPolicy,
    clock: Arc<dyn Clock>,
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    access: RwLock<HashMap<String, AccessToken>>,
    refresh: RwLock<HashMap<String, RefreshToken>>,
}

impl MemoryTokenStore {
    pub fn new(policy: TokenPolicy, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            policy,
            clock,
            codes: RwLock::new(HashMap::new()),
            access: RwLock::new(HashMap::new()),
            refresh: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn issue_code(&self, user_id: &str, client_id: &str, redirect_uri: &str) -> String {
        let now = self.clock.now();
        let code = generate_token(TOKEN_BYTES);
        let row = AuthorizationCode {
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            expires_at: now + self.policy.code_ttl,
        };
        let mut codes = self.codes.write().await;
        codes.retain(|_, c| !is_expired(c.expires_at, now));
        codes.insert(hash_token(&code), row);
        code
    }

    async fn consume_code(&self, code: &str) -> Result<AuthorizationCode, TokenError> {
        let row = self
            .codes
            .write()
            .await
            .remove(&hash_token(code))
            .ok_or(TokenError::NotFound)?;
        if is_expired(row.expires_at, self.clock.now()) {
            return Err(TokenError::Expired);
        }
        Ok(row)
    }

    async fn issue_tokens(&self, user_id: &str, client_id: &str) -> TokenPair {
        let now = self.clock.now();
        let access_token = generate_token(TOKEN_BYTES);
        let refresh_token = generate_token(TOKEN_BYTES);
        let refresh_hash = hash_token(&refresh_token);

        let mut refresh = self.refresh.write().await;
        refresh.retain(|_, r| !is_expired(r.expires_at, now));
        refresh.insert(
            refresh_hash.clone(),
            RefreshToken {
                user_id: user_id.to_string(),
                client_id: client_id.to_string(),
                expires_at: now + self.policy.refresh_ttl,
            },
        );
        drop(refresh);

        let mut access = self.access.write().await;
        access.retain(|_, a| !is_expired(a.expires_at, now));
        access.insert(
            hash_token(&access_token),
            AccessToken {
                user_id: user_id.to_string(),
                client_id: client_id.to_string(),
                expires_at: now + self.policy.access_ttl,
                refresh_token_hash: refresh_hash,
            },
        );
        drop(access);

        TokenPair {
            access_token,
            refresh_token,
            expires_in: self.policy.access_ttl.whole_seconds(),
        }
    }

    async fn resolve_access(&self, token: &str) -> Result<String, TokenError> {
        let access = self.access.read().await;
        let row = access.get(&hash_token(token)).ok_or(TokenError::NotFound)?;
        if is_expired(row.expires_at, self.clock.now()) {
            return Err(TokenError::Expired);
        }
        Ok(row.user_id.clone())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let hash = hash_token(refresh_token);
        let row = {
            let mut refresh = self.refresh.write().await;
            let row = refresh.get(&hash).cloned().ok_or(TokenError::NotFound)?;
            if is_expired(row.expires_at, self.clock.now()) {
                return Err(TokenError::Expired);
            }
            if self.policy.rotate_refresh {
                refresh.remove(&hash);
            }
            row
        };
        Ok(self.issue_tokens(&row.user_id, &row.client_id).await)
    }
}

/// Process-local device registry. Each device sits behind its own mutex.
pub struct MemoryDeviceRegistry {
    templates: Vec<DeviceTemplate>,
    owners: RwLock<HashMap<String, BTreeMap<String, Arc<Mutex<Device>>>>>,
}

impl MemoryDeviceRegistry {
    pub fn new(templates: Vec<DeviceTemplate>) -> Arc<Self> {
        Arc::new(Self { templates, owners: RwLock::new(HashMap::new()) })
    }

    async fn device_handle(&self, owner_id: &str, device_id: &str) -> Option<Arc<Mutex<Device>>> {
        self.owners
            .read()
            .await
            .get(owner_id)
            .and_then(|devices| devices.get(device_id))
            .cloned()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn ensure_user(&self, user_id: &str) {
        let mut owners = self.owners.write().await;
        if owners.contains_key(user_id) {
            return;
        }
        let devices = self
            .templates
            .iter()
            .map(|t| (t.id.clone(), Arc::new(Mutex::new(Device::from_template(user_id, t)))))
            .collect();
        owners.insert(user_id.to_string(), devices);
        tracing::info!(user_id, devices = self.templates.len(), "initialized user devices");
    }

    async fn list_for_owner(&self, owner_id: &str) -> Vec<Device> {
        let handles: Vec<Arc<Mutex<Device>>> = match self.owners.read().await.get(owner_id) {
            Some(devices) => devices.values().cloned().collect(),
            None => return Vec::new(),
        };
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.lock().await.clone());
        }
        out
    }

    async fn get(&self, owner_id: &str, device_id: &str) -> Option<Device> {
        let handle = self.device_handle(owner_id, device_id).await?;
        let device = handle.lock().await.clone();
        Some(device)
    }

    async fn set_capability(
        &self,
        owner_id: &str,
        device_id: &str,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<Device, RegistryError> {
        let handle = self
            .device_handle(owner_id, device_id)
            .await
            .ok_or_else(|| RegistryError::DeviceNotFound(device_id.to_string()))?;
        let mut device = handle.lock().await;
        if !device.supports(capability) {
            return Err(RegistryError::NotSupported { device_id: device_id.to_string(), capability });
        }
        device.state.insert(capability, value);
        Ok(device.clone())
    }
}
