use serde::Deserialize;

use crate::models::device::{Capability, DeviceKind, DeviceTemplate};

pub const DEFAULT_CLIENT_ID: &str = "my-smart-home";
pub const DEFAULT_CLIENT_SECRET: &str = "supersecret123";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerCfg {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr(), public_url: default_public_url() }
    }
}

/// The single OAuth client (the voice platform) and token lifetimes.
#[derive(Clone, Deserialize)]
pub struct OAuthCfg {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_client_secret")]
    pub client_secret: String,
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: i64,
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,
    /// Drop the presented refresh token once it has been exchanged.
    #[serde(default)]
    pub rotate_refresh_tokens: bool,
    /// Empty means any absolute redirect URI is accepted.
    #[serde(default)]
    pub allowed_redirect_uris: Vec<String>,
}

impl Default for OAuthCfg {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            client_secret: default_client_secret(),
            code_ttl_secs: default_code_ttl(),
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
            rotate_refresh_tokens: false,
            allowed_redirect_uris: Vec::new(),
        }
    }
}

impl std::fmt::Debug for OAuthCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCfg")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("code_ttl_secs", &self.code_ttl_secs)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("rotate_refresh_tokens", &self.rotate_refresh_tokens)
            .field("allowed_redirect_uris", &self.allowed_redirect_uris)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelCfg {
    /// Push `turn_on` as soon as a device connects.
    #[serde(default = "default_true")]
    pub push_on_connect: bool,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ChannelCfg {
    fn default() -> Self {
        Self { push_on_connect: true, queue_capacity: default_queue_capacity() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerCfg,
    #[serde(default)]
    pub oauth: OAuthCfg,
    #[serde(default)]
    pub channel: ChannelCfg,
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceTemplate>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerCfg::default(),
            oauth: OAuthCfg::default(),
            channel: ChannelCfg::default(),
            devices: default_devices(),
        }
    }
}

fn default_bind_addr() -> String { "127.0.0.1:8080".to_string() }
fn default_public_url() -> String { "http://127.0.0.1:8080".to_string() }
fn default_client_id() -> String { DEFAULT_CLIENT_ID.to_string() }
fn default_client_secret() -> String { DEFAULT_CLIENT_SECRET.to_string() }
fn default_code_ttl() -> i64 { 600 }
fn default_access_ttl() -> i64 { 3600 }
fn default_refresh_ttl() -> i64 { 30 * 24 * 3600 }
fn default_true() -> bool { true }
fn default_queue_capacity() -> usize { 16 }

fn default_devices() -> Vec<DeviceTemplate> {
    vec![DeviceTemplate {
        id: "relay_1".to_string(),
        name: "Room light".to_string(),
        kind: DeviceKind::Relay,
        capabilities: vec![Capability::OnOff],
    }]
}

impl AppConfig {
    /// Reads `bridge.toml` (optional) and `BRIDGE_*` environment variables,
    /// e.g. `BRIDGE_SERVER__BIND_ADDR` or `BRIDGE_OAUTH__CLIENT_SECRET`.
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("bridge").required(false))
            .add_source(
                config::Environment::with_prefix("BRIDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("oauth.allowed_redirect_uris"),
            )
            .build()?;

        let cfg: AppConfig = settings.try_deserialize()?;
        cfg.validate()?;

        if cfg.oauth.client_secret == DEFAULT_CLIENT_SECRET {
            tracing::warn!("using the built-in demo client secret; set BRIDGE_OAUTH__CLIENT_SECRET");
        }
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.oauth.client_id.is_empty() {
            anyhow::bail!("oauth.client_id must not be empty");
        }
        for (name, ttl) in [
            ("oauth.code_ttl_secs", self.oauth.code_ttl_secs),
            ("oauth.access_ttl_secs", self.oauth.access_ttl_secs),
            ("oauth.refresh_ttl_secs", self.oauth.refresh_ttl_secs),
        ] {
            if ttl <= 0 {
                anyhow::bail!("{} must be positive, got {}", name, ttl);
            }
        }
        if self.channel.queue_capacity == 0 {
            anyhow::bail!("channel.queue_capacity must be at least 1");
        }
        let mut seen = std::collections::HashSet::new();
        for d in &self.devices {
            if !seen.insert(d.id.as_str()) {
                anyhow::bail!("duplicate device id '{}' in devices", d.id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.oauth.client_id, "my-smart-home");
        assert_eq!(cfg.oauth.code_ttl_secs, 600);
        assert_eq!(cfg.oauth.access_ttl_secs, 3600);
        assert_eq!(cfg.oauth.refresh_ttl_secs, 2_592_000);
        assert!(!cfg.oauth.rotate_refresh_tokens);
        assert!(cfg.channel.push_on_connect);
        assert_eq!(cfg.devices.len(), 1);
        assert_eq!(cfg.devices[0].id, "relay_1");
        cfg.validate().unwrap();
    }

    #[test]
    fn debug_output_hides_secret() {
        let cfg = AppConfig::default();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains(DEFAULT_CLIENT_SECRET));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.oauth.access_ttl_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.channel.queue_capacity = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        let dup = cfg.devices[0].clone();
        cfg.devices.push(dup);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let cfg: AppConfig = serde_json::from_value(serde_json::json!({
            "oauth": { "client_secret": "other" }
        }))
        .unwrap();
        assert_eq!(cfg.oauth.client_secret, "other");
        assert_eq!(cfg.oauth.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.devices[0].id, "relay_1");
    }
}
