use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::channel::DeviceChannels;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::repos::{
    memory::{MemoryDeviceRegistry, MemoryTokenStore, TokenPolicy},
    DeviceRegistry, TokenStore,
};
use crate::web::handlers::{account, channel, devices, health, oauth};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tokens: Arc<dyn TokenStore>,
    pub devices: Arc<dyn DeviceRegistry>,
    pub channels: DeviceChannels,
}

impl AppState {
    /// State backed by the in-memory stores and the system clock.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let tokens: Arc<dyn TokenStore> = MemoryTokenStore::new(TokenPolicy::from(&config.oauth), clock);
        let devices: Arc<dyn DeviceRegistry> = MemoryDeviceRegistry::new(config.devices.clone());
        let channels = DeviceChannels::new(config.channel.queue_capacity);
        Self { config, tokens, devices, channels }
    }
}

pub async fn run() -> anyhow::Result<()> {
    // logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    let config = AppConfig::load()?;
    tracing::info!(?config, "loaded config");

    let state = AppState::in_memory(config.clone());
    let app = build_router(state);

    let addr = config.server.bind_addr.clone();
    tracing::info!(%addr, public_url = %config.server.public_url, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1.0", get(health::status))
        .route("/v1.0/health", get(health::status))
        .route("/authorize", get(oauth::authorize))
        .route("/token", post(oauth::token))
        .route("/token/refresh", post(oauth::token_refresh))
        .route("/user/info", get(account::user_info))
        .route("/v1.0/user/devices", get(devices::discovery).post(devices::discovery))
        .route("/v1.0/user/devices/query", post(devices::query))
        .route("/v1.0/user/devices/action", post(devices::action))
        .route("/v1.0/user/unlink", post(account::unlink))
        .route("/ws/{device_id}/connect", get(channel::connect))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
