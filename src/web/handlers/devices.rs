use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};

use crate::{
    app::AppState,
    channel::{ChannelError, DeviceCommand},
    models::device::Capability,
    platform::{
        ActionCapabilityResult, ActionDevice, ActionDeviceResult, ActionErrorCode, ActionRequest,
        ActionResult, DevicesPayload, DeviceStateReport, DiscoveredDevice, DiscoveryPayload,
        Envelope, QueryRequest, RequestedCapability,
    },
    repos::RegistryError,
    web::{error::ApiError, session::BearerUser},
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// The platform's `X-Request-Id`, or a fresh id when it did not send one.
pub(crate) fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub async fn discovery(
    State(state): State<AppState>,
    BearerUser { user_id }: BearerUser,
    headers: HeaderMap,
) -> Json<Envelope<DiscoveryPayload>> {
    let devices = state.devices.list_for_owner(&user_id).await;
    tracing::info!(user_id = %user_id, count = devices.len(), "device discovery");

    Json(Envelope {
        request_id: request_id(&headers),
        payload: DiscoveryPayload {
            devices: devices.iter().map(DiscoveredDevice::from).collect(),
            user_id,
        },
    })
}

pub async fn query(
    State(state): State<AppState>,
    BearerUser { user_id }: BearerUser,
    headers: HeaderMap,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Envelope<DevicesPayload<DeviceStateReport>>>, ApiError> {
    let Json(req) = body?;
    let mut reports = Vec::with_capacity(req.devices.len());
    for device_ref in &req.devices {
        match state.devices.get(&user_id, &device_ref.id).await {
            Some(device) => reports.push(DeviceStateReport::from(&device)),
            None => tracing::debug!(user_id = %user_id, device_id = %device_ref.id, "query for unknown device omitted"),
        }
    }

    Ok(Json(Envelope {
        request_id: request_id(&headers),
        payload: DevicesPayload { devices: reports },
    }))
}

pub async fn action(
    State(state): State<AppState>,
    BearerUser { user_id }: BearerUser,
    headers: HeaderMap,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<Envelope<DevicesPayload<ActionDeviceResult>>>, ApiError> {
    let Json(req) = body?;
    let mut results = Vec::with_capacity(req.payload.devices.len());
    for requested in &req.payload.devices {
        results.push(apply_device_action(&state, &user_id, requested).await);
    }

    Ok(Json(Envelope {
        request_id: request_id(&headers),
        payload: DevicesPayload { devices: results },
    }))
}

async fn apply_device_action(state: &AppState, user_id: &str, requested: &ActionDevice) -> ActionDeviceResult {
    let known = state.devices.get(user_id, &requested.id).await.is_some();
    let mut capabilities = Vec::with_capacity(requested.capabilities.len());
    for cap in &requested.capabilities {
        let result = if known {
            apply_capability(state, user_id, &requested.id, cap).await
        } else {
            ActionResult::error(ActionErrorCode::DeviceNotFound)
        };
        capabilities.push(ActionCapabilityResult::for_request(cap, result));
    }
    ActionDeviceResult { id: requested.id.clone(), capabilities }
}

async fn apply_capability(
    state: &AppState,
    user_id: &str,
    device_id: &str,
    requested: &RequestedCapability,
) -> ActionResult {
    let Some(capability) = Capability::from_platform_type(&requested.capability_type) else {
        return ActionResult::error(ActionErrorCode::NotSupported);
    };
    let Some(value) = capability.parse_value(&requested.state.value) else {
        return ActionResult::error(ActionErrorCode::InvalidValue);
    };

    match state.devices.set_capability(user_id, device_id, capability, value).await {
        Ok(_) => {
            tracing::info!(user_id, device_id, ?capability, ?value, "device state changed");
            forward_command(state, user_id, device_id, DeviceCommand::for_capability(capability, value)).await;
            ActionResult::done()
        }
        Err(RegistryError::DeviceNotFound(_)) => ActionResult::error(ActionErrorCode::DeviceNotFound),
        Err(RegistryError::NotSupported { .. }) => ActionResult::error(ActionErrorCode::NotSupported),
    }
}

async fn forward_command(state: &AppState, user_id: &str, device_id: &str, command: DeviceCommand) {
    match state.channels.send(user_id, device_id, command).await {
        Ok(()) => tracing::info!(device_id, ?command, "command forwarded to device"),
        Err(ChannelError::NotConnected(_)) => {
            tracing::debug!(device_id, "device not connected; command not forwarded")
        }
        Err(e) => tracing::warn!(error = %e, device_id, "failed to forward command"),
    }
}
