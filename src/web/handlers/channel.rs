//! WebSocket endpoint devices connect to.
//!
//! A device may bind itself to an account with `?owner=<user_id>`; it then
//! only receives that account's commands.
//!
//! ```text
//! Device              Connection task              Action handler
//!   │                        │                           │
//!   ├─ Connect ─────────────>│ register(key)             │
//!   │<── {"action":"turn_on"}┤                           │
//!   ├─ status text ─────────>│ (logged)                  │
//!   │                        │<── DeviceCommand ─────────┤
//!   │<── {"action":...} ─────┤                           │
//!   ├─ Close ───────────────>│ unregister                │
//! ```

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;

use crate::{
    app::AppState,
    channel::{ChannelKey, ConnectionEvent, ConnectionState, DeviceCommand, Registration},
};

#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub owner: Option<String>,
}

pub async fn connect(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(q): Query<ConnectQuery>,
) -> Response {
    let key = match q.owner.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
        Some(owner) => ChannelKey::owned(owner, &device_id),
        None => ChannelKey::unbound(&device_id),
    };
    tracing::info!(%key, "device channel requested");
    ws.on_upgrade(move |socket| run_connection(socket, state, key))
}

async fn run_connection(socket: WebSocket, state: AppState, key: ChannelKey) {
    let device_id = key.device_id.clone();
    let Registration { connection_id, mut commands } = state.channels.register(key.clone()).await;
    let mut conn = ConnectionState::Connected;
    tracing::info!(%key, %connection_id, "device connected");

    let (mut sink, mut stream) = socket.split();

    if state.config.channel.push_on_connect {
        if let Err(e) = send_command(&mut sink, DeviceCommand::turn_on()).await {
            tracing::warn!(%device_id, error = %e, "failed to push initial command");
            conn = conn.on_event(ConnectionEvent::Closed);
        }
    }

    while conn != ConnectionState::Disconnected {
        let event = tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    tracing::info!(%device_id, message = %text.as_str(), "device message");
                    Some(ConnectionEvent::Inbound)
                }
                Some(Ok(Message::Binary(bytes))) => {
                    tracing::debug!(%device_id, len = bytes.len(), "binary device message ignored");
                    Some(ConnectionEvent::Inbound)
                }
                Some(Ok(Message::Close(_))) | None => Some(ConnectionEvent::Closed),
                // ping/pong are answered by the socket itself
                Some(Ok(_)) => None,
                Some(Err(e)) => {
                    tracing::warn!(%device_id, error = %e, "device socket error");
                    Some(ConnectionEvent::Closed)
                }
            },
            command = commands.recv() => match command {
                Some(command) => match send_command(&mut sink, command).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!(%device_id, error = %e, "failed to push command");
                        Some(ConnectionEvent::Closed)
                    }
                },
                // queue dropped: a newer connection took over this device id
                None => Some(ConnectionEvent::Closed),
            },
        };

        if let Some(event) = event {
            let next = conn.on_event(event);
            if next != conn {
                tracing::debug!(%device_id, from = ?conn, to = ?next, "device channel state");
            }
            conn = next;
        }
    }

    let _ = sink.close().await;
    state.channels.unregister(&key, connection_id).await;
    tracing::info!(%key, %connection_id, "device disconnected");
}

async fn send_command(
    sink: &mut SplitSink<WebSocket, Message>,
    command: DeviceCommand,
) -> anyhow::Result<()> {
    let payload = serde_json::to_string(&command)?;
    sink.send(Message::Text(payload.into())).await?;
    Ok(())
}
