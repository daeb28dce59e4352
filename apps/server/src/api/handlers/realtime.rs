//! WebSocket change feed.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::extractors::ValidatedQuery;
use crate::{auth::Principal, state::AppState, Error, Result};

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Access token. Browsers cannot set headers on a WebSocket handshake.
    pub token: Option<String>,
}

/// Authenticates the `token` query parameter, then upgrades. Invalid tokens
/// are rejected with a 401 before any upgrade happens.
pub async fn subscribe(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<WsQuery>,
    upgrade: Option<WebSocketUpgrade>,
) -> Result<Response> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Unauthorized("Missing token".to_string()))?;
    let principal = state.auth_service.authenticate(token).await?;

    if !state.realtime.is_enabled() {
        return Err(Error::NotFound(
            "The real-time channel is disabled".to_string(),
        ));
    }
    let upgrade =
        upgrade.ok_or_else(|| Error::BadRequest("WebSocket upgrade required".to_string()))?;

    Ok(upgrade
        .on_upgrade(move |socket| stream_events(state, principal, socket))
        .into_response())
}

async fn stream_events(state: AppState, principal: Principal, mut socket: WebSocket) {
    let (mut events, _connection) = state.realtime.subscribe();
    tracing::info!(
        user_id = %principal.user_id,
        connections = state.realtime.connection_count(),
        "Realtime client connected"
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode realtime event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        user_id = %principal.user_id,
                        skipped,
                        "Realtime client lagging; events dropped"
                    );
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                // Clients have nothing to say on this channel.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Realtime socket error");
                    break;
                }
            },
        }
    }

    tracing::info!(user_id = %principal.user_id, "Realtime client disconnected");
}
