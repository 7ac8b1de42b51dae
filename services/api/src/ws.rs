//! WebSocket endpoint driving the parking timers

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::{
    error::ApiError,
    middleware::resolve_token,
    models::AuthUser,
    state::AppState,
    timer::{
        ClientCommand, Connected, ConnectionId, ServerEvent, TimerErrorEvent, TimerService,
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Authenticate, then upgrade to a WebSocket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Response, ApiError> {
    let token = handshake_token(params, bearer)?;
    let user = resolve_token(&state, &token).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

/// Token from `?token=`, falling back to `Authorization: Bearer`
fn handshake_token(
    params: WsParams,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<String, ApiError> {
    params
        .token
        .filter(|token| !token.trim().is_empty())
        .or_else(|| bearer.map(|TypedHeader(Authorization(b))| b.token().to_string()))
        .ok_or_else(|| ApiError::Unauthorized("Missing authentication token".to_string()))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let (connection_id, mut outbound) = state.hub.register(user.id).await;
    info!(
        "WebSocket {} opened for user {} (api key: {:?}, {} open)",
        connection_id,
        user.id,
        user.api_key_id,
        state.hub.connection_count(user.id).await
    );

    let (mut sink, mut stream) = socket.split();

    state
        .hub
        .emit_to_connection(
            user.id,
            connection_id,
            ServerEvent::Connected(Connected::new(user.id, connection_id)),
        )
        .await;

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let owner = user.id;
    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("WebSocket {} read error: {}", connection_id, e);
                    break;
                }
            };

            let reply = handle_frame(&recv_state.timers, owner, connection_id, &text).await;
            recv_state
                .hub
                .emit_to_connection(owner, connection_id, reply)
                .await;
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Armed timers outlive the connection
    state.hub.unregister(user.id, connection_id).await;
    info!("WebSocket {} closed for user {}", connection_id, user.id);
}

/// Execute one inbound frame and build the reply for the sending connection
pub async fn handle_frame(
    timers: &TimerService,
    owner: i32,
    connection_id: ConnectionId,
    text: &str,
) -> ServerEvent {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            warn!("Unparseable frame on {}: {}", connection_id, e);
            return ServerEvent::TimerError(TimerErrorEvent::new("Invalid message", None));
        }
    };

    match command {
        ClientCommand::StartParkingTimer {
            parking_id,
            duration,
        } => match timers
            .start(owner, parking_id, duration, Some(connection_id))
            .await
        {
            Ok(started) => ServerEvent::TimerStarted(started),
            Err(e) => ServerEvent::TimerError(TimerErrorEvent::new(e.to_string(), Some(parking_id))),
        },
        ClientCommand::CancelParkingTimer => match timers.cancel(owner).await {
            Ok(cancelled) => ServerEvent::TimerCancelled(cancelled),
            Err(e) => ServerEvent::TimerError(TimerErrorEvent::new(e.to_string(), None)),
        },
        ClientCommand::GetTimerStatus => ServerEvent::TimerStatus(timers.status(owner).await),
    }
}
