use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    middleware::auth::decode_access_token,
    services::realtime::{CHAT_CHANNEL, PICKUP_CHANNEL},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct WsQueryParams {
    pub token: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQueryParams>,
) -> Response {
    let jwt_secret = state.config.jwt_secret.clone();
    let auth_user = decode_access_token(&params.token, &jwt_secret);

    ws.on_upgrade(move |socket| async move {
        match auth_user {
            Ok(user) => {
                info!("WebSocket connected: user={}", user.user_id);
                handle_socket(socket, state, user.user_id.to_string()).await;
            }
            Err(e) => {
                error!("WebSocket auth failed: {}", e);
            }
        }
    })
}

/// Forward chat and pickup feed events to the client. Events are broadcast
/// best-effort: subscribers tolerate duplicates because every payload carries
/// the entity id.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let mut pubsub = match state.redis_client.get_async_pubsub().await {
        Ok(c) => c,
        Err(e) => {
            error!("Redis pubsub error: {}", e);
            return;
        }
    };

    for channel in [CHAT_CHANNEL, PICKUP_CHANNEL] {
        if let Err(e) = pubsub.subscribe(channel).await {
            error!("Redis subscribe error on {channel}: {e}");
            return;
        }
    }

    // Redis Pub/Sub → WebSocket
    let mut redis_task = tokio::spawn(async move {
        let mut pubsub_stream = pubsub.on_message();
        while let Some(msg) = pubsub_stream.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(_) => continue,
            };
            if sender
                .send(Message::Text(payload.into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Drain the client side; the feeds are server-push only.
    let mut client_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    info!("WS message from {}: {}", user_id, text);
                }
                Message::Ping(_) => {}
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut redis_task) => client_task.abort(),
        _ = (&mut client_task) => redis_task.abort(),
    }

    info!("WebSocket disconnected");
}
