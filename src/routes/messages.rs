use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    middleware::authz::Capability,
    models::{
        auth::AuthenticatedUser,
        message::{Message, MessageListQuery, SendMessageRequest},
    },
    services::realtime::{self, FeedEvent, CHAT_CHANNEL},
    AppState,
};

/// GET /messages?limit=&before= — newest first, cursor pagination.
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<MessageListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::SendMessages)?;
    let limit = params.limit.unwrap_or(50).clamp(1, 200);

    let messages = if let Some(before) = params.before {
        sqlx::query_as::<_, Message>(
            "SELECT id, sender_id, sender_name, content, created_at
             FROM messages WHERE created_at < $1
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(before)
        .bind(limit)
        .fetch_all(&state.db)
        .await
    } else {
        sqlx::query_as::<_, Message>(
            "SELECT id, sender_id, sender_name, content, created_at
             FROM messages ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&state.db)
        .await
    }
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(Json(serde_json::to_value(messages).unwrap()))
}

/// POST /messages — append-only; the sender name is denormalized at write
/// time and the stored row is pushed to WebSocket subscribers.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    user.require(Capability::SendMessages)?;

    if body.content.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Message content is required" })),
        ));
    }

    let sender_name: Option<String> =
        sqlx::query_scalar("SELECT display_name FROM users WHERE id = $1")
            .bind(user.user_id)
            .fetch_optional(&state.db)
            .await
            .unwrap_or(None);

    let message = sqlx::query_as::<_, Message>(
        "INSERT INTO messages (sender_id, sender_name, content)
         VALUES ($1, $2, $3)
         RETURNING id, sender_id, sender_name, content, created_at",
    )
    .bind(user.user_id)
    .bind(sender_name.unwrap_or_else(|| "Unknown".to_string()))
    .bind(body.content.trim())
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let mut redis = state.redis.clone();
    realtime::publish(
        &mut redis,
        CHAT_CHANNEL,
        &FeedEvent {
            kind: "chat_message",
            entity_id: message.id,
            payload: &message,
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(message).unwrap()),
    ))
}
