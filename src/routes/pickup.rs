use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::authz::Capability,
    models::{
        auth::AuthenticatedUser,
        pickup::{AdvanceRequest, EnqueueRequest},
    },
    services::{
        pickup::{AdvanceOutcome, PickupService},
        realtime::{self, FeedEvent, PICKUP_CHANNEL},
    },
    AppState,
};

/// GET /pickup — board partitioned into pending and arrived.
pub async fn board(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ViewPickup)?;
    PickupService::board(&state.db)
        .await
        .map(|b| Json(serde_json::to_value(b).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /pickup — enqueue by student name; creates the student if new.
pub async fn enqueue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    user.require(Capability::ManagePickup)?;

    let entry = PickupService::enqueue(&state.db, &body.student_name)
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    let mut redis = state.redis.clone();
    realtime::publish(
        &mut redis,
        PICKUP_CHANNEL,
        &FeedEvent {
            kind: "pickup_enqueued",
            entity_id: entry.id,
            payload: &entry,
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(serde_json::to_value(entry).unwrap())))
}

/// POST /pickup/{id}/advance — next status must be the legal successor.
pub async fn advance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(entry_id): Path<Uuid>,
    Json(body): Json<AdvanceRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ManagePickup)?;

    match PickupService::advance(&state.db, entry_id, &body.next_status)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })? {
        AdvanceOutcome::Advanced(entry) => {
            let mut redis = state.redis.clone();
            realtime::publish(
                &mut redis,
                PICKUP_CHANNEL,
                &FeedEvent {
                    kind: "pickup_advanced",
                    entity_id: entry.id,
                    payload: &entry,
                },
            )
            .await;
            Ok(Json(serde_json::to_value(entry).unwrap()))
        }
        AdvanceOutcome::Illegal(e) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string() })),
        )),
        AdvanceOutcome::NotFound => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Queue entry not found" })),
        )),
    }
}
