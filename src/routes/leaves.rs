use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::authz::Capability,
    models::{
        auth::AuthenticatedUser,
        leave::{CreateLeaveRequest, DecideLeaveRequest, LeaveCalendarQuery},
    },
    services::{
        leave::{DecideOutcome, LeaveService},
        students::StudentService,
    },
    AppState,
};

/// POST /leaves — parent submits for their own child.
pub async fn create_leave(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateLeaveRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    user.require(Capability::RequestLeave)?;

    let linked = StudentService::is_parent_of(&state.db, body.student_id, user.user_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;
    if !linked {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Access denied" })),
        ));
    }

    LeaveService::create(&state.db, &user, &body)
        .await
        .map(|leave| (StatusCode::CREATED, Json(serde_json::to_value(leave).unwrap())))
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// GET /leaves — parents see their own children's requests, staff see all.
pub async fn list_leaves(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ViewLeaves)?;
    LeaveService::list(&state.db, &user)
        .await
        .map(|leaves| Json(serde_json::to_value(leaves).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /leaves/{id}/decide — staff approves or rejects a pending request.
pub async fn decide_leave(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(leave_id): Path<Uuid>,
    Json(body): Json<DecideLeaveRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::DecideLeave)?;

    let approve = match body.action.as_str() {
        "approve" => true,
        "reject" => false,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Unknown action: {other}") })),
            ))
        }
    };

    match LeaveService::decide(&state.db, &user, leave_id, approve)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })? {
        DecideOutcome::Decided(leave) => Ok(Json(serde_json::to_value(leave).unwrap())),
        DecideOutcome::IllegalTransition { from } => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": format!("Request already decided (status: {from})") })),
        )),
        DecideOutcome::NotFound => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Leave request not found" })),
        )),
    }
}

/// GET /leaves/calendar?date= — decided requests covering the day.
pub async fn leave_calendar(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<LeaveCalendarQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ViewLeaves)?;
    LeaveService::calendar(&state.db, params.date)
        .await
        .map(|items| Json(serde_json::to_value(items).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
