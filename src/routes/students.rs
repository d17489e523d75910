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
        student::{CreateStudentRequest, UpdateStudentRequest},
    },
    services::students::StudentService,
    AppState,
};

/// GET /students — parents get only their own children; staff get all.
pub async fn list_students(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ViewContactBook)?;
    StudentService::list(&state.db, &user)
        .await
        .map(|students| Json(serde_json::to_value(students).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /students — staff only.
pub async fn create_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    user.require(Capability::ManageStudents)?;
    StudentService::create(&state.db, &body)
        .await
        .map(|s| (StatusCode::CREATED, Json(serde_json::to_value(s).unwrap())))
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// PUT /students/{id}
pub async fn update_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
    Json(body): Json<UpdateStudentRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ManageStudents)?;
    StudentService::update(&state.db, student_id, &body)
        .await
        .map(|s| Json(serde_json::to_value(s).unwrap()))
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// DELETE /students/{id} — explicit staff removal (deactivation).
pub async fn remove_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ManageStudents)?;
    StudentService::remove(&state.db, student_id)
        .await
        .map(|_| Json(json!({ "ok": true })))
        .map_err(|e| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
