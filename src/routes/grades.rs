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
        grade::{CreateGradeRequest, GradeListQuery, GradeRecord},
        user::Role,
    },
    services::{audit, students::StudentService},
    AppState,
};

/// GET /grades?student_id= — parents only for their own children.
pub async fn list_grades(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<GradeListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ViewGrades)?;

    if user.role == Role::Parent {
        let student_id = params.student_id.ok_or((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "student_id is required" })),
        ))?;
        let linked = StudentService::is_parent_of(&state.db, student_id, user.user_id)
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
    }

    let grades = if let Some(student_id) = params.student_id {
        sqlx::query_as::<_, GradeRecord>(
            "SELECT * FROM grade_records WHERE student_id = $1 ORDER BY created_at DESC",
        )
        .bind(student_id)
        .fetch_all(&state.db)
        .await
    } else {
        sqlx::query_as::<_, GradeRecord>(
            "SELECT * FROM grade_records ORDER BY created_at DESC",
        )
        .fetch_all(&state.db)
        .await
    }
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(Json(serde_json::to_value(grades).unwrap()))
}

/// POST /grades — staff only, score must be within 0..=100.
pub async fn create_grade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateGradeRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    user.require(Capability::RecordGrades)?;

    if !(0.0..=100.0).contains(&body.score) || !body.score.is_finite() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Score must be between 0 and 100" })),
        ));
    }
    if body.exam_name.trim().is_empty() || body.subject.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Exam name and subject are required" })),
        ));
    }

    let grade = sqlx::query_as::<_, GradeRecord>(
        "INSERT INTO grade_records (student_id, exam_name, subject, score, recorded_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(body.student_id)
    .bind(body.exam_name.trim())
    .bind(body.subject.trim())
    .bind(body.score)
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::to_value(grade).unwrap())))
}

/// DELETE /grades/{id} — staff only; the record is append-only otherwise.
pub async fn delete_grade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(grade_id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::RecordGrades)?;

    let exam: Option<String> =
        sqlx::query_scalar("DELETE FROM grade_records WHERE id = $1 RETURNING exam_name")
            .bind(grade_id)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
            })?;

    let exam = exam.ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Grade record not found" })),
    ))?;

    audit::record(
        state.db.clone(),
        user.user_id,
        "DELETE_GRADE",
        format!("exam={exam} id={grade_id}"),
    );

    Ok(Json(json!({ "ok": true })))
}
