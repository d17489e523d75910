use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::authz::Capability,
    models::{
        auth::AuthenticatedUser,
        contact_book::{BulkApplyRequest, ContactBookDateQuery, SaveContactBookRequest},
    },
    services::{
        contact_book::{ContactBookService, SignOutcome},
        photos::PhotoService,
        students::StudentService,
    },
    AppState,
};

/// GET /contact-book?date=YYYY-MM-DD — one form-state record per visible
/// student; unset days come back with the defaults.
pub async fn load_for_date(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ContactBookDateQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ViewContactBook)?;
    ContactBookService::load_for_date(&state.db, &user, params.date)
        .await
        .map(|states| Json(serde_json::to_value(states).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// PUT /contact-book — staff upsert for one (student, date).
pub async fn save_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<SaveContactBookRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::WriteContactBook)?;
    ContactBookService::save(&state.db, &user, &body)
        .await
        .map(|entry| Json(serde_json::to_value(entry).unwrap()))
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /contact-book/{student_id}/sign?date= — parent signature, one-shot.
pub async fn sign_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
    Query(params): Query<ContactBookDateQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::SignContactBook)?;

    // Parents may only sign for their own children.
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

    match ContactBookService::sign(&state.db, &user, student_id, params.date)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })? {
        SignOutcome::Signed(entry) => Ok(Json(serde_json::to_value(entry).unwrap())),
        SignOutcome::AlreadySigned => Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "Entry is already signed" })),
        )),
        SignOutcome::NotFound => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No contact book entry for that date" })),
        )),
    }
}

/// POST /contact-book/bulk-apply — class-wide homework/announcement write.
pub async fn bulk_apply(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<BulkApplyRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::WriteContactBook)?;
    ContactBookService::bulk_apply(&state.db, &user, &body)
        .await
        .map(|count| Json(json!({ "students_updated": count })))
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /contact-book/{student_id}/photos?date= — multipart image batch,
/// all-or-nothing.
pub async fn upload_photos(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
    Query(params): Query<ContactBookDateQuery>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    user.require(Capability::WriteContactBook)?;
    PhotoService::upload_contact_book_photos(
        &state.db,
        &state.config.media_dir,
        student_id,
        params.date,
        user.user_id,
        multipart,
    )
    .await
    .map(|entry| (StatusCode::CREATED, Json(serde_json::to_value(entry).unwrap())))
    .map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
    })
}
