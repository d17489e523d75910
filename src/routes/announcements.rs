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
        announcement::{
            Announcement, CreateAnnouncementRequest, UpdateAnnouncementRequest, TARGET_AUDIENCES,
        },
        auth::AuthenticatedUser,
        user::Role,
    },
    services::audit,
    AppState,
};

/// Audience restriction for the caller's role, expressed as the SQL WHERE
/// clause itself. The restriction must live in the query so a teacher-only
/// row never leaves the database for a parent request.
pub fn visibility_clause(role: Role) -> &'static str {
    match role {
        Role::Parent => "WHERE target_audience IN ('all', 'parent')",
        _ => "",
    }
}

/// GET /announcements — pinned first, then newest first.
pub async fn list_announcements(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ViewAnnouncements)?;

    let announcements = sqlx::query_as::<_, Announcement>(&format!(
        "SELECT * FROM announcements {} ORDER BY is_pinned DESC, created_at DESC",
        visibility_clause(user.role)
    ))
    .fetch_all(&state.db)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(Json(serde_json::to_value(announcements).unwrap()))
}

/// POST /announcements — staff only.
pub async fn create_announcement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    user.require(Capability::ManageAnnouncements)?;

    let audience = body.target_audience.as_deref().unwrap_or("all");
    if !TARGET_AUDIENCES.contains(&audience) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid target audience: {audience}") })),
        ));
    }
    if body.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Title is required" })),
        ));
    }

    let announcement = sqlx::query_as::<_, Announcement>(
        "INSERT INTO announcements (title, content, target_audience, is_pinned, author_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(body.title.trim())
    .bind(&body.content)
    .bind(audience)
    .bind(body.is_pinned)
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(announcement).unwrap()),
    ))
}

/// PUT /announcements/{id}
pub async fn update_announcement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAnnouncementRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ManageAnnouncements)?;

    if let Some(audience) = &body.target_audience {
        if !TARGET_AUDIENCES.contains(&audience.as_str()) {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid target audience: {audience}") })),
            ));
        }
    }

    let announcement = sqlx::query_as::<_, Announcement>(
        "UPDATE announcements SET
             title           = COALESCE($2, title),
             content         = COALESCE($3, content),
             target_audience = COALESCE($4, target_audience),
             is_pinned       = COALESCE($5, is_pinned),
             updated_at      = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&body.title)
    .bind(&body.content)
    .bind(&body.target_audience)
    .bind(body.is_pinned)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?
    .ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Announcement not found" })),
    ))?;

    Ok(Json(serde_json::to_value(announcement).unwrap()))
}

/// DELETE /announcements/{id}
pub async fn delete_announcement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ManageAnnouncements)?;

    let title: Option<String> =
        sqlx::query_scalar("DELETE FROM announcements WHERE id = $1 RETURNING title")
            .bind(id)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
            })?;

    let title = title.ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Announcement not found" })),
    ))?;

    audit::record(
        state.db.clone(),
        user.user_id,
        "DELETE_ANNOUNCEMENT",
        format!("title={title}"),
    );

    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_queries_exclude_teacher_rows_in_sql() {
        let clause = visibility_clause(Role::Parent);
        assert!(clause.contains("'all'") && clause.contains("'parent'"));
        assert!(!clause.contains("'teacher'"));
    }

    #[test]
    fn staff_queries_are_unrestricted() {
        assert_eq!(visibility_clause(Role::Teacher), "");
        assert_eq!(visibility_clause(Role::Manager), "");
        assert_eq!(visibility_clause(Role::Director), "");
    }
}
