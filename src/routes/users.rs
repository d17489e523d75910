use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::authz::Capability,
    models::{
        auth::AuthenticatedUser,
        user::{SetRoleRequest, User, UserProfile},
    },
    services::audit,
    workflow::role_change_allowed,
    AppState,
};

const USER_COLS: &str =
    "id, email, password_hash, display_name, role, is_super_admin,
     department, responsible_classes, is_active, created_at, updated_at";

#[derive(Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

/// GET /users?role= — staff/parent directory at manager and up. The pending
/// listing is the onboarding queue and stays director-only.
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<UserListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if params.role.as_deref() == Some("pending") {
        user.require(Capability::ManageStaff)?;
    } else {
        user.require(Capability::ViewStaffDirectory)?;
    }

    let users = if let Some(role) = &params.role {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users
             WHERE is_active = TRUE AND role = $1
             ORDER BY created_at DESC"
        ))
        .bind(role)
        .fetch_all(&state.db)
        .await
    } else {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE is_active = TRUE
             ORDER BY role, display_name"
        ))
        .fetch_all(&state.db)
        .await
    }
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let profiles: Vec<UserProfile> = users.into_iter().map(Into::into).collect();
    Ok(Json(serde_json::to_value(profiles).unwrap()))
}

/// PUT /users/{id}/role — director promotes a pending user, or adjusts a
/// staff member's department and class assignments.
pub async fn set_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(target_id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ManageStaff)?;

    let current_role: Option<String> =
        sqlx::query_scalar("SELECT role FROM users WHERE id = $1 AND is_active = TRUE")
            .bind(target_id)
            .fetch_optional(&state.db)
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
            })?;
    let current_role = current_role.ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "User not found" })),
    ))?;

    let target_role = body.role.to_string();
    // Every role write goes through the transition table; in particular there
    // is no path back to pending for anyone.
    if !role_change_allowed(&current_role, &target_role) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": format!("Cannot change role from '{current_role}' to '{target_role}'")
            })),
        ));
    }

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
             role                = $2,
             department          = COALESCE($3, department),
             responsible_classes = COALESCE($4, responsible_classes),
             updated_at          = NOW()
         WHERE id = $1
         RETURNING {USER_COLS}"
    ))
    .bind(target_id)
    .bind(&target_role)
    .bind(&body.department)
    .bind(&body.responsible_classes)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    audit::record(
        state.db.clone(),
        user.user_id,
        "PROMOTE_USER",
        format!("user={} {} -> {}", updated.email, current_role, target_role),
    );

    let profile: UserProfile = updated.into();
    Ok(Json(serde_json::to_value(profile).unwrap()))
}

/// DELETE /users/{id} — deactivation, the removal path for onboarding and
/// staff alike.
pub async fn deactivate_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(target_id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ManageStaff)?;

    if target_id == user.user_id {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Cannot remove your own account" })),
        ));
    }

    let email: Option<String> = sqlx::query_scalar(
        "UPDATE users SET is_active = FALSE, updated_at = NOW()
         WHERE id = $1 AND is_active = TRUE
         RETURNING email",
    )
    .bind(target_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let email = email.ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "User not found" })),
    ))?;

    audit::record(
        state.db.clone(),
        user.user_id,
        "REMOVE_USER",
        format!("user={email}"),
    );

    Ok(Json(json!({ "ok": true })))
}
