use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{models::auth::AuthenticatedUser, AppState};

#[derive(Deserialize)]
pub struct AuditQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub action: Option<String>,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// GET /audit-log — gated on the super-admin flag, not the role.
pub async fn list_audit_log(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require_super_admin()?;

    let limit = params.limit.unwrap_or(50).min(200);
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;

    let entries: Vec<AuditLogRow> = if let Some(action_filter) = &params.action {
        sqlx::query_as(
            "SELECT id, user_id, user_name, action, details, created_at
             FROM audit_log
             WHERE action LIKE $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(format!("{action_filter}%"))
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await
    } else {
        sqlx::query_as(
            "SELECT id, user_id, user_name, action, details, created_at
             FROM audit_log
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await
    }
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(Json(json!({ "page": page, "entries": entries })))
}
