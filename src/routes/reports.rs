use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    middleware::authz::Capability,
    models::auth::AuthenticatedUser,
    services::kpi::KpiService,
    AppState,
};

#[derive(Deserialize)]
pub struct KpiQuery {
    pub department: Option<String>,
}

/// GET /reports/kpi?department= — per-teacher student counts, average scores
/// and approved-leave counts, sorted by average score.
pub async fn kpi_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<KpiQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    user.require(Capability::ViewReports)?;
    KpiService::report(&state.db, &user, params.department)
        .await
        .map(|report| Json(serde_json::to_value(report).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
