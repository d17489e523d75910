use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    models::{
        auth::AuthenticatedUser,
        user::{
            ChangePasswordRequest, LoginRequest, RefreshTokenRequest, SignupRequest, UserProfile,
        },
    },
    services::auth::AuthService,
    AppState,
};

/// POST /auth/signup — open endpoint; new accounts start as `pending`.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    AuthService::signup(&state.db, &body.email, &body.password, &body.display_name)
        .await
        .map(|user| {
            let profile: UserProfile = user.into();
            (StatusCode::CREATED, Json(serde_json::to_value(profile).unwrap()))
        })
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    AuthService::login(
        &state.db,
        &body.email,
        &body.password,
        &state.config.jwt_secret,
        &state.config.jwt_refresh_secret,
        state.config.jwt_expiry_seconds,
        state.config.jwt_refresh_expiry_days,
    )
    .await
    .map(|resp| Json(serde_json::to_value(resp).unwrap()))
    .map_err(|e| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": e.to_string() })),
        )
    })
}

/// POST /auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    AuthService::refresh(
        &state.db,
        &body.refresh_token,
        &state.config.jwt_secret,
        &state.config.jwt_refresh_secret,
        state.config.jwt_expiry_seconds,
    )
    .await
    .map(|token| Json(json!({ "access_token": token })))
    .map_err(|e| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": e.to_string() })),
        )
    })
}

/// POST /auth/logout — revokes all of the caller's refresh tokens.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    AuthService::logout(&state.db, user.user_id)
        .await
        .map(|_| Json(json!({ "ok": true })))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// GET /auth/me — works for every role, pending included, so an onboarding
/// user can see their own status.
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    AuthService::get_profile(&state.db, user.user_id)
        .await
        .map(|u| {
            let profile: UserProfile = u.into();
            Json(serde_json::to_value(profile).unwrap())
        })
        .map_err(|e| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    AuthService::change_password(
        &state.db,
        user.user_id,
        &body.current_password,
        &body.new_password,
    )
    .await
    .map(|_| Json(json!({ "ok": true })))
    .map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
    })
}
