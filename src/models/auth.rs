use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub role: Role,
    pub super_admin: bool,
    pub exp: usize,
    pub iat: usize,
}

/// Claims embedded in the JWT refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String, // user UUID
    pub jti: String, // refresh token UUID (to enable revocation)
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT — available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
    pub is_super_admin: bool,
}
