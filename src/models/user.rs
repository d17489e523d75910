use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Pending,
    Parent,
    Teacher,
    Manager,
    Director,
}

impl Role {
    /// Any role that is not a parent and not stuck in onboarding.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Teacher | Role::Manager | Role::Director)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Pending => "pending",
            Role::Parent => "parent",
            Role::Teacher => "teacher",
            Role::Manager => "manager",
            Role::Director => "director",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Role::Pending),
            "parent" => Ok(Role::Parent),
            "teacher" => Ok(Role::Teacher),
            "manager" => Ok(Role::Manager),
            "director" => Ok(Role::Director),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// DB row struct — role is stored as TEXT and parsed at the edges.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub role: String,
    pub is_super_admin: bool,
    pub department: Option<String>,
    pub responsible_classes: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub is_super_admin: bool,
    pub department: Option<String>,
    pub responsible_classes: Vec<String>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            role: u.role.parse().unwrap_or(Role::Pending),
            is_super_admin: u.is_super_admin,
            department: u.department,
            responsible_classes: u.responsible_classes,
        }
    }
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
    pub department: Option<String>,
    pub responsible_classes: Option<Vec<String>>,
}
