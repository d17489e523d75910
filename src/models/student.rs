use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub class_label: String,
    pub primary_parent_id: Option<Uuid>,
    pub secondary_parent_id: Option<Uuid>,
    /// Unclaimed parent email — linked automatically when that parent signs up.
    pub parent_email: Option<String>,
    pub health_notes: Option<String>,
    pub emergency_contact: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
    pub class_label: Option<String>,
    pub primary_parent_id: Option<Uuid>,
    pub secondary_parent_id: Option<Uuid>,
    pub parent_email: Option<String>,
    pub health_notes: Option<String>,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub class_label: Option<String>,
    pub primary_parent_id: Option<Uuid>,
    pub secondary_parent_id: Option<Uuid>,
    pub parent_email: Option<String>,
    pub health_notes: Option<String>,
    pub emergency_contact: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: Option<bool>,
}
