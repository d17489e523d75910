use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradeRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub exam_name: String,
    pub subject: String,
    pub score: f64,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGradeRequest {
    pub student_id: Uuid,
    pub exam_name: String,
    pub subject: String,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct GradeListQuery {
    pub student_id: Option<Uuid>,
}
