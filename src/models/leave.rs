use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Valid values for leave_type.
pub const LEAVE_TYPES: &[&str] = &["sick", "personal", "official", "other"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub leave_type: String,
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub created_by: Uuid,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeaveRequest {
    pub student_id: Uuid,
    pub leave_type: String,
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DecideLeaveRequest {
    /// "approve" or "reject"
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaveCalendarQuery {
    pub date: NaiveDate,
}

/// One student on leave on a given calendar day.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeaveCalendarItem {
    pub student_id: Uuid,
    pub student_name: String,
    pub leave_type: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
