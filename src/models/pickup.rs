use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PickupQueueEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Queue entry joined with the student name for display.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PickupQueueItem {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read model: entries partitioned by status. Completed entries are retired
/// from this view.
#[derive(Debug, Serialize)]
pub struct PickupBoard {
    pub pending: Vec<PickupQueueItem>,
    pub arrived: Vec<PickupQueueItem>,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub student_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub next_status: String,
}
