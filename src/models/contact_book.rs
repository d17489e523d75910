use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One day's contact-book entry for a student, unique per (student, date).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactBookEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub mood: i16,
    pub focus: i16,
    pub appetite: i16,
    pub homework: String,
    pub note: String,
    pub photo_urls: Vec<String>,
    pub is_absent: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-student form state returned by the day view. For students with no
/// stored entry the fields carry the documented defaults and `entry_id` is
/// None.
#[derive(Debug, Clone, Serialize)]
pub struct ContactBookFormState {
    pub entry_id: Option<Uuid>,
    pub student_id: Uuid,
    pub student_name: String,
    pub date: NaiveDate,
    pub mood: i16,
    pub focus: i16,
    pub appetite: i16,
    pub homework: String,
    pub note: String,
    pub photo_urls: Vec<String>,
    pub is_absent: bool,
    pub signed_at: Option<DateTime<Utc>>,
}

impl ContactBookFormState {
    /// Defaults for a (student, date) with no stored entry:
    /// ratings 3/3/3, empty text, no photos, not absent, unsigned.
    pub fn blank(student_id: Uuid, student_name: String, date: NaiveDate) -> Self {
        Self {
            entry_id: None,
            student_id,
            student_name,
            date,
            mood: 3,
            focus: 3,
            appetite: 3,
            homework: String::new(),
            note: String::new(),
            photo_urls: Vec::new(),
            is_absent: false,
            signed_at: None,
        }
    }

    pub fn from_entry(entry: ContactBookEntry, student_name: String) -> Self {
        Self {
            entry_id: Some(entry.id),
            student_id: entry.student_id,
            student_name,
            date: entry.date,
            mood: entry.mood,
            focus: entry.focus,
            appetite: entry.appetite,
            homework: entry.homework,
            note: entry.note,
            photo_urls: entry.photo_urls,
            is_absent: entry.is_absent,
            signed_at: entry.signed_at,
        }
    }
}

/// Body for PUT /contact-book (create or update a single day).
#[derive(Debug, Deserialize)]
pub struct SaveContactBookRequest {
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub mood: i16,
    pub focus: i16,
    pub appetite: i16,
    #[serde(default)]
    pub homework: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub is_absent: bool,
}

/// Body for POST /contact-book/bulk-apply.
#[derive(Debug, Deserialize)]
pub struct BulkApplyRequest {
    pub class_label: String,
    pub date: NaiveDate,
    pub homework: Option<String>,
    pub announcement: Option<String>,
}

/// Query params for the day view and the sign/photo endpoints.
#[derive(Debug, Deserialize)]
pub struct ContactBookDateQuery {
    pub date: NaiveDate,
}
