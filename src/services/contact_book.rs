use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    auth::AuthenticatedUser,
    contact_book::{
        BulkApplyRequest, ContactBookEntry, ContactBookFormState, SaveContactBookRequest,
    },
    user::Role,
};
use crate::services::audit;

const ENTRY_COLS: &str =
    "id, student_id, date, mood, focus, appetite, homework, note, photo_urls,
     is_absent, signed_at, signed_by, created_by, created_at, updated_at";

pub enum SignOutcome {
    Signed(ContactBookEntry),
    AlreadySigned,
    NotFound,
}

pub struct ContactBookService;

impl ContactBookService {
    /// One form-state record per student the caller may see on that date.
    /// Students with no stored entry get the documented defaults.
    pub async fn load_for_date(
        pool: &PgPool,
        user: &AuthenticatedUser,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<ContactBookFormState>> {
        let targets: Vec<(Uuid, String)> = match user.role {
            Role::Parent => {
                sqlx::query_as(
                    "SELECT id, name FROM students
                     WHERE is_active = TRUE
                       AND (primary_parent_id = $1 OR secondary_parent_id = $1)
                     ORDER BY name",
                )
                .bind(user.user_id)
                .fetch_all(pool)
                .await?
            }
            Role::Teacher => {
                // Same containment rule as the KPI join: a student belongs to
                // the teacher when the class label contains one of the
                // teacher's class tags.
                sqlx::query_as(
                    "SELECT s.id, s.name FROM students s
                     WHERE s.is_active = TRUE
                       AND EXISTS (
                           SELECT 1 FROM users u, unnest(u.responsible_classes) tag
                           WHERE u.id = $1 AND position(tag IN s.class_label) > 0
                       )
                     ORDER BY s.name",
                )
                .bind(user.user_id)
                .fetch_all(pool)
                .await?
            }
            _ => {
                sqlx::query_as(
                    "SELECT id, name FROM students WHERE is_active = TRUE ORDER BY name",
                )
                .fetch_all(pool)
                .await?
            }
        };

        let student_ids: Vec<Uuid> = targets.iter().map(|(id, _)| *id).collect();
        let entries = sqlx::query_as::<_, ContactBookEntry>(&format!(
            "SELECT {ENTRY_COLS} FROM contact_book_entries
             WHERE date = $1 AND student_id = ANY($2)"
        ))
        .bind(date)
        .bind(&student_ids)
        .fetch_all(pool)
        .await?;

        let mut by_student: std::collections::HashMap<Uuid, ContactBookEntry> =
            entries.into_iter().map(|e| (e.student_id, e)).collect();

        Ok(targets
            .into_iter()
            .map(|(id, name)| match by_student.remove(&id) {
                Some(entry) => ContactBookFormState::from_entry(entry, name),
                None => ContactBookFormState::blank(id, name, date),
            })
            .collect())
    }

    /// Upsert one row keyed by (student, date). An audit entry is written only
    /// when an existing row was updated, not on first create.
    pub async fn save(
        pool: &PgPool,
        user: &AuthenticatedUser,
        req: &SaveContactBookRequest,
    ) -> anyhow::Result<ContactBookEntry> {
        for (label, v) in [("mood", req.mood), ("focus", req.focus), ("appetite", req.appetite)] {
            anyhow::ensure!((1..=5).contains(&v), "{label} must be between 1 and 5");
        }

        let existed: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM contact_book_entries WHERE student_id = $1 AND date = $2",
        )
        .bind(req.student_id)
        .bind(req.date)
        .fetch_optional(pool)
        .await?;

        let entry = sqlx::query_as::<_, ContactBookEntry>(&format!(
            "INSERT INTO contact_book_entries
                 (student_id, date, mood, focus, appetite, homework, note, is_absent, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (student_id, date) DO UPDATE SET
                 mood       = EXCLUDED.mood,
                 focus      = EXCLUDED.focus,
                 appetite   = EXCLUDED.appetite,
                 homework   = EXCLUDED.homework,
                 note       = EXCLUDED.note,
                 is_absent  = EXCLUDED.is_absent,
                 updated_at = NOW()
             RETURNING {ENTRY_COLS}"
        ))
        .bind(req.student_id)
        .bind(req.date)
        .bind(req.mood)
        .bind(req.focus)
        .bind(req.appetite)
        .bind(&req.homework)
        .bind(&req.note)
        .bind(req.is_absent)
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

        if existed.is_some() {
            audit::record(
                pool.clone(),
                user.user_id,
                "UPDATE_CONTACT_BOOK",
                format!("student={} date={}", req.student_id, req.date),
            );
        }

        Ok(entry)
    }

    /// Parent signature: one-shot. Re-signing an already-signed entry is
    /// rejected rather than silently refreshing the timestamp.
    pub async fn sign(
        pool: &PgPool,
        user: &AuthenticatedUser,
        student_id: Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<SignOutcome> {
        let current: Option<(Uuid, Option<chrono::DateTime<chrono::Utc>>)> = sqlx::query_as(
            "SELECT id, signed_at FROM contact_book_entries WHERE student_id = $1 AND date = $2",
        )
        .bind(student_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;

        let (entry_id, signed_at) = match current {
            Some(row) => row,
            None => return Ok(SignOutcome::NotFound),
        };
        if signed_at.is_some() {
            return Ok(SignOutcome::AlreadySigned);
        }

        let entry = sqlx::query_as::<_, ContactBookEntry>(&format!(
            "UPDATE contact_book_entries
             SET signed_at = NOW(), signed_by = $2, updated_at = NOW()
             WHERE id = $1 AND signed_at IS NULL
             RETURNING {ENTRY_COLS}"
        ))
        .bind(entry_id)
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;

        match entry {
            Some(e) => Ok(SignOutcome::Signed(e)),
            // Lost a race with another signer.
            None => Ok(SignOutcome::AlreadySigned),
        }
    }

    /// Apply homework and/or an announcement to every active student of a
    /// class in one shot. Homework overwrites; the announcement is appended to
    /// the note only when that exact text is not already present, so repeated
    /// application appends exactly once.
    pub async fn bulk_apply(
        pool: &PgPool,
        user: &AuthenticatedUser,
        req: &BulkApplyRequest,
    ) -> anyhow::Result<usize> {
        anyhow::ensure!(
            req.homework.is_some() || req.announcement.is_some(),
            "Nothing to apply"
        );

        let students: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM students WHERE is_active = TRUE AND class_label = $1",
        )
        .bind(&req.class_label)
        .fetch_all(pool)
        .await?;
        anyhow::ensure!(!students.is_empty(), "No students in class '{}'", req.class_label);

        let mut touched = 0usize;
        for student_id in students {
            let existing: Option<(String, String)> = sqlx::query_as(
                "SELECT homework, note FROM contact_book_entries
                 WHERE student_id = $1 AND date = $2",
            )
            .bind(student_id)
            .bind(req.date)
            .fetch_optional(pool)
            .await?;

            let (old_homework, old_note) = existing.unwrap_or_default();
            let homework = req.homework.clone().unwrap_or(old_homework);
            let note = match &req.announcement {
                Some(text) => append_once(&old_note, text),
                None => old_note,
            };

            sqlx::query(
                "INSERT INTO contact_book_entries
                     (student_id, date, homework, note, created_by)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (student_id, date) DO UPDATE SET
                     homework   = EXCLUDED.homework,
                     note       = EXCLUDED.note,
                     updated_at = NOW()",
            )
            .bind(student_id)
            .bind(req.date)
            .bind(&homework)
            .bind(&note)
            .bind(user.user_id)
            .execute(pool)
            .await?;
            touched += 1;
        }

        Ok(touched)
    }
}

/// Append `text` to `note` unless it is already a substring of it — the
/// duplicate-append guard for repeated bulk application.
pub fn append_once(note: &str, text: &str) -> String {
    if note.contains(text) {
        return note.to_string();
    }
    if note.is_empty() {
        text.to_string()
    } else {
        format!("{note}\n{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_form_state_carries_exact_defaults() {
        let id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let s = ContactBookFormState::blank(id, "Mina".into(), date);
        assert_eq!(s.entry_id, None);
        assert_eq!((s.mood, s.focus, s.appetite), (3, 3, 3));
        assert_eq!(s.homework, "");
        assert_eq!(s.note, "");
        assert!(s.photo_urls.is_empty());
        assert!(!s.is_absent);
        assert!(s.signed_at.is_none());
    }

    #[test]
    fn append_once_appends_exactly_once() {
        let once = append_once("", "Field trip Friday");
        assert_eq!(once, "Field trip Friday");
        let twice = append_once(&once, "Field trip Friday");
        assert_eq!(twice, once);
    }

    #[test]
    fn append_once_preserves_existing_note() {
        let note = append_once("Ate well today.", "Field trip Friday");
        assert_eq!(note, "Ate well today.\nField trip Friday");
        // A different announcement still appends.
        let note = append_once(&note, "Bring rain boots");
        assert!(note.contains("Field trip Friday") && note.ends_with("Bring rain boots"));
    }
}
