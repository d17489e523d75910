use sqlx::PgPool;

use crate::models::pickup::{PickupBoard, PickupQueueEntry, PickupQueueItem};
use crate::services::students::StudentService;
use crate::workflow::{PickupStatus, TransitionError};
use uuid::Uuid;

const QUEUE_COLS: &str = "id, student_id, status, created_at, updated_at";

pub enum AdvanceOutcome {
    Advanced(PickupQueueEntry),
    Illegal(TransitionError),
    NotFound,
}

pub struct PickupService;

impl PickupService {
    /// Enqueue by student name: creates the student if no active one of that
    /// name exists, then inserts a fresh pending entry. Entries are never
    /// reused across pickup events.
    pub async fn enqueue(pool: &PgPool, student_name: &str) -> anyhow::Result<PickupQueueEntry> {
        let student = StudentService::find_or_create_by_name(pool, student_name).await?;

        let entry = sqlx::query_as::<_, PickupQueueEntry>(&format!(
            "INSERT INTO pickup_queue (student_id) VALUES ($1) RETURNING {QUEUE_COLS}"
        ))
        .bind(student.id)
        .fetch_one(pool)
        .await?;
        Ok(entry)
    }

    /// Advance one entry. The transition table is consulted first, so status
    /// never regresses or skips a step.
    pub async fn advance(
        pool: &PgPool,
        entry_id: Uuid,
        next_status: &str,
    ) -> anyhow::Result<AdvanceOutcome> {
        let next = match PickupStatus::parse(next_status) {
            Ok(s) => s,
            Err(e) => return Ok(AdvanceOutcome::Illegal(e)),
        };

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM pickup_queue WHERE id = $1")
                .bind(entry_id)
                .fetch_optional(pool)
                .await?;
        let current = match current {
            Some(s) => s,
            None => return Ok(AdvanceOutcome::NotFound),
        };

        let from = PickupStatus::parse(&current)?;
        if let Err(e) = from.advance_to(next) {
            return Ok(AdvanceOutcome::Illegal(e));
        }

        // Guard on the old status too so concurrent advances cannot regress.
        let entry = sqlx::query_as::<_, PickupQueueEntry>(&format!(
            "UPDATE pickup_queue SET status = $2, updated_at = NOW()
             WHERE id = $1 AND status = $3
             RETURNING {QUEUE_COLS}"
        ))
        .bind(entry_id)
        .bind(next.as_str())
        .bind(from.as_str())
        .fetch_optional(pool)
        .await?;

        match entry {
            Some(e) => Ok(AdvanceOutcome::Advanced(e)),
            None => Ok(AdvanceOutcome::Illegal(TransitionError::Illegal {
                from: current,
                to: next.as_str().to_string(),
            })),
        }
    }

    /// Read model: partition open entries into pending and arrived lists.
    /// Completed entries drop out of the board.
    pub async fn board(pool: &PgPool) -> anyhow::Result<PickupBoard> {
        let items = sqlx::query_as::<_, PickupQueueItem>(
            "SELECT q.id, q.student_id, s.name AS student_name, q.status,
                    q.created_at, q.updated_at
             FROM pickup_queue q
             JOIN students s ON s.id = q.student_id
             WHERE q.status IN ('pending', 'arrived')
             ORDER BY q.created_at",
        )
        .fetch_all(pool)
        .await?;

        let (pending, arrived): (Vec<PickupQueueItem>, Vec<PickupQueueItem>) = items
            .into_iter()
            .partition(|item| item.status == "pending");

        Ok(PickupBoard { pending, arrived })
    }
}
