use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    auth::AuthenticatedUser,
    leave::{CreateLeaveRequest, LeaveCalendarItem, LeaveRequest, LEAVE_TYPES},
    user::Role,
};
use crate::services::audit;
use crate::workflow::LeaveStatus;

const LEAVE_COLS: &str =
    "id, student_id, leave_type, reason, start_date, end_date, status,
     created_by, decided_by, decided_at, created_at, updated_at";

pub enum DecideOutcome {
    Decided(LeaveRequest),
    IllegalTransition { from: String },
    NotFound,
}

pub struct LeaveService;

impl LeaveService {
    pub async fn create(
        pool: &PgPool,
        user: &AuthenticatedUser,
        req: &CreateLeaveRequest,
    ) -> anyhow::Result<LeaveRequest> {
        anyhow::ensure!(!req.reason.trim().is_empty(), "Reason is required");
        anyhow::ensure!(
            req.start_date <= req.end_date,
            "Start date must not be after end date"
        );
        anyhow::ensure!(
            LEAVE_TYPES.contains(&req.leave_type.as_str()),
            "Invalid leave type: {}",
            req.leave_type
        );

        let leave = sqlx::query_as::<_, LeaveRequest>(&format!(
            "INSERT INTO leave_requests
                 (student_id, leave_type, reason, start_date, end_date, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {LEAVE_COLS}"
        ))
        .bind(req.student_id)
        .bind(&req.leave_type)
        .bind(req.reason.trim())
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;
        Ok(leave)
    }

    /// Parents see only their own children's requests; staff see all.
    pub async fn list(pool: &PgPool, user: &AuthenticatedUser) -> anyhow::Result<Vec<LeaveRequest>> {
        let leaves = if user.role == Role::Parent {
            sqlx::query_as::<_, LeaveRequest>(
                "SELECT l.id, l.student_id, l.leave_type, l.reason, l.start_date, l.end_date,
                        l.status, l.created_by, l.decided_by, l.decided_at, l.created_at,
                        l.updated_at
                 FROM leave_requests l
                 JOIN students s ON s.id = l.student_id
                 WHERE s.primary_parent_id = $1 OR s.secondary_parent_id = $1
                 ORDER BY l.created_at DESC",
            )
            .bind(user.user_id)
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, LeaveRequest>(&format!(
                "SELECT {LEAVE_COLS} FROM leave_requests ORDER BY created_at DESC"
            ))
            .fetch_all(pool)
            .await?
        };
        Ok(leaves)
    }

    /// Staff decision. Legal transitions are exactly pending→approved and
    /// pending→rejected; the transition table rejects anything else, so a
    /// decided request can never be re-decided.
    pub async fn decide(
        pool: &PgPool,
        user: &AuthenticatedUser,
        leave_id: Uuid,
        approve: bool,
    ) -> anyhow::Result<DecideOutcome> {
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM leave_requests WHERE id = $1")
                .bind(leave_id)
                .fetch_optional(pool)
                .await?;
        let current = match current {
            Some(s) => s,
            None => return Ok(DecideOutcome::NotFound),
        };

        let next = if approve {
            LeaveStatus::Approved
        } else {
            LeaveStatus::Rejected
        };
        let from = LeaveStatus::parse(&current)?;
        if from.decide(next).is_err() {
            return Ok(DecideOutcome::IllegalTransition { from: current });
        }

        // Status in the WHERE clause so a concurrent decision loses cleanly.
        let leave = sqlx::query_as::<_, LeaveRequest>(&format!(
            "UPDATE leave_requests
             SET status = $2, decided_by = $3, decided_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING {LEAVE_COLS}"
        ))
        .bind(leave_id)
        .bind(next.as_str())
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;

        let leave = match leave {
            Some(l) => l,
            None => return Ok(DecideOutcome::IllegalTransition { from: current }),
        };

        let student_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM students WHERE id = $1")
                .bind(leave.student_id)
                .fetch_optional(pool)
                .await
                .unwrap_or(None);

        audit::record(
            pool.clone(),
            user.user_id,
            if approve { "APPROVE_LEAVE" } else { "REJECT_LEAVE" },
            format!(
                "student={} type={} range={}..{}",
                student_name.unwrap_or_else(|| leave.student_id.to_string()),
                leave.leave_type,
                leave.start_date,
                leave.end_date
            ),
        );

        Ok(DecideOutcome::Decided(leave))
    }

    /// Students on leave on a given day. The SQL narrows to requests whose
    /// range touches the date; `covers_calendar_day` is the authoritative
    /// filter.
    pub async fn calendar(pool: &PgPool, date: NaiveDate) -> anyhow::Result<Vec<LeaveCalendarItem>> {
        let items = sqlx::query_as::<_, LeaveCalendarItem>(
            "SELECT l.student_id, s.name AS student_name, l.leave_type, l.status,
                    l.start_date, l.end_date
             FROM leave_requests l
             JOIN students s ON s.id = l.student_id
             WHERE l.start_date <= $1 AND l.end_date >= $1
             ORDER BY s.name",
        )
        .bind(date)
        .fetch_all(pool)
        .await?;
        Ok(items
            .into_iter()
            .filter(|i| covers_calendar_day(i.start_date, i.end_date, &i.status, date))
            .collect())
    }
}

/// A request covers a calendar day when the inclusive range contains it and
/// the request has been decided. Pending requests never feed the calendar.
pub fn covers_calendar_day(
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: &str,
    day: NaiveDate,
) -> bool {
    start_date <= day && day <= end_date && status != "pending"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn pending_requests_never_appear_on_the_calendar() {
        assert!(!covers_calendar_day(day(1), day(5), "pending", day(3)));
        assert!(covers_calendar_day(day(1), day(5), "approved", day(3)));
        assert!(covers_calendar_day(day(1), day(5), "rejected", day(3)));
    }

    #[test]
    fn range_containment_is_inclusive_on_both_ends() {
        assert!(covers_calendar_day(day(1), day(5), "approved", day(1)));
        assert!(covers_calendar_day(day(1), day(5), "approved", day(5)));
        assert!(!covers_calendar_day(day(1), day(5), "approved", day(6)));
        assert!(!covers_calendar_day(day(2), day(5), "approved", day(1)));
    }

    #[test]
    fn single_day_request_covers_exactly_that_day() {
        assert!(covers_calendar_day(day(3), day(3), "approved", day(3)));
        assert!(!covers_calendar_day(day(3), day(3), "approved", day(2)));
        assert!(!covers_calendar_day(day(3), day(3), "approved", day(4)));
    }
}
