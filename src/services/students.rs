use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    auth::AuthenticatedUser,
    student::{CreateStudentRequest, Student, UpdateStudentRequest},
    user::Role,
};

const STUDENT_COLS: &str =
    "id, name, class_label, primary_parent_id, secondary_parent_id, parent_email,
     health_notes, emergency_contact, photo_url, is_active, created_at, updated_at";

pub struct StudentService;

impl StudentService {
    /// Role-scoped listing: parents get only students linked to them, staff
    /// get everything. The restriction lives in the query, not in a
    /// post-fetch filter.
    pub async fn list(pool: &PgPool, user: &AuthenticatedUser) -> anyhow::Result<Vec<Student>> {
        let students = if user.role == Role::Parent {
            sqlx::query_as::<_, Student>(&format!(
                "SELECT {STUDENT_COLS} FROM students
                 WHERE is_active = TRUE
                   AND (primary_parent_id = $1 OR secondary_parent_id = $1)
                 ORDER BY name"
            ))
            .bind(user.user_id)
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, Student>(&format!(
                "SELECT {STUDENT_COLS} FROM students WHERE is_active = TRUE ORDER BY name"
            ))
            .fetch_all(pool)
            .await?
        };
        Ok(students)
    }

    /// Returns true if the user is a linked parent of the student.
    pub async fn is_parent_of(
        pool: &PgPool,
        student_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM students
                 WHERE id = $1 AND (primary_parent_id = $2 OR secondary_parent_id = $2)
             )",
        )
        .bind(student_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(pool: &PgPool, req: &CreateStudentRequest) -> anyhow::Result<Student> {
        anyhow::ensure!(!req.name.trim().is_empty(), "Student name is required");

        let student = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students
                 (name, class_label, primary_parent_id, secondary_parent_id,
                  parent_email, health_notes, emergency_contact)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {STUDENT_COLS}"
        ))
        .bind(req.name.trim())
        .bind(req.class_label.as_deref().unwrap_or(""))
        .bind(req.primary_parent_id)
        .bind(req.secondary_parent_id)
        .bind(&req.parent_email)
        .bind(&req.health_notes)
        .bind(&req.emergency_contact)
        .fetch_one(pool)
        .await?;
        Ok(student)
    }

    pub async fn update(
        pool: &PgPool,
        student_id: Uuid,
        req: &UpdateStudentRequest,
    ) -> anyhow::Result<Student> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "UPDATE students SET
                 name                = COALESCE($2, name),
                 class_label         = COALESCE($3, class_label),
                 primary_parent_id   = COALESCE($4, primary_parent_id),
                 secondary_parent_id = COALESCE($5, secondary_parent_id),
                 parent_email        = COALESCE($6, parent_email),
                 health_notes        = COALESCE($7, health_notes),
                 emergency_contact   = COALESCE($8, emergency_contact),
                 photo_url           = COALESCE($9, photo_url),
                 is_active           = COALESCE($10, is_active),
                 updated_at          = NOW()
             WHERE id = $1
             RETURNING {STUDENT_COLS}"
        ))
        .bind(student_id)
        .bind(&req.name)
        .bind(&req.class_label)
        .bind(req.primary_parent_id)
        .bind(req.secondary_parent_id)
        .bind(&req.parent_email)
        .bind(&req.health_notes)
        .bind(&req.emergency_contact)
        .bind(&req.photo_url)
        .bind(req.is_active)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Student not found"))?;
        Ok(student)
    }

    /// Explicit staff removal deactivates; students are never hard-deleted in
    /// the normal flow.
    pub async fn remove(pool: &PgPool, student_id: Uuid) -> anyhow::Result<()> {
        let res = sqlx::query(
            "UPDATE students SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(student_id)
        .execute(pool)
        .await?;
        anyhow::ensure!(res.rows_affected() > 0, "Student not found");
        Ok(())
    }

    /// Find an active student by exact name, or create one. Used by the
    /// pickup queue, which enqueues by name.
    pub async fn find_or_create_by_name(pool: &PgPool, name: &str) -> anyhow::Result<Student> {
        let name = name.trim();
        anyhow::ensure!(!name.is_empty(), "Student name is required");

        if let Some(existing) = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLS} FROM students WHERE name = $1 AND is_active = TRUE LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(pool)
        .await?
        {
            return Ok(existing);
        }

        let student = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (name) VALUES ($1) RETURNING {STUDENT_COLS}"
        ))
        .bind(name)
        .fetch_one(pool)
        .await?;
        Ok(student)
    }
}
