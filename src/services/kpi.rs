//! Manager dashboard aggregation. Teachers, students, grades and approved
//! leaves are fetched independently and joined in memory through lookup maps
//! built once per call.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{auth::AuthenticatedUser, user::Role};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeacherRow {
    pub id: Uuid,
    pub display_name: String,
    pub department: Option<String>,
    pub responsible_classes: Vec<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentRow {
    pub id: Uuid,
    pub class_label: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GradeRow {
    pub student_id: Uuid,
    pub score: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TeacherKpi {
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub department: Option<String>,
    pub student_count: usize,
    pub average_score: f64,
    pub approved_leave_count: usize,
}

#[derive(Debug, Serialize)]
pub struct KpiReport {
    pub department: Option<String>,
    pub teachers: Vec<TeacherKpi>,
    pub total_students: usize,
    pub total_approved_leaves: usize,
}

/// Department scope for a report request.
#[derive(Debug, PartialEq, Eq)]
pub enum ReportScope {
    All,
    Department(String),
    /// A manager with no department assigned reports on nothing.
    Nothing,
}

/// A director may pass a department or see everything; a manager is pinned to
/// their own department and scopes to nothing when they have none.
pub fn resolve_scope(
    role: Role,
    requested: Option<String>,
    own_department: Option<String>,
) -> ReportScope {
    if role == Role::Director {
        match requested {
            Some(dept) => ReportScope::Department(dept),
            None => ReportScope::All,
        }
    } else {
        match own_department {
            Some(dept) => ReportScope::Department(dept),
            None => ReportScope::Nothing,
        }
    }
}

pub struct KpiService;

impl KpiService {
    pub async fn report(
        pool: &PgPool,
        user: &AuthenticatedUser,
        department: Option<String>,
    ) -> anyhow::Result<KpiReport> {
        let own_department: Option<String> = if user.role == Role::Director {
            None
        } else {
            sqlx::query_scalar("SELECT department FROM users WHERE id = $1")
                .bind(user.user_id)
                .fetch_optional(pool)
                .await?
                .flatten()
        };

        let scope = match resolve_scope(user.role, department, own_department) {
            ReportScope::All => None,
            ReportScope::Department(dept) => Some(dept),
            ReportScope::Nothing => {
                return Ok(KpiReport {
                    department: None,
                    teachers: Vec::new(),
                    total_students: 0,
                    total_approved_leaves: 0,
                })
            }
        };

        let teachers: Vec<TeacherRow> = match &scope {
            Some(dept) => {
                sqlx::query_as(
                    "SELECT id, display_name, department, responsible_classes
                     FROM users
                     WHERE role = 'teacher' AND is_active = TRUE AND department = $1",
                )
                .bind(dept)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, display_name, department, responsible_classes
                     FROM users WHERE role = 'teacher' AND is_active = TRUE",
                )
                .fetch_all(pool)
                .await?
            }
        };

        let students: Vec<StudentRow> =
            sqlx::query_as("SELECT id, class_label FROM students WHERE is_active = TRUE")
                .fetch_all(pool)
                .await?;

        let grades: Vec<GradeRow> =
            sqlx::query_as("SELECT student_id, score FROM grade_records")
                .fetch_all(pool)
                .await?;

        let leave_students: Vec<Uuid> = sqlx::query_scalar(
            "SELECT student_id FROM leave_requests WHERE status = 'approved'",
        )
        .fetch_all(pool)
        .await?;

        let teachers_kpi = aggregate(&teachers, &students, &grades, &leave_students);
        let total_students = teachers_kpi.iter().map(|t| t.student_count).sum();
        let total_approved_leaves = teachers_kpi.iter().map(|t| t.approved_leave_count).sum();

        Ok(KpiReport {
            department: scope,
            teachers: teachers_kpi,
            total_students,
            total_approved_leaves,
        })
    }
}

/// A student belongs to a teacher when the student's class label contains one
/// of the teacher's class tags (substring containment, the product's matching
/// rule). Grade and leave lookups are index maps built once.
pub fn aggregate(
    teachers: &[TeacherRow],
    students: &[StudentRow],
    grades: &[GradeRow],
    approved_leave_students: &[Uuid],
) -> Vec<TeacherKpi> {
    let mut grades_by_student: HashMap<Uuid, Vec<f64>> = HashMap::new();
    for g in grades {
        grades_by_student.entry(g.student_id).or_default().push(g.score);
    }

    let mut leaves_by_student: HashMap<Uuid, usize> = HashMap::new();
    for id in approved_leave_students {
        *leaves_by_student.entry(*id).or_insert(0) += 1;
    }

    let mut out: Vec<TeacherKpi> = teachers
        .iter()
        .map(|t| {
            let matched: Vec<&StudentRow> = students
                .iter()
                .filter(|s| {
                    t.responsible_classes
                        .iter()
                        .any(|tag| !tag.is_empty() && s.class_label.contains(tag.as_str()))
                })
                .collect();

            let mut score_sum = 0.0;
            let mut score_n = 0usize;
            let mut leave_count = 0usize;
            for s in &matched {
                if let Some(scores) = grades_by_student.get(&s.id) {
                    score_sum += scores.iter().sum::<f64>();
                    score_n += scores.len();
                }
                leave_count += leaves_by_student.get(&s.id).copied().unwrap_or(0);
            }

            TeacherKpi {
                teacher_id: t.id,
                teacher_name: t.display_name.clone(),
                department: t.department.clone(),
                student_count: matched.len(),
                average_score: if score_n == 0 { 0.0 } else { score_sum / score_n as f64 },
                approved_leave_count: leave_count,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher(name: &str, tags: &[&str]) -> TeacherRow {
        TeacherRow {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            department: Some("K1".to_string()),
            responsible_classes: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn student(class: &str) -> StudentRow {
        StudentRow {
            id: Uuid::new_v4(),
            class_label: class.to_string(),
        }
    }

    #[test]
    fn directors_choose_their_scope() {
        assert_eq!(resolve_scope(Role::Director, None, None), ReportScope::All);
        assert_eq!(
            resolve_scope(Role::Director, Some("K1".into()), None),
            ReportScope::Department("K1".into())
        );
    }

    #[test]
    fn managers_are_pinned_to_their_own_department() {
        assert_eq!(
            resolve_scope(Role::Manager, Some("K2".into()), Some("K1".into())),
            ReportScope::Department("K1".into())
        );
    }

    #[test]
    fn manager_without_department_scopes_to_nothing() {
        assert_eq!(resolve_scope(Role::Manager, None, None), ReportScope::Nothing);
        // Even an explicit query parameter does not widen the scope.
        assert_eq!(
            resolve_scope(Role::Manager, Some("K1".into()), None),
            ReportScope::Nothing
        );
    }

    #[test]
    fn matches_by_substring_containment() {
        let t = teacher("Ms. Okafor", &["Maple"]);
        let s1 = student("Maple A");
        let s2 = student("Maple B");
        let s3 = student("Oak");
        let kpis = aggregate(&[t], &[s1, s2, s3], &[], &[]);
        assert_eq!(kpis[0].student_count, 2);
    }

    #[test]
    fn zero_grades_means_average_zero_but_students_still_counted() {
        let t = teacher("Ms. Okafor", &["Maple"]);
        let s = student("Maple A");
        let kpis = aggregate(&[t], &[s], &[], &[]);
        assert_eq!(kpis[0].student_count, 1);
        assert_eq!(kpis[0].average_score, 0.0);
    }

    #[test]
    fn average_spans_all_matched_students_grades() {
        let t = teacher("Ms. Okafor", &["Maple"]);
        let s1 = student("Maple A");
        let s2 = student("Maple B");
        let grades = vec![
            GradeRow { student_id: s1.id, score: 80.0 },
            GradeRow { student_id: s1.id, score: 90.0 },
            GradeRow { student_id: s2.id, score: 70.0 },
        ];
        let kpis = aggregate(&[t], &[s1, s2], &grades, &[]);
        assert_eq!(kpis[0].average_score, 80.0);
    }

    #[test]
    fn sorted_descending_by_average_score() {
        let t1 = teacher("Low", &["Oak"]);
        let t2 = teacher("High", &["Maple"]);
        let s1 = student("Oak");
        let s2 = student("Maple");
        let grades = vec![
            GradeRow { student_id: s1.id, score: 50.0 },
            GradeRow { student_id: s2.id, score: 95.0 },
        ];
        let kpis = aggregate(&[t1, t2], &[s1, s2], &grades, &[]);
        assert_eq!(kpis[0].teacher_name, "High");
        assert_eq!(kpis[1].teacher_name, "Low");
    }

    #[test]
    fn approved_leaves_counted_per_matched_student() {
        let t = teacher("Ms. Okafor", &["Maple"]);
        let s1 = student("Maple A");
        let s2 = student("Oak");
        let leaves = vec![s1.id, s1.id, s2.id];
        let kpis = aggregate(&[t], &[s1, s2], &[], &leaves);
        assert_eq!(kpis[0].approved_leave_count, 2);
    }

    #[test]
    fn missing_join_targets_yield_zeroes_not_errors() {
        let t = teacher("Ms. Okafor", &["Maple"]);
        let kpis = aggregate(&[t], &[], &[], &[]);
        assert_eq!(kpis[0].student_count, 0);
        assert_eq!(kpis[0].average_score, 0.0);
        assert_eq!(kpis[0].approved_leave_count, 0);
    }

    #[test]
    fn empty_class_tags_never_match() {
        let t = teacher("Ms. Okafor", &[""]);
        let s = student("Maple A");
        let kpis = aggregate(&[t], &[s], &[], &[]);
        assert_eq!(kpis[0].student_count, 0);
    }
}
