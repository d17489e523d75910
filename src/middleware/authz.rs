//! Central authorization context. Every handler consults the typed capability
//! set derived from the caller's role instead of comparing role strings ad hoc.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::models::auth::AuthenticatedUser;
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewAnnouncements,
    ManageAnnouncements,
    ViewContactBook,
    WriteContactBook,
    SignContactBook,
    ViewLeaves,
    RequestLeave,
    DecideLeave,
    ViewPickup,
    ManagePickup,
    ViewGrades,
    RecordGrades,
    ManageStudents,
    ViewStaffDirectory,
    ManageStaff,
    ViewReports,
    SendMessages,
}

impl Role {
    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            // Pending accounts can authenticate but do nothing until approved.
            Role::Pending => &[],
            // Parents view their own children's data (scoping lives in the
            // queries) and the lobby pickup board.
            Role::Parent => &[
                ViewAnnouncements,
                ViewContactBook,
                SignContactBook,
                ViewLeaves,
                RequestLeave,
                ViewPickup,
                ViewGrades,
                SendMessages,
            ],
            Role::Teacher => &[
                ViewAnnouncements,
                ManageAnnouncements,
                ViewContactBook,
                WriteContactBook,
                ViewLeaves,
                DecideLeave,
                ViewPickup,
                ManagePickup,
                ViewGrades,
                RecordGrades,
                ManageStudents,
                SendMessages,
            ],
            Role::Manager => &[
                ViewAnnouncements,
                ManageAnnouncements,
                ViewContactBook,
                WriteContactBook,
                ViewLeaves,
                DecideLeave,
                ViewPickup,
                ManagePickup,
                ViewGrades,
                RecordGrades,
                ManageStudents,
                ViewStaffDirectory,
                ViewReports,
                SendMessages,
            ],
            Role::Director => &[
                ViewAnnouncements,
                ManageAnnouncements,
                ViewContactBook,
                WriteContactBook,
                ViewLeaves,
                DecideLeave,
                ViewPickup,
                ManagePickup,
                ViewGrades,
                RecordGrades,
                ManageStudents,
                ViewStaffDirectory,
                ManageStaff,
                ViewReports,
                SendMessages,
            ],
        }
    }

    pub fn can(&self, cap: Capability) -> bool {
        self.capabilities().contains(&cap)
    }
}

impl AuthenticatedUser {
    /// Gate a handler on one capability; mismatch is a blocking 403.
    pub fn require(&self, cap: Capability) -> Result<(), (StatusCode, Json<Value>)> {
        if self.role.can(cap) {
            Ok(())
        } else {
            Err((StatusCode::FORBIDDEN, Json(json!({ "error": "Access denied" }))))
        }
    }

    /// Audit-log reads are gated on the super-admin flag, not the role.
    pub fn require_super_admin(&self) -> Result<(), (StatusCode, Json<Value>)> {
        if self.is_super_admin {
            Ok(())
        } else {
            Err((StatusCode::FORBIDDEN, Json(json!({ "error": "Access denied" }))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_has_no_capabilities() {
        assert!(Role::Pending.capabilities().is_empty());
    }

    #[test]
    fn parents_sign_but_never_write() {
        assert!(Role::Parent.can(Capability::SignContactBook));
        assert!(!Role::Parent.can(Capability::WriteContactBook));
        assert!(!Role::Parent.can(Capability::DecideLeave));
        assert!(!Role::Parent.can(Capability::ViewReports));
    }

    #[test]
    fn parents_view_their_domains_but_never_act_on_them() {
        for cap in [
            Capability::ViewLeaves,
            Capability::ViewPickup,
            Capability::ViewGrades,
        ] {
            assert!(Role::Parent.can(cap));
        }
        assert!(!Role::Parent.can(Capability::ManagePickup));
        assert!(!Role::Parent.can(Capability::RecordGrades));
    }

    #[test]
    fn staff_directory_is_manager_and_up() {
        assert!(!Role::Parent.can(Capability::ViewStaffDirectory));
        assert!(!Role::Teacher.can(Capability::ViewStaffDirectory));
        assert!(Role::Manager.can(Capability::ViewStaffDirectory));
        assert!(Role::Director.can(Capability::ViewStaffDirectory));
    }

    #[test]
    fn only_directors_manage_staff() {
        for role in [Role::Pending, Role::Parent, Role::Teacher, Role::Manager] {
            assert!(!role.can(Capability::ManageStaff), "{role} must not manage staff");
        }
        assert!(Role::Director.can(Capability::ManageStaff));
    }

    #[test]
    fn reports_are_manager_and_up() {
        assert!(!Role::Teacher.can(Capability::ViewReports));
        assert!(Role::Manager.can(Capability::ViewReports));
        assert!(Role::Director.can(Capability::ViewReports));
    }
}
