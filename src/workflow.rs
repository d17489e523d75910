//! Explicit transition tables for the small per-entity status models.
//!
//! Both the pickup queue and leave requests advance by direct status writes;
//! every write goes through these tables first so an illegal transition is an
//! error, never a silent overwrite.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    #[error("illegal transition from '{from}' to '{to}'")]
    Illegal { from: String, to: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupStatus {
    Pending,
    Arrived,
    Completed,
}

impl PickupStatus {
    pub fn parse(s: &str) -> Result<Self, TransitionError> {
        match s {
            "pending" => Ok(PickupStatus::Pending),
            "arrived" => Ok(PickupStatus::Arrived),
            "completed" => Ok(PickupStatus::Completed),
            other => Err(TransitionError::UnknownStatus(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::Pending => "pending",
            PickupStatus::Arrived => "arrived",
            PickupStatus::Completed => "completed",
        }
    }

    /// Queue entries move strictly forward: pending → arrived → completed.
    pub fn advance_to(self, next: PickupStatus) -> Result<PickupStatus, TransitionError> {
        match (self, next) {
            (PickupStatus::Pending, PickupStatus::Arrived) => Ok(next),
            (PickupStatus::Arrived, PickupStatus::Completed) => Ok(next),
            _ => Err(TransitionError::Illegal {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn parse(s: &str) -> Result<Self, TransitionError> {
        match s {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            other => Err(TransitionError::UnknownStatus(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    /// Only pending requests can be decided; approved/rejected are terminal.
    pub fn decide(self, next: LeaveStatus) -> Result<LeaveStatus, TransitionError> {
        match (self, next) {
            (LeaveStatus::Pending, LeaveStatus::Approved) => Ok(next),
            (LeaveStatus::Pending, LeaveStatus::Rejected) => Ok(next),
            _ => Err(TransitionError::Illegal {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            }),
        }
    }
}

/// Onboarding: a pending user may become teacher, manager, director or parent
/// (or be removed, which is not a status write).
pub fn onboarding_target_allowed(current_role: &str, target_role: &str) -> bool {
    current_role == "pending"
        && matches!(target_role, "teacher" | "manager" | "director" | "parent")
}

/// Role administration table. Pending users go through onboarding; established
/// users may be reassigned among the active roles. No transition leads back to
/// pending.
pub fn role_change_allowed(current_role: &str, target_role: &str) -> bool {
    match current_role {
        "pending" => onboarding_target_allowed(current_role, target_role),
        _ => matches!(target_role, "teacher" | "manager" | "director" | "parent"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickup_advances_strictly_forward() {
        let s = PickupStatus::Pending;
        let s = s.advance_to(PickupStatus::Arrived).unwrap();
        let s = s.advance_to(PickupStatus::Completed).unwrap();
        assert_eq!(s, PickupStatus::Completed);
    }

    #[test]
    fn pickup_never_regresses_or_skips() {
        assert!(PickupStatus::Arrived.advance_to(PickupStatus::Pending).is_err());
        assert!(PickupStatus::Completed.advance_to(PickupStatus::Arrived).is_err());
        assert!(PickupStatus::Pending.advance_to(PickupStatus::Completed).is_err());
        assert!(PickupStatus::Pending.advance_to(PickupStatus::Pending).is_err());
    }

    #[test]
    fn leave_decisions_only_from_pending() {
        assert_eq!(
            LeaveStatus::Pending.decide(LeaveStatus::Approved).unwrap(),
            LeaveStatus::Approved
        );
        assert_eq!(
            LeaveStatus::Pending.decide(LeaveStatus::Rejected).unwrap(),
            LeaveStatus::Rejected
        );
        // Re-deciding a decided request is rejected.
        assert!(LeaveStatus::Approved.decide(LeaveStatus::Rejected).is_err());
        assert!(LeaveStatus::Rejected.decide(LeaveStatus::Approved).is_err());
        assert!(LeaveStatus::Approved.decide(LeaveStatus::Pending).is_err());
    }

    #[test]
    fn unknown_statuses_are_errors() {
        assert_eq!(
            PickupStatus::parse("done"),
            Err(TransitionError::UnknownStatus("done".into()))
        );
        assert!(LeaveStatus::parse("cancelled").is_err());
    }

    #[test]
    fn onboarding_targets() {
        assert!(onboarding_target_allowed("pending", "teacher"));
        assert!(onboarding_target_allowed("pending", "director"));
        assert!(!onboarding_target_allowed("pending", "pending"));
        assert!(!onboarding_target_allowed("teacher", "manager"));
    }

    #[test]
    fn established_roles_reassign_among_active_roles() {
        assert!(role_change_allowed("teacher", "manager"));
        assert!(role_change_allowed("manager", "director"));
        assert!(role_change_allowed("director", "teacher"));
        assert!(role_change_allowed("teacher", "parent"));
    }

    #[test]
    fn no_role_change_leads_back_to_pending() {
        for current in ["pending", "parent", "teacher", "manager", "director"] {
            assert!(
                !role_change_allowed(current, "pending"),
                "{current} must not be demoted to pending"
            );
        }
    }
}
