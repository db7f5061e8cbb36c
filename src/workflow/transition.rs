//! Approval routing rules.
//!
//! Every (level, status, actor role) combination resolves to exactly one
//! outcome here; callers never fall through to a silent no-op.

use super::WorkflowError;
use crate::model::{
    leave_request::{ApprovalLevel, LeaveStatus},
    role::Role,
};
use crate::store::ApprovalStamp;

/// Level a freshly submitted request starts at, given the submitter's role.
pub fn initial_level(role: Role) -> ApprovalLevel {
    match role {
        Role::Staff => ApprovalLevel::LineManager,
        Role::LineManager | Role::Admin => ApprovalLevel::Coo,
        Role::Coo => ApprovalLevel::Ceo,
        Role::Ceo => ApprovalLevel::Completed,
    }
}

/// The level whose queue an approver works; `None` for other roles.
pub fn queue_level(role: Role) -> Option<ApprovalLevel> {
    match role {
        Role::LineManager => Some(ApprovalLevel::LineManager),
        Role::Coo => Some(ApprovalLevel::Coo),
        Role::Ceo => Some(ApprovalLevel::Ceo),
        Role::Staff | Role::Admin => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub to: ApprovalLevel,
    pub stamp: ApprovalStamp,
}

impl Advance {
    pub fn completes(&self) -> bool {
        self.to == ApprovalLevel::Completed
    }
}

pub fn approval_step(
    status: LeaveStatus,
    level: ApprovalLevel,
    actor: Role,
) -> Result<Advance, WorkflowError> {
    if !actor.is_approver() {
        return Err(WorkflowError::NotAnApprover(actor));
    }
    if status != LeaveStatus::Pending {
        return Err(WorkflowError::Finalized(status));
    }

    match (level, actor) {
        (ApprovalLevel::LineManager, Role::LineManager) => Ok(Advance {
            to: ApprovalLevel::Coo,
            stamp: ApprovalStamp::LineManager,
        }),
        (ApprovalLevel::Coo, Role::Coo) => Ok(Advance {
            to: ApprovalLevel::Ceo,
            stamp: ApprovalStamp::Coo,
        }),
        (ApprovalLevel::Ceo, Role::Ceo) => Ok(Advance {
            to: ApprovalLevel::Completed,
            stamp: ApprovalStamp::Ceo,
        }),
        (ApprovalLevel::Completed, _) => Err(WorkflowError::Finalized(LeaveStatus::Approved)),
        (level, role) => Err(WorkflowError::LevelMismatch { level, role }),
    }
}

/// Rejection needs an approver role but not a matching level.
pub fn rejection_check(
    status: LeaveStatus,
    level: ApprovalLevel,
    actor: Role,
) -> Result<(), WorkflowError> {
    if !actor.is_approver() {
        return Err(WorkflowError::NotAnApprover(actor));
    }
    if status != LeaveStatus::Pending {
        return Err(WorkflowError::Finalized(status));
    }
    if level == ApprovalLevel::Completed {
        return Err(WorkflowError::Finalized(LeaveStatus::Approved));
    }
    Ok(())
}
