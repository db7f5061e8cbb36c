pub mod catalog;
pub mod leave;
pub mod reconcile;
pub mod transition;

use thiserror::Error;

use crate::model::{
    leave_request::{ApprovalLevel, LeaveStatus},
    role::Role,
};
use crate::store::StoreError;

pub use catalog::CatalogCache;
pub use leave::{LeaveApplication, Workflow};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("You must be assigned to a Department before applying. Please contact Admin.")]
    DepartmentRequired,

    #[error("End date cannot be before start date.")]
    InvalidDateRange,

    #[error("Select a leave type or describe another one.")]
    LeaveTypeRequired,

    #[error("Leave type {0} does not exist.")]
    UnknownLeaveType(u64),

    #[error("{0} leave is not available to you.")]
    LeaveTypeUnavailable(String),

    #[error("You only have {remaining} days remaining for {leave_type} leave.")]
    InsufficientBalance { remaining: i64, leave_type: String },

    #[error("{0} cannot approve or reject leave requests.")]
    NotAnApprover(Role),

    #[error("This request is awaiting {level} approval, not {role}.")]
    LevelMismatch { level: ApprovalLevel, role: Role },

    #[error("This request has already been {0}.")]
    Finalized(LeaveStatus),

    #[error("Leave request not found.")]
    NotFound,

    #[error("This request was updated by someone else. Reload and try again.")]
    Stale,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => WorkflowError::NotFound,
            StoreError::Stale => WorkflowError::Stale,
            other => WorkflowError::Store(other),
        }
    }
}
