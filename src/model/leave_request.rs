use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::role::Role;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// The role currently required to advance a request, or `Completed`.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
pub enum ApprovalLevel {
    #[default]
    #[serde(rename = "Line Manager")]
    #[strum(serialize = "Line Manager")]
    LineManager,
    #[serde(rename = "COO")]
    #[strum(serialize = "COO")]
    Coo,
    #[serde(rename = "CEO")]
    #[strum(serialize = "CEO")]
    Ceo,
    Completed,
}

impl ApprovalLevel {
    /// The approver role for this level; `None` once completed.
    pub fn approver(self) -> Option<Role> {
        match self {
            ApprovalLevel::LineManager => Some(Role::LineManager),
            ApprovalLevel::Coo => Some(Role::Coo),
            ApprovalLevel::Ceo => Some(Role::Ceo),
            ApprovalLevel::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub leave_type_id: Option<u64>,
    pub other_leave_type: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub approval_level: ApprovalLevel,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub line_manager_approval_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub coo_approval_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub ceo_approval_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn total_days(&self) -> i32 {
        inclusive_days(self.start_date, self.end_date)
    }

    pub fn is_terminal(&self) -> bool {
        self.status != LeaveStatus::Pending || self.approval_level == ApprovalLevel::Completed
    }
}

/// Inclusive day count between two dates; zero when the range is inverted.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i32 {
    if end < start {
        return 0;
    }
    (end - start).num_days() as i32 + 1
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveAttachment {
    pub id: u64,
    pub leave_request_id: u64,
    pub file_name: String,
    pub file_path: String,
    #[schema(value_type = String, format = "date-time")]
    pub uploaded_at: DateTime<Utc>,
}

/// A leave request joined with what listings show about its applicant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveRecord {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub applicant_name: String,
    pub employee_id: String,
    pub department: Option<String>,
    pub leave_type_name: Option<String>,
    pub total_days: i32,
}

/// Listing filter; every `None` field matches everything.
#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub user_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub approval_level: Option<ApprovalLevel>,
    pub department: Option<String>,
    /// Case-insensitive substring of the applicant's first or last name.
    pub employee_name: Option<String>,
    /// Page window; counting ignores both.
    pub limit: Option<u64>,
    pub offset: u64,
}
