//! Persistence contracts for the leave service.
//!
//! Every method that writes more than one row runs as a single
//! transaction in the MySQL implementation.

#![allow(async_fn_in_trait)]

pub mod mysql;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::{
    balance::LeaveBalance,
    leave_request::{ApprovalLevel, LeaveAttachment, LeaveQuery, LeaveRecord, LeaveRequest, LeaveStatus},
    leave_type::{LeaveGender, LeaveType},
    notification::Notification,
    profile::Gender,
    role::Role,
    token::{PasswordResetToken, RefreshToken},
    user::Account,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key already holds this value; carries the field name.
    #[error("{0} is already registered")]
    Conflict(&'static str),

    /// A guarded update matched no row because the record moved on.
    #[error("record was modified concurrently")]
    Stale,

    #[error("record not found")]
    NotFound,

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub id_number: String,
    pub phone_number: String,
    pub gender: Gender,
}

#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Gender,
    pub phone_number: String,
    /// `None` keeps the current photo.
    pub profile_photo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLeaveType {
    pub name: String,
    pub default_days: i32,
    pub gender: LeaveGender,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveTypeUpdate {
    pub name: Option<String>,
    pub default_days: Option<i32>,
    pub gender: Option<LeaveGender>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub file_name: String,
    pub file_path: String,
}

/// Tracker debit applied in the same transaction as a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debit {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub days: i32,
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub user_id: u64,
    pub leave_type_id: Option<u64>,
    pub other_leave_type: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub approval_level: ApprovalLevel,
    /// Set when the request is completed on submission.
    pub ceo_approval_date: Option<DateTime<Utc>>,
    pub attachments: Vec<NewAttachment>,
    pub debit: Option<Debit>,
}

/// Which approval timestamp a transition stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStamp {
    LineManager,
    Coo,
    Ceo,
}

impl ApprovalStamp {
    pub fn column(self) -> &'static str {
        match self {
            ApprovalStamp::LineManager => "line_manager_approval_date",
            ApprovalStamp::Coo => "coo_approval_date",
            ApprovalStamp::Ceo => "ceo_approval_date",
        }
    }
}

/// A guarded state change: applies only while the request is still
/// pending at `from_level`.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from_level: ApprovalLevel,
    pub to_level: ApprovalLevel,
    pub status: LeaveStatus,
    pub stamp: Option<(ApprovalStamp, DateTime<Utc>)>,
    pub rejection_reason: Option<String>,
    pub debit: Option<Debit>,
}

pub trait AccountStore {
    /// Creates user, profile and the given allowances/trackers atomically.
    async fn create_account(&self, new: NewAccount, leave_types: &[LeaveType]) -> StoreResult<Account>;
    async fn find_account(&self, user_id: u64) -> StoreResult<Option<Account>>;
    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;
    async fn update_account(&self, user_id: u64, update: AccountUpdate) -> StoreResult<Account>;
    async fn update_employment(
        &self,
        user_id: u64,
        role: Role,
        department: Option<String>,
    ) -> StoreResult<Account>;
    async fn delete_account(&self, user_id: u64) -> StoreResult<bool>;
    /// First account holding `role`, restricted to `department` when given.
    async fn find_approver(&self, role: Role, department: Option<&str>) -> StoreResult<Option<Account>>;
}

pub trait CatalogStore {
    async fn list_leave_types(&self) -> StoreResult<Vec<LeaveType>>;
    async fn find_leave_type(&self, id: u64) -> StoreResult<Option<LeaveType>>;
    async fn create_leave_type(&self, new: NewLeaveType) -> StoreResult<LeaveType>;
    async fn update_leave_type(&self, id: u64, update: LeaveTypeUpdate) -> StoreResult<LeaveType>;
}

pub trait BalanceStore {
    /// Returns `true` when a row was created.
    async fn ensure_allowance(&self, user_id: u64, leave_type: &LeaveType) -> StoreResult<bool>;
    /// Returns `true` when a row was created.
    async fn ensure_tracker(&self, user_id: u64, leave_type_id: u64) -> StoreResult<bool>;
    async fn balances(&self, user_id: u64) -> StoreResult<Vec<LeaveBalance>>;
    async fn balance(&self, user_id: u64, leave_type_id: u64) -> StoreResult<Option<LeaveBalance>>;
    async fn set_allowance(&self, user_id: u64, leave_type_id: u64, allowed_days: i32) -> StoreResult<()>;
}

pub trait LeaveStore {
    async fn insert_leave_request(&self, new: NewLeaveRequest) -> StoreResult<LeaveRequest>;
    async fn find_leave_request(&self, id: u64) -> StoreResult<Option<LeaveRequest>>;
    /// Newest first.
    async fn list_leave_requests(&self, query: &LeaveQuery) -> StoreResult<Vec<LeaveRecord>>;
    async fn count_leave_requests(&self, query: &LeaveQuery) -> StoreResult<u64>;
    async fn list_attachments(&self, leave_request_id: u64) -> StoreResult<Vec<LeaveAttachment>>;
    /// Fails with [`StoreError::Stale`] when the request is no longer
    /// pending at `transition.from_level`.
    async fn apply_transition(&self, id: u64, transition: &Transition) -> StoreResult<LeaveRequest>;
}

pub trait NotificationStore {
    async fn insert_notification(
        &self,
        user_id: u64,
        message: &str,
        link: Option<&str>,
    ) -> StoreResult<Notification>;
    /// Newest first.
    async fn list_notifications(&self, user_id: u64) -> StoreResult<Vec<Notification>>;
    /// `None` when the notification does not exist or belongs to someone else.
    async fn mark_notification_read(&self, user_id: u64, id: u64) -> StoreResult<Option<Notification>>;
    async fn mark_all_notifications_read(&self, user_id: u64) -> StoreResult<u64>;
}

pub trait TokenStore {
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()>;
    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>>;
    /// Consumes a valid token and stores the new password hash. Returns
    /// `false` when the token is unknown, used or expired.
    async fn reset_password(&self, token: &str, password_hash: &str, now: DateTime<Utc>) -> StoreResult<bool>;
    async fn insert_refresh_token(&self, token: &RefreshToken) -> StoreResult<()>;
    async fn find_refresh_token(&self, jti: &str) -> StoreResult<Option<RefreshToken>>;
    /// Returns `true` when an active token was revoked.
    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool>;
}

pub trait Store:
    AccountStore + CatalogStore + BalanceStore + LeaveStore + NotificationStore + TokenStore + 'static
{
}

impl<T> Store for T where
    T: AccountStore + CatalogStore + BalanceStore + LeaveStore + NotificationStore + TokenStore + 'static
{
}
