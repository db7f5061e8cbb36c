//! MySQL-backed store.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::{debug, error};

use super::{
    AccountStore, AccountUpdate, BalanceStore, CatalogStore, Debit, LeaveStore, LeaveTypeUpdate,
    NewAccount, NewLeaveRequest, NewLeaveType, NotificationStore, StoreError, StoreResult,
    TokenStore, Transition,
};
use crate::model::{
    balance::LeaveBalance,
    leave_request::{LeaveAttachment, LeaveQuery, LeaveRecord, LeaveRequest, LeaveStatus},
    leave_type::LeaveType,
    notification::Notification,
    profile::{Profile, department_for, employee_code},
    role::Role,
    token::{PasswordResetToken, RefreshToken},
    user::{Account, User},
};

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn parse<T: FromStr>(value: &str, column: &str) -> StoreResult<T> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("{column} = {value:?}")))
}

/// Maps duplicate-key failures onto the offending field.
fn unique_violation(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            let key = message.rsplit("for key").next().unwrap_or(message);
            let field = ["email", "id_number", "username", "employee_id"]
                .into_iter()
                .find(|f| key.contains(f))
                .unwrap_or("record");
            return StoreError::Conflict(field);
        }
    }
    StoreError::Database(e)
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
}

/// `WHERE` clause shared by the leave listing and its count.
fn leave_filter(query: &LeaveQuery) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND r.user_id = ?");
        args.push(FilterValue::U64(user_id));
    }
    if let Some(status) = query.status {
        where_sql.push_str(" AND r.status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }
    if let Some(level) = query.approval_level {
        where_sql.push_str(" AND r.approval_level = ?");
        args.push(FilterValue::Str(level.to_string()));
    }
    if let Some(department) = &query.department {
        where_sql.push_str(" AND p.department = ?");
        args.push(FilterValue::Str(department.clone()));
    }
    if let Some(name) = &query.employee_name {
        where_sql.push_str(" AND (u.first_name LIKE ? OR u.last_name LIKE ?)");
        let like = format!("%{}%", name);
        args.push(FilterValue::Str(like.clone()));
        args.push(FilterValue::Str(like));
    }

    (where_sql, args)
}

const ACCOUNT_SELECT: &str = r#"
    SELECT
        u.id AS user_id, u.username, u.first_name, u.last_name, u.email,
        u.password, u.created_at,
        p.id AS profile_id, p.employee_id, p.id_number, p.phone_number,
        p.gender, p.department, p.role, p.profile_photo
    FROM users u
    JOIN profiles p ON p.user_id = u.id
"#;

#[derive(FromRow)]
struct AccountRow {
    user_id: u64,
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    created_at: DateTime<Utc>,
    profile_id: u64,
    employee_id: String,
    id_number: String,
    phone_number: String,
    gender: String,
    department: Option<String>,
    role: String,
    profile_photo: Option<String>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> StoreResult<Self> {
        Ok(Account {
            profile: Profile {
                id: row.profile_id,
                user_id: row.user_id,
                employee_id: row.employee_id,
                id_number: row.id_number,
                phone_number: row.phone_number,
                gender: parse(&row.gender, "profiles.gender")?,
                department: row.department,
                role: parse(&row.role, "profiles.role")?,
                profile_photo: row.profile_photo,
            },
            user: User {
                id: row.user_id,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                password: row.password,
                created_at: row.created_at,
            },
        })
    }
}

#[derive(FromRow)]
struct LeaveTypeRow {
    id: u64,
    name: String,
    default_days: i32,
    gender: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeaveTypeRow> for LeaveType {
    type Error = StoreError;

    fn try_from(row: LeaveTypeRow) -> StoreResult<Self> {
        Ok(LeaveType {
            id: row.id,
            name: row.name,
            default_days: row.default_days,
            gender: parse(&row.gender, "leave_types.gender")?,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LEAVE_REQUEST_COLUMNS: &str = r#"
    r.id, r.user_id, r.leave_type_id, r.other_leave_type, r.start_date,
    r.end_date, r.reason, r.status, r.approval_level,
    r.line_manager_approval_date, r.coo_approval_date, r.ceo_approval_date,
    r.rejection_reason, r.created_at
"#;

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    user_id: u64,
    leave_type_id: Option<u64>,
    other_leave_type: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    status: String,
    approval_level: String,
    line_manager_approval_date: Option<DateTime<Utc>>,
    coo_approval_date: Option<DateTime<Utc>>,
    ceo_approval_date: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRequestRow) -> StoreResult<Self> {
        Ok(LeaveRequest {
            id: row.id,
            user_id: row.user_id,
            leave_type_id: row.leave_type_id,
            other_leave_type: row.other_leave_type,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status: parse(&row.status, "leave_requests.status")?,
            approval_level: parse(&row.approval_level, "leave_requests.approval_level")?,
            line_manager_approval_date: row.line_manager_approval_date,
            coo_approval_date: row.coo_approval_date,
            ceo_approval_date: row.ceo_approval_date,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct LeaveRecordRow {
    #[sqlx(flatten)]
    request: LeaveRequestRow,
    first_name: String,
    last_name: String,
    employee_code: String,
    department: Option<String>,
    leave_type_name: Option<String>,
}

#[derive(FromRow)]
struct BalanceRow {
    leave_type_id: u64,
    leave_type_name: String,
    allowed_days: i32,
    days_taken: i32,
}

#[derive(FromRow)]
struct AttachmentRow {
    id: u64,
    leave_request_id: u64,
    file_name: String,
    file_path: String,
    uploaded_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct NotificationRow {
    id: u64,
    user_id: u64,
    message: String,
    is_read: bool,
    link: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            message: row.message,
            is_read: row.is_read,
            link: row.link,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ResetTokenRow {
    token: String,
    user_id: u64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_used: bool,
}

#[derive(FromRow)]
struct RefreshTokenRow {
    jti: String,
    user_id: u64,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

async fn debit_tracker(tx: &mut Transaction<'_, MySql>, debit: Debit) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_leave_trackers (user_id, leave_type_id, days_taken)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE days_taken = days_taken + VALUES(days_taken)
        "#,
    )
    .bind(debit.user_id)
    .bind(debit.leave_type_id)
    .bind(debit.days)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

impl MySqlStore {
    async fn account_where(&self, clause: &str, value: FilterValue) -> StoreResult<Option<Account>> {
        let sql = format!("{ACCOUNT_SELECT} WHERE {clause} LIMIT 1");
        let query = sqlx::query_as::<_, AccountRow>(&sql);
        let query = match value {
            FilterValue::U64(v) => query.bind(v),
            FilterValue::Str(s) => query.bind(s),
        };
        query
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn fetch_leave_request(&self, id: u64) -> StoreResult<LeaveRequest> {
        self.find_leave_request(id)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

impl AccountStore for MySqlStore {
    async fn create_account(&self, new: NewAccount, leave_types: &[LeaveType]) -> StoreResult<Account> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (username, first_name, last_name, email, password)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.username)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .execute(&mut *tx)
        .await
        .map_err(unique_violation)?
        .last_insert_id();

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, employee_id, id_number, phone_number, gender, role)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(employee_code(user_id))
        .bind(&new.id_number)
        .bind(&new.phone_number)
        .bind(new.gender.as_ref())
        .bind(Role::Staff.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(unique_violation)?;

        for leave_type in leave_types {
            sqlx::query(
                "INSERT INTO user_leave_allowances (user_id, leave_type_id, allowed_days) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(leave_type.id)
            .bind(leave_type.default_days)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO user_leave_trackers (user_id, leave_type_id, days_taken) VALUES (?, ?, 0)",
            )
            .bind(user_id)
            .bind(leave_type.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(user_id, "Account created");

        self.find_account(user_id).await?.ok_or(StoreError::NotFound)
    }

    async fn find_account(&self, user_id: u64) -> StoreResult<Option<Account>> {
        self.account_where("u.id = ?", FilterValue::U64(user_id)).await
    }

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        self.account_where("u.username = ?", FilterValue::Str(username.to_string()))
            .await
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.account_where("u.email = ?", FilterValue::Str(email.to_string()))
            .await
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let sql = format!("{ACCOUNT_SELECT} ORDER BY u.id");
        sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn update_account(&self, user_id: u64, update: AccountUpdate) -> StoreResult<Account> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users
            SET username = ?, first_name = ?, last_name = ?, email = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.username)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(unique_violation)?;

        sqlx::query(
            r#"
            UPDATE profiles
            SET gender = ?, phone_number = ?, profile_photo = COALESCE(?, profile_photo)
            WHERE user_id = ?
            "#,
        )
        .bind(update.gender.as_ref())
        .bind(&update.phone_number)
        .bind(&update.profile_photo)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_account(user_id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_employment(
        &self,
        user_id: u64,
        role: Role,
        department: Option<String>,
    ) -> StoreResult<Account> {
        sqlx::query("UPDATE profiles SET role = ?, department = ? WHERE user_id = ?")
            .bind(role.as_ref())
            .bind(department_for(role, department))
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.find_account(user_id).await?.ok_or(StoreError::NotFound)
    }

    async fn delete_account(&self, user_id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_approver(&self, role: Role, department: Option<&str>) -> StoreResult<Option<Account>> {
        let mut sql = format!("{ACCOUNT_SELECT} WHERE p.role = ?");
        if department.is_some() {
            sql.push_str(" AND p.department = ?");
        }
        sql.push_str(" ORDER BY p.id LIMIT 1");

        let mut query = sqlx::query_as::<_, AccountRow>(&sql).bind(role.as_ref());
        if let Some(department) = department {
            query = query.bind(department);
        }
        query
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }
}

impl CatalogStore for MySqlStore {
    async fn list_leave_types(&self) -> StoreResult<Vec<LeaveType>> {
        sqlx::query_as::<_, LeaveTypeRow>("SELECT * FROM leave_types ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveType::try_from)
            .collect()
    }

    async fn find_leave_type(&self, id: u64) -> StoreResult<Option<LeaveType>> {
        sqlx::query_as::<_, LeaveTypeRow>("SELECT * FROM leave_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveType::try_from)
            .transpose()
    }

    async fn create_leave_type(&self, new: NewLeaveType) -> StoreResult<LeaveType> {
        let id = sqlx::query(
            r#"
            INSERT INTO leave_types (name, default_days, gender, description, is_active)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(new.default_days)
        .bind(new.gender.as_ref())
        .bind(&new.description)
        .bind(new.is_active)
        .execute(&self.pool)
        .await?
        .last_insert_id();

        self.find_leave_type(id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_leave_type(&self, id: u64, update: LeaveTypeUpdate) -> StoreResult<LeaveType> {
        let current = self.find_leave_type(id).await?.ok_or(StoreError::NotFound)?;

        sqlx::query(
            r#"
            UPDATE leave_types
            SET name = ?, default_days = ?, gender = ?, description = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(update.name.unwrap_or(current.name))
        .bind(update.default_days.unwrap_or(current.default_days))
        .bind(update.gender.unwrap_or(current.gender).as_ref())
        .bind(update.description.or(current.description))
        .bind(update.is_active.unwrap_or(current.is_active))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_leave_type(id).await?.ok_or(StoreError::NotFound)
    }
}

impl BalanceStore for MySqlStore {
    async fn ensure_allowance(&self, user_id: u64, leave_type: &LeaveType) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT IGNORE INTO user_leave_allowances (user_id, leave_type_id, allowed_days) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(leave_type.id)
        .bind(leave_type.default_days)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn ensure_tracker(&self, user_id: u64, leave_type_id: u64) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT IGNORE INTO user_leave_trackers (user_id, leave_type_id, days_taken) VALUES (?, ?, 0)",
        )
        .bind(user_id)
        .bind(leave_type_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn balances(&self, user_id: u64) -> StoreResult<Vec<LeaveBalance>> {
        let rows = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT
                t.id AS leave_type_id,
                t.name AS leave_type_name,
                a.allowed_days,
                k.days_taken
            FROM user_leave_allowances a
            JOIN user_leave_trackers k
                ON k.user_id = a.user_id AND k.leave_type_id = a.leave_type_id
            JOIN leave_types t ON t.id = a.leave_type_id
            WHERE a.user_id = ?
            ORDER BY t.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LeaveBalance::new(r.leave_type_id, r.leave_type_name, r.allowed_days, r.days_taken))
            .collect())
    }

    async fn balance(&self, user_id: u64, leave_type_id: u64) -> StoreResult<Option<LeaveBalance>> {
        Ok(self
            .balances(user_id)
            .await?
            .into_iter()
            .find(|b| b.leave_type_id == leave_type_id))
    }

    async fn set_allowance(&self, user_id: u64, leave_type_id: u64, allowed_days: i32) -> StoreResult<()> {
        let rows = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_leave_allowances WHERE user_id = ? AND leave_type_id = ?",
        )
        .bind(user_id)
        .bind(leave_type_id)
        .fetch_one(&self.pool)
        .await?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            "UPDATE user_leave_allowances SET allowed_days = ? WHERE user_id = ? AND leave_type_id = ?",
        )
        .bind(allowed_days)
        .bind(user_id)
        .bind(leave_type_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl LeaveStore for MySqlStore {
    async fn insert_leave_request(&self, new: NewLeaveRequest) -> StoreResult<LeaveRequest> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (user_id, leave_type_id, other_leave_type, start_date, end_date,
                 reason, status, approval_level, ceo_approval_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(new.leave_type_id)
        .bind(&new.other_leave_type)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(&new.reason)
        .bind(new.status.as_ref())
        .bind(new.approval_level.as_ref())
        .bind(new.ceo_approval_date)
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        for attachment in &new.attachments {
            sqlx::query(
                "INSERT INTO leave_attachments (leave_request_id, file_name, file_path) VALUES (?, ?, ?)",
            )
            .bind(id)
            .bind(&attachment.file_name)
            .bind(&attachment.file_path)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(debit) = new.debit {
            debit_tracker(&mut tx, debit).await?;
        }

        tx.commit().await?;
        self.fetch_leave_request(id).await
    }

    async fn find_leave_request(&self, id: u64) -> StoreResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {LEAVE_REQUEST_COLUMNS} FROM leave_requests r WHERE r.id = ?");
        sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn list_leave_requests(&self, query: &LeaveQuery) -> StoreResult<Vec<LeaveRecord>> {
        let (mut clause, mut args) = leave_filter(query);
        clause.push_str(" ORDER BY r.created_at DESC, r.id DESC");
        if let Some(limit) = query.limit {
            clause.push_str(" LIMIT ? OFFSET ?");
            args.push(FilterValue::U64(limit));
            args.push(FilterValue::U64(query.offset));
        }

        let sql = format!(
            r#"
            SELECT {LEAVE_REQUEST_COLUMNS},
                u.first_name, u.last_name,
                p.employee_id AS employee_code, p.department,
                t.name AS leave_type_name
            FROM leave_requests r
            JOIN users u ON u.id = r.user_id
            JOIN profiles p ON p.user_id = r.user_id
            LEFT JOIN leave_types t ON t.id = r.leave_type_id
            {clause}
            "#
        );
        debug!(sql = %sql, "Listing leave requests");

        let mut data_q = sqlx::query_as::<_, LeaveRecordRow>(&sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }

        data_q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch leave list");
                StoreError::from(e)
            })?
            .into_iter()
            .map(|row| -> StoreResult<LeaveRecord> {
                let request = LeaveRequest::try_from(row.request)?;
                Ok(LeaveRecord {
                    total_days: request.total_days(),
                    request,
                    applicant_name: format!("{} {}", row.first_name, row.last_name)
                        .trim()
                        .to_string(),
                    employee_id: row.employee_code,
                    department: row.department,
                    leave_type_name: row.leave_type_name,
                })
            })
            .collect()
    }

    async fn count_leave_requests(&self, query: &LeaveQuery) -> StoreResult<u64> {
        let (where_sql, args) = leave_filter(query);
        let sql = format!(
            r#"
            SELECT COUNT(*)
            FROM leave_requests r
            JOIN users u ON u.id = r.user_id
            JOIN profiles p ON p.user_id = r.user_id
            {where_sql}
            "#
        );

        let mut count_q = sqlx::query_scalar::<_, i64>(&sql);
        for arg in args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(v),
                FilterValue::Str(s) => count_q.bind(s),
            };
        }

        let total = count_q.fetch_one(&self.pool).await.map_err(|e| {
            error!(error = %e, "Failed to count leave requests");
            StoreError::from(e)
        })?;
        Ok(total as u64)
    }

    async fn list_attachments(&self, leave_request_id: u64) -> StoreResult<Vec<LeaveAttachment>> {
        let rows = sqlx::query_as::<_, AttachmentRow>(
            "SELECT * FROM leave_attachments WHERE leave_request_id = ? ORDER BY id",
        )
        .bind(leave_request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LeaveAttachment {
                id: r.id,
                leave_request_id: r.leave_request_id,
                file_name: r.file_name,
                file_path: r.file_path,
                uploaded_at: r.uploaded_at,
            })
            .collect())
    }

    async fn apply_transition(&self, id: u64, transition: &Transition) -> StoreResult<LeaveRequest> {
        let mut tx = self.pool.begin().await?;

        let mut sql = String::from(
            "UPDATE leave_requests SET approval_level = ?, status = ?, rejection_reason = COALESCE(?, rejection_reason)",
        );
        if let Some((stamp, _)) = transition.stamp {
            sql.push_str(&format!(", {} = ?", stamp.column()));
        }
        sql.push_str(" WHERE id = ? AND status = ? AND approval_level = ?");

        let mut query = sqlx::query(&sql)
            .bind(transition.to_level.as_ref())
            .bind(transition.status.as_ref())
            .bind(&transition.rejection_reason);
        if let Some((_, at)) = transition.stamp {
            query = query.bind(at);
        }
        let result = query
            .bind(id)
            .bind(LeaveStatus::Pending.as_ref())
            .bind(transition.from_level.as_ref())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return match self.find_leave_request(id).await? {
                Some(_) => Err(StoreError::Stale),
                None => Err(StoreError::NotFound),
            };
        }

        if let Some(debit) = transition.debit {
            debit_tracker(&mut tx, debit).await?;
        }

        tx.commit().await?;
        self.fetch_leave_request(id).await
    }
}

impl NotificationStore for MySqlStore {
    async fn insert_notification(
        &self,
        user_id: u64,
        message: &str,
        link: Option<&str>,
    ) -> StoreResult<Notification> {
        let id = sqlx::query("INSERT INTO notifications (user_id, message, link) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(message)
            .bind(link)
            .execute(&self.pool)
            .await?
            .last_insert_id();

        sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map(Notification::from)
            .map_err(StoreError::from)
    }

    async fn list_notifications(&self, user_id: u64) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(&self, user_id: u64, id: u64) -> StoreResult<Option<Notification>> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Notification::from))
    }

    async fn mark_all_notifications_read(&self, user_id: u64) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = ? AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl TokenStore for MySqlStore {
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (user_id, token, created_at, expires_at, is_used)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.is_used)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            "SELECT token, user_id, created_at, expires_at, is_used FROM auth_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PasswordResetToken {
            token: r.token,
            user_id: r.user_id,
            created_at: r.created_at,
            expires_at: r.expires_at,
            is_used: r.is_used,
        }))
    }

    async fn reset_password(&self, token: &str, password_hash: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT user_id FROM auth_tokens
            WHERE token = ? AND is_used = FALSE AND expires_at > ?
            FOR UPDATE
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE auth_tokens SET is_used = TRUE WHERE user_id = ? AND is_used = FALSE")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, jti, expires_at, revoked) VALUES (?, ?, ?, ?)",
        )
        .bind(token.user_id)
        .bind(&token.jti)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> StoreResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT jti, user_id, expires_at, revoked FROM refresh_tokens WHERE jti = ?",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RefreshToken {
            jti: r.jti,
            user_id: r.user_id,
            expires_at: r.expires_at,
            revoked: r.revoked,
        }))
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{leave_request::ApprovalLevel, leave_type::LeaveGender, profile::Gender};
    use crate::store::{ApprovalStamp, NewLeaveType};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn new_account(username: &str, email: &str, id_number: &str) -> NewAccount {
        NewAccount {
            username: username.into(),
            first_name: username.into(),
            last_name: "Otieno".into(),
            email: email.into(),
            password_hash: "x".into(),
            id_number: id_number.into(),
            phone_number: "0700000000".into(),
            gender: Gender::Female,
        }
    }

    async fn annual(store: &MySqlStore) -> LeaveType {
        store
            .list_leave_types()
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.name == "Annual")
            .unwrap()
    }

    fn pending(user_id: u64, leave_type_id: u64, days: i64) -> NewLeaveRequest {
        let start_date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        NewLeaveRequest {
            user_id,
            leave_type_id: Some(leave_type_id),
            other_leave_type: None,
            start_date,
            end_date: start_date + Duration::days(days - 1),
            reason: "Family".into(),
            status: LeaveStatus::Pending,
            approval_level: ApprovalLevel::LineManager,
            ceo_approval_date: None,
            attachments: vec![],
            debit: None,
        }
    }

    fn complete(from_level: ApprovalLevel, debit: Debit) -> Transition {
        Transition {
            from_level,
            to_level: ApprovalLevel::Completed,
            status: LeaveStatus::Approved,
            stamp: Some((ApprovalStamp::Ceo, Utc::now())),
            rejection_reason: None,
            debit: Some(debit),
        }
    }

    async fn days_taken(pool: &MySqlPool, user_id: u64, leave_type_id: u64) -> Option<i32> {
        sqlx::query_scalar("SELECT days_taken FROM user_leave_trackers WHERE user_id = ? AND leave_type_id = ?")
            .bind(user_id)
            .bind(leave_type_id)
            .fetch_optional(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn migration_seeds_the_standard_catalog(pool: MySqlPool) {
        let store = MySqlStore::new(pool);

        let seeded: Vec<(String, i32, LeaveGender)> = store
            .list_leave_types()
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.name, t.default_days, t.gender))
            .collect();

        assert_eq!(
            seeded,
            vec![
                ("Annual".to_string(), 21, LeaveGender::All),
                ("Sick".to_string(), 10, LeaveGender::All),
                ("Maternity".to_string(), 90, LeaveGender::Female),
                ("Paternity".to_string(), 14, LeaveGender::Male),
            ]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn duplicate_keys_name_the_offending_field(pool: MySqlPool) {
        let store = MySqlStore::new(pool);
        store
            .create_account(new_account("amina", "amina@example.com", "111"), &[])
            .await
            .unwrap();

        let err = store
            .create_account(new_account("amina2", "amina@example.com", "222"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));

        let err = store
            .create_account(new_account("amina", "other@example.com", "333"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("username")));

        let err = store
            .create_account(new_account("amina3", "third@example.com", "111"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("id_number")));

        // the failed profile insert rolled its user row back
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
        assert!(store.find_account_by_username("amina3").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn ensure_rows_report_creation_once(pool: MySqlPool) {
        let store = MySqlStore::new(pool);
        let annual = annual(&store).await;
        let user = store
            .create_account(new_account("amina", "amina@example.com", "111"), &[])
            .await
            .unwrap()
            .user;

        assert!(store.ensure_allowance(user.id, &annual).await.unwrap());
        assert!(!store.ensure_allowance(user.id, &annual).await.unwrap());
        assert!(store.ensure_tracker(user.id, annual.id).await.unwrap());
        assert!(!store.ensure_tracker(user.id, annual.id).await.unwrap());

        store.set_allowance(user.id, annual.id, 30).await.unwrap();
        let balance = store.balance(user.id, annual.id).await.unwrap().unwrap();
        assert_eq!((balance.allowed_days, balance.remaining_days), (30, 30));

        // a missing allowance is not created by an adjustment
        let err = store.set_allowance(user.id, annual.id + 100, 5).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn transition_is_guarded_and_debits_in_the_same_write(pool: MySqlPool) {
        let store = MySqlStore::new(pool.clone());
        let annual = annual(&store).await;
        let user = store
            .create_account(new_account("amina", "amina@example.com", "111"), &[annual.clone()])
            .await
            .unwrap()
            .user;

        let first = store.insert_leave_request(pending(user.id, annual.id, 5)).await.unwrap();
        let second = store.insert_leave_request(pending(user.id, annual.id, 2)).await.unwrap();

        let debit = |days| Debit {
            user_id: user.id,
            leave_type_id: annual.id,
            days,
        };

        let done = store
            .apply_transition(first.id, &complete(ApprovalLevel::LineManager, debit(5)))
            .await
            .unwrap();
        assert_eq!(done.status, LeaveStatus::Approved);
        assert!(done.ceo_approval_date.is_some());
        assert_eq!(days_taken(&pool, user.id, annual.id).await, Some(5));

        // replaying the same step matches no row and debits nothing
        let err = store
            .apply_transition(first.id, &complete(ApprovalLevel::LineManager, debit(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Stale));
        assert_eq!(days_taken(&pool, user.id, annual.id).await, Some(5));

        store
            .apply_transition(second.id, &complete(ApprovalLevel::LineManager, debit(2)))
            .await
            .unwrap();
        assert_eq!(days_taken(&pool, user.id, annual.id).await, Some(7));

        let err = store
            .apply_transition(second.id + 100, &complete(ApprovalLevel::LineManager, debit(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn debit_creates_a_missing_tracker(pool: MySqlPool) {
        let store = MySqlStore::new(pool.clone());
        let annual = annual(&store).await;
        let user = store
            .create_account(new_account("amina", "amina@example.com", "111"), &[])
            .await
            .unwrap()
            .user;
        let request = store.insert_leave_request(pending(user.id, annual.id, 3)).await.unwrap();

        let debit = Debit {
            user_id: user.id,
            leave_type_id: annual.id,
            days: 3,
        };
        store
            .apply_transition(request.id, &complete(ApprovalLevel::LineManager, debit))
            .await
            .unwrap();

        assert_eq!(days_taken(&pool, user.id, annual.id).await, Some(3));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn listing_pages_in_sql_and_counts_every_match(pool: MySqlPool) {
        let store = MySqlStore::new(pool);
        let annual = annual(&store).await;
        let amina = store
            .create_account(new_account("amina", "amina@example.com", "111"), &[])
            .await
            .unwrap()
            .user;
        let brian = store
            .create_account(new_account("brian", "brian@example.com", "222"), &[])
            .await
            .unwrap()
            .user;

        let mut ids = Vec::new();
        for user_id in [amina.id, amina.id, brian.id] {
            ids.push(store.insert_leave_request(pending(user_id, annual.id, 1)).await.unwrap().id);
        }

        let page = |limit, offset| LeaveQuery {
            limit: Some(limit),
            offset,
            ..Default::default()
        };

        let first: Vec<u64> = store
            .list_leave_requests(&page(2, 0))
            .await
            .unwrap()
            .iter()
            .map(|r| r.request.id)
            .collect();
        assert_eq!(first, vec![ids[2], ids[1]]);

        let rest = store.list_leave_requests(&page(2, 2)).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].request.id, ids[0]);
        assert_eq!(rest[0].leave_type_name.as_deref(), Some("Annual"));

        assert!(store.list_leave_requests(&page(100, u64::MAX)).await.unwrap().is_empty());
        assert_eq!(store.count_leave_requests(&page(1, 0)).await.unwrap(), 3);

        let by_name = LeaveQuery {
            employee_name: Some("bri".into()),
            ..Default::default()
        };
        assert_eq!(store.count_leave_requests(&by_name).await.unwrap(), 1);
        assert_eq!(store.list_leave_requests(&by_name).await.unwrap()[0].request.user_id, brian.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn retiring_a_leave_type_keeps_its_requests(pool: MySqlPool) {
        let store = MySqlStore::new(pool.clone());
        let study = store
            .create_leave_type(NewLeaveType {
                name: "Study".into(),
                default_days: 5,
                gender: LeaveGender::All,
                description: None,
                is_active: true,
            })
            .await
            .unwrap();
        let user = store
            .create_account(new_account("amina", "amina@example.com", "111"), &[study.clone()])
            .await
            .unwrap()
            .user;
        let request = store.insert_leave_request(pending(user.id, study.id, 2)).await.unwrap();

        sqlx::query("DELETE FROM leave_types WHERE id = ?")
            .bind(study.id)
            .execute(&pool)
            .await
            .unwrap();

        let kept = store.find_leave_request(request.id).await.unwrap().unwrap();
        assert_eq!(kept.leave_type_id, None);
        assert_eq!(kept.reason, "Family");
        let listed = store.list_leave_requests(&LeaveQuery::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].leave_type_name, None);
        // the allowance rows go with the type
        assert!(store.balances(user.id).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reset_consumes_every_outstanding_token(pool: MySqlPool) {
        let store = MySqlStore::new(pool);
        let user = store
            .create_account(new_account("amina", "amina@example.com", "111"), &[])
            .await
            .unwrap()
            .user;
        let now = Utc::now();

        let first = PasswordResetToken::issue(user.id, now);
        let second = PasswordResetToken::issue(user.id, now);
        let mut stale = PasswordResetToken::issue(user.id, now - Duration::hours(2));
        stale.expires_at = now - Duration::hours(1);
        for token in [&first, &second, &stale] {
            store.insert_reset_token(token).await.unwrap();
        }

        assert!(!store.reset_password(&stale.token, "old", now).await.unwrap());
        assert!(store.reset_password(&first.token, "new-hash", now).await.unwrap());
        assert!(!store.reset_password(&second.token, "other", now).await.unwrap());
        assert!(!store.reset_password(&first.token, "again", now).await.unwrap());

        let account = store.find_account(user.id).await.unwrap().unwrap();
        assert_eq!(account.user.password, "new-hash");
        assert!(store.find_reset_token(&second.token).await.unwrap().unwrap().is_used);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn refresh_tokens_revoke_once(pool: MySqlPool) {
        let store = MySqlStore::new(pool);
        let user = store
            .create_account(new_account("amina", "amina@example.com", "111"), &[])
            .await
            .unwrap()
            .user;

        store
            .insert_refresh_token(&RefreshToken {
                jti: "jti-1".into(),
                user_id: user.id,
                expires_at: Utc::now() + Duration::days(7),
                revoked: false,
            })
            .await
            .unwrap();

        assert!(store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(!store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(store.find_refresh_token("jti-1").await.unwrap().unwrap().revoked);
        assert!(!store.revoke_refresh_token("unknown").await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn notifications_are_read_only_by_their_owner(pool: MySqlPool) {
        let store = MySqlStore::new(pool);
        let amina = store
            .create_account(new_account("amina", "amina@example.com", "111"), &[])
            .await
            .unwrap()
            .user;
        let brian = store
            .create_account(new_account("brian", "brian@example.com", "222"), &[])
            .await
            .unwrap()
            .user;

        let first = store.insert_notification(amina.id, "One", None).await.unwrap();
        store.insert_notification(amina.id, "Two", Some("/api/dashboard")).await.unwrap();

        assert!(store.mark_notification_read(brian.id, first.id).await.unwrap().is_none());
        assert!(store.mark_notification_read(amina.id, first.id).await.unwrap().unwrap().is_read);
        assert_eq!(store.mark_all_notifications_read(amina.id).await.unwrap(), 1);

        let listed = store.list_notifications(amina.id).await.unwrap();
        assert_eq!(listed[0].message, "Two");
        assert!(listed.iter().all(|n| n.is_read));
    }
}
