use crate::api::{current_account, require_reviewer};
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::leave_request::{LeaveAttachment, LeaveQuery, LeaveRecord, LeaveRequest, LeaveStatus};
use crate::state::AppState;
use crate::store::{NewAttachment, Store};
use crate::workflow::{LeaveApplication, transition::queue_level};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct AttachmentRef {
    #[schema(example = "doctor-note.pdf")]
    pub file_name: String,
    #[schema(example = "leave_attachments/doctor-note.pdf")]
    pub file_path: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Catalog leave type; omit to use `other_leave_type`
    #[schema(example = 1)]
    pub leave_type_id: Option<u64>,
    #[schema(example = json!(null))]
    pub other_leave_type: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[schema(example = "Family visit")]
    pub reason: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct RejectLeave {
    #[schema(example = "Peak season")]
    pub rejection_reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LeaveFilter {
    #[schema(example = "Pending")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = "amina")]
    /// Case-insensitive match on first or last name
    pub employee: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 20)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRecord>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveDetail {
    pub request: LeaveRequest,
    pub attachments: Vec<LeaveAttachment>,
}

/* =========================
Apply for leave
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "No department, bad dates, unavailable type or insufficient balance",
         body = Object,
         example = json!({"error": "You only have 3 days remaining for Sick leave."})),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn apply_leave<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    let payload = payload.into_inner();

    let application = LeaveApplication {
        leave_type_id: payload.leave_type_id,
        other_leave_type: payload.other_leave_type,
        start_date: payload.start_date,
        end_date: payload.end_date,
        reason: payload.reason,
        attachments: payload
            .attachments
            .into_iter()
            .map(|a| NewAttachment {
                file_name: a.file_name,
                file_path: a.file_path,
            })
            .collect(),
    };

    let request = state.workflow().submit(&account, application, Utc::now()).await?;
    Ok(HttpResponse::Created().json(request))
}

/// The caller's own requests, newest first.
#[utoipa::path(
    get,
    path = "/api/leave",
    responses(
        (status = 200, description = "Own leave requests", body = Vec<LeaveRecord>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_leaves<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let records = state
        .store
        .list_leave_requests(&LeaveQuery {
            user_id: Some(auth.user_id),
            ..Default::default()
        })
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/leave/balances",
    responses(
        (status = 200, description = "Balances for the leave types offered to the caller",
         body = Vec<crate::model::balance::LeaveBalance>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balances<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    let balances = state.workflow().balances(&account.profile).await?;
    Ok(HttpResponse::Ok().json(balances))
}

/// All leave requests, for anyone above Staff.
#[utoipa::path(
    get,
    path = "/api/leave/records",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave records", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_records<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_reviewer(&account)?;

    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);

    let filter = LeaveQuery {
        status: query.status,
        employee_name: query
            .employee
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        limit: Some(per_page),
        offset: (page - 1).saturating_mul(per_page),
        ..Default::default()
    };

    let total = state.store.count_leave_requests(&filter).await?;
    let data = state.store.list_leave_requests(&filter).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request with attachments", body = LeaveDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found",
         body = Object, example = json!({"error": "Leave request not found."}))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    let leave_id = path.into_inner();

    let request = state
        .store
        .find_leave_request(leave_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave request not found."))?;

    if request.user_id != account.user.id {
        require_reviewer(&account)?;
    }

    let attachments = state.store.list_attachments(leave_id).await?;
    Ok(HttpResponse::Ok().json(LeaveDetail {
        request,
        attachments,
    }))
}

/// Pending requests waiting on the caller's level.
#[utoipa::path(
    get,
    path = "/api/approvals",
    responses(
        (status = 200, description = "Approval queue", body = Vec<LeaveRecord>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff have no approval privileges")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approval_queue<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_reviewer(&account)
        .map_err(|_| ApiError::forbidden("Access Denied: You do not have approval privileges."))?;

    let Some(level) = queue_level(account.profile.role) else {
        return Ok(HttpResponse::Ok().json(Vec::<LeaveRecord>::new()));
    };

    // first-level review stays inside the manager's department
    let department = if level.approver().is_some_and(|r| r.has_department()) {
        match &account.profile.department {
            Some(d) => Some(d.clone()),
            None => return Ok(HttpResponse::Ok().json(Vec::<LeaveRecord>::new())),
        }
    } else {
        None
    };

    let pending = state
        .store
        .list_leave_requests(&LeaveQuery {
            status: Some(LeaveStatus::Pending),
            approval_level: Some(level),
            department,
            ..Default::default()
        })
        .await?;

    Ok(HttpResponse::Ok().json(pending))
}

/* =========================
Approve leave at the caller's level
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    responses(
        (status = 200, description = "Request advanced to the next level or completed", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller cannot approve leave"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Wrong level, already finalized or changed concurrently",
         body = Object,
         example = json!({"error": "This request is awaiting COO approval, not Line Manager."}))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    let leave_id = path.into_inner();

    let request = state.workflow().approve(&account, leave_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    request_body(content = RejectLeave, description = "Optional reason", content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller cannot reject leave"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already finalized or changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    path: web::Path<u64>,
    payload: Option<web::Json<RejectLeave>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    let leave_id = path.into_inner();
    let reason = payload.and_then(|p| p.into_inner().rejection_reason);

    let request = state.workflow().reject(&account, leave_id, reason).await?;
    Ok(HttpResponse::Ok().json(request))
}
