use crate::api::{current_account, require_executive};
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{
    balance::LeaveBalance,
    leave_request::{LeaveQuery, LeaveRecord, LeaveStatus},
    leave_type::LeaveType,
    user::Account,
};
use crate::state::AppState;
use crate::store::Store;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct Dashboard {
    pub account: Account,
    pub leave_requests: Vec<LeaveRecord>,
    pub balances: Vec<LeaveBalance>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminDashboard {
    pub employees: Vec<Account>,
    pub leave_types: Vec<LeaveType>,
    #[schema(example = 2)]
    pub pending_requests: u64,
}

/// Reconciles the caller's allowances, then returns requests and balances.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Own requests and balances", body = Dashboard),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;

    let balances = state.workflow().balances(&account.profile).await?;
    let leave_requests = state
        .store
        .list_leave_requests(&LeaveQuery {
            user_id: Some(account.user.id),
            ..Default::default()
        })
        .await?;

    Ok(HttpResponse::Ok().json(Dashboard {
        account,
        leave_requests,
        balances,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Directory and catalog overview", body = AdminDashboard),
        (status = 403, description = "Admin, CEO or COO only")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn admin_dashboard<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_executive(&account)?;

    let employees = state.store.list_accounts().await?;
    let leave_types = state.store.list_leave_types().await?;
    let pending_requests = state
        .store
        .count_leave_requests(&LeaveQuery {
            status: Some(LeaveStatus::Pending),
            ..Default::default()
        })
        .await?;

    Ok(HttpResponse::Ok().json(AdminDashboard {
        employees,
        leave_types,
        pending_requests,
    }))
}
