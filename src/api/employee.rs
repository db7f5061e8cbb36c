use crate::api::{current_account, require_admin, require_executive};
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{profile::department_for, role::Role};
use crate::state::AppState;
use crate::store::Store;
use crate::workflow::reconcile::reconcile_all;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployment {
    pub role: Role,
    /// Ignored for COO, CEO and Admin
    #[schema(example = "Finance")]
    pub department: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetAllowance {
    #[schema(example = 25)]
    pub allowed_days: i32,
}

#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "All employees with profiles", body = Vec<crate::model::user::Account>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin, CEO or COO only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_executive(&account)?;

    let employees = state.store.list_accounts().await?;
    Ok(HttpResponse::Ok().json(employees))
}

#[utoipa::path(
    put,
    path = "/api/employees/{user_id}/employment",
    params(("user_id" = u64, Path, description = "Employee user id")),
    request_body = UpdateEmployment,
    responses(
        (status = 200, description = "Role and department updated", body = crate::model::user::Account),
        (status = 403, description = "Admin, CEO or COO only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employment<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployment>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_executive(&account)?;

    let user_id = path.into_inner();
    let payload = payload.into_inner();
    let department = department_for(payload.role, payload.department);

    let updated = state
        .store
        .update_employment(user_id, payload.role, department)
        .await?;

    info!(
        user_id,
        role = %updated.profile.role,
        department = ?updated.profile.department,
        changed_by = account.user.id,
        "Employment updated"
    );
    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes an account. Anyone may delete their own; executives any.
#[utoipa::path(
    delete,
    path = "/api/accounts/{user_id}",
    params(("user_id" = u64, Path, description = "Account to delete")),
    responses(
        (status = 200, description = "Account deleted",
         body = Object, example = json!({"message": "Account deleted."})),
        (status = 403, description = "Not your account"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_account<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    let user_id = path.into_inner();

    if user_id != account.user.id {
        require_executive(&account)?;
    }

    if !state.store.delete_account(user_id).await? {
        return Err(ApiError::not_found("Account not found."));
    }

    info!(user_id, deleted_by = account.user.id, "Account deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Account deleted." })))
}

/// Creates missing allowance and tracker rows for every employee.
#[utoipa::path(
    post,
    path = "/api/admin/fix-allowances",
    responses(
        (status = 200, description = "Rows created",
         body = Object,
         example = json!({"fixed": 4, "message": "Fixed 4 missing leave allowance/tracker records."})),
        (status = 403, description = "Admin, CEO or COO only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn fix_allowances<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_executive(&account)?;

    let types = state.catalog.active(&state.store).await?;
    let fixed = reconcile_all(&state.store, &types).await?;

    info!(fixed, requested_by = account.user.id, "Allowance repair finished");
    Ok(HttpResponse::Ok().json(json!({
        "fixed": fixed,
        "message": format!("Fixed {fixed} missing leave allowance/tracker records."),
    })))
}

#[utoipa::path(
    put,
    path = "/api/employees/{user_id}/allowances/{leave_type_id}",
    params(
        ("user_id" = u64, Path, description = "Employee user id"),
        ("leave_type_id" = u64, Path, description = "Leave type")
    ),
    request_body = SetAllowance,
    responses(
        (status = 200, description = "Allowance updated",
         body = Object, example = json!({"message": "Allowance updated."})),
        (status = 400, description = "Negative allowance"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "No allowance row for this employee and type")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn set_allowance<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    path: web::Path<(u64, u64)>,
    payload: web::Json<SetAllowance>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_admin(&account)?;

    let (user_id, leave_type_id) = path.into_inner();
    if payload.allowed_days < 0 {
        return Err(ApiError::validation("Allowed days cannot be negative."));
    }

    state
        .store
        .set_allowance(user_id, leave_type_id, payload.allowed_days)
        .await?;

    info!(user_id, leave_type_id, allowed_days = payload.allowed_days, "Allowance updated");
    Ok(HttpResponse::Ok().json(json!({ "message": "Allowance updated." })))
}
