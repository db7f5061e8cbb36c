use crate::api::{current_account, require_admin};
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{leave_type::LeaveGender, role::Role};
use crate::state::AppState;
use crate::store::{LeaveTypeUpdate, NewLeaveType, Store};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeaveType {
    #[schema(example = "Compassionate")]
    pub name: String,
    #[schema(example = 5)]
    pub default_days: i32,
    #[serde(default)]
    pub gender: LeaveGender,
    pub description: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeaveType {
    pub name: Option<String>,
    pub default_days: Option<i32>,
    pub gender: Option<LeaveGender>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

fn check_fields(name: Option<&str>, default_days: Option<i32>) -> Result<(), ApiError> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::validation("Leave type name must not be empty."));
    }
    if default_days.is_some_and(|d| d < 0) {
        return Err(ApiError::validation("Default days cannot be negative."));
    }
    Ok(())
}

/// Admins see the whole catalog; everyone else sees what they can apply for.
#[utoipa::path(
    get,
    path = "/api/leave-types",
    responses(
        (status = 200, description = "Leave types", body = Vec<crate::model::leave_type::LeaveType>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn list_leave_types<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;

    let types = if account.profile.role == Role::Admin {
        state.store.list_leave_types().await?
    } else {
        state.workflow().applicable_types(&account.profile).await?
    };
    Ok(HttpResponse::Ok().json(types))
}

#[utoipa::path(
    post,
    path = "/api/leave-types",
    request_body = CreateLeaveType,
    responses(
        (status = 201, description = "Leave type created", body = crate::model::leave_type::LeaveType),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn create_leave_type<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    payload: web::Json<CreateLeaveType>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_admin(&account)?;

    let payload = payload.into_inner();
    check_fields(Some(&payload.name), Some(payload.default_days))?;

    let created = state
        .store
        .create_leave_type(NewLeaveType {
            name: payload.name.trim().to_string(),
            default_days: payload.default_days,
            gender: payload.gender,
            description: payload.description,
            is_active: payload.is_active,
        })
        .await?;
    state.catalog.invalidate().await;

    info!(leave_type_id = created.id, name = %created.name, "Leave type created");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    put,
    path = "/api/leave-types/{leave_type_id}",
    params(("leave_type_id" = u64, Path, description = "Leave type to update")),
    request_body = UpdateLeaveType,
    responses(
        (status = 200, description = "Leave type updated", body = crate::model::leave_type::LeaveType),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn update_leave_type<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    path: web::Path<u64>,
    payload: web::Json<UpdateLeaveType>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    require_admin(&account)?;

    let leave_type_id = path.into_inner();
    let payload = payload.into_inner();
    check_fields(payload.name.as_deref(), payload.default_days)?;

    let updated = state
        .store
        .update_leave_type(
            leave_type_id,
            LeaveTypeUpdate {
                name: payload.name.map(|n| n.trim().to_string()),
                default_days: payload.default_days,
                gender: payload.gender,
                description: payload.description,
                is_active: payload.is_active,
            },
        )
        .await?;
    state.catalog.invalidate().await;

    info!(leave_type_id, "Leave type updated");
    Ok(HttpResponse::Ok().json(updated))
}
