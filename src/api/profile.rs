use crate::api::current_account;
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::profile::Gender;
use crate::state::AppState;
use crate::store::{AccountUpdate, Store, StoreError};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Gender,
    pub phone_number: String,
    /// Stored file reference; omit to keep the current photo
    pub profile_photo: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Own user and profile", body = crate::model::user::Account),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_profile<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    Ok(HttpResponse::Ok().json(account))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = crate::model::user::Account),
        (status = 400, description = "Empty fields or username/email taken"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_profile<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    payload: web::Json<UpdateProfile>,
) -> Result<HttpResponse, ApiError> {
    let account = current_account(&state, &auth).await?;
    let payload = payload.into_inner();

    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    if username.is_empty() || email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("A username and a valid email are required."));
    }

    let updated = state
        .store
        .update_account(
            account.user.id,
            AccountUpdate {
                username,
                first_name: payload.first_name.trim().to_string(),
                last_name: payload.last_name.trim().to_string(),
                email,
                gender: payload.gender,
                phone_number: payload.phone_number.trim().to_string(),
                profile_photo: payload.profile_photo,
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::Conflict(field) => {
                ApiError::validation(format!("This {field} is already in use."))
            }
            other => other.into(),
        })?;

    if updated.profile.gender != account.profile.gender {
        // newly applicable types need rows before the next balance check
        state.workflow().reconcile(&updated.profile).await?;
    }

    info!(user_id = updated.user.id, "Profile updated");
    Ok(HttpResponse::Ok().json(updated))
}
