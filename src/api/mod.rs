pub mod dashboard;
pub mod employee;
pub mod leave_request;
pub mod leave_type;
pub mod notification;
pub mod profile;

use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{role::Role, user::Account};
use crate::state::AppState;
use crate::store::Store;

/// Loads the caller's user and profile; a token without an account is 401.
pub(crate) async fn current_account<S: Store>(
    state: &AppState<S>,
    auth: &AuthUser,
) -> Result<Account, ApiError> {
    state
        .store
        .find_account(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("No profile found for this account.".into()))
}

/// Admin, CEO and COO.
pub(crate) fn require_executive(account: &Account) -> Result<(), ApiError> {
    if account.profile.role.is_executive() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin, CEO or COO only."))
    }
}

pub(crate) fn require_admin(account: &Account) -> Result<(), ApiError> {
    if account.profile.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin only."))
    }
}

/// Everyone above Staff.
pub(crate) fn require_reviewer(account: &Account) -> Result<(), ApiError> {
    if account.profile.role == Role::Staff {
        Err(ApiError::forbidden("You are not authorized to view this page."))
    } else {
        Ok(())
    }
}
