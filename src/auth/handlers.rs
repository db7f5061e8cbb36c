use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    error::ApiError,
    model::{
        token::{PasswordResetToken, RefreshToken},
        user::User,
    },
    models::{LoginReqDto, PasswordResetConfirm, PasswordResetReq, RegisterReq, TokenPair, TokenType},
    notify::{SUBJECT, mailer::OutgoingMail, templates},
    state::AppState,
    store::{NewAccount, Store, StoreError},
    workflow::reconcile::applicable,
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, instrument};

const INVALID_RESET_TOKEN: &str = "Invalid or expired token.";

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn internal(context: &str, e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, "{}", context);
    ApiError::Internal
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::validation("Password must not be empty."));
    }
    if password != confirm {
        return Err(ApiError::validation("Passwords do not match."));
    }
    Ok(())
}

/// Issues an access/refresh pair and stores the refresh token id.
async fn issue_tokens<S: Store>(state: &AppState<S>, user: &User) -> Result<TokenPair, ApiError> {
    let config = &state.config;

    let access_token = generate_access_token(
        user.id,
        user.username.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| internal("Failed to sign access token", e))?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        user.username.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| internal("Failed to sign refresh token", e))?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");

    state
        .store
        .insert_refresh_token(&RefreshToken {
            jti: refresh_claims.jti,
            user_id: user.id,
            expires_at: DateTime::<Utc>::from_timestamp(refresh_claims.exp as i64, 0)
                .unwrap_or_else(Utc::now),
            revoked: false,
        })
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created",
         body = Object,
         example = json!({
            "message": "Account created for amina! You can now login.",
            "employee_id": "EMP_1001"
         })
        ),
        (status = 400, description = "Validation failed or duplicate email, username or ID number")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(state, body), fields(username = %body.username))]
pub async fn register<S: Store>(
    body: web::Json<RegisterReq>,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_lowercase();

    let required = [
        &username,
        &body.first_name,
        &body.last_name,
        &email,
        &body.id_number,
        &body.phone_number,
    ];
    if required.iter().any(|v| v.trim().is_empty()) {
        return Err(ApiError::validation("All fields are required."));
    }
    if !email.contains('@') {
        return Err(ApiError::validation("Enter a valid email address."));
    }
    check_new_password(&body.password, &body.confirm_password)?;

    if state.store.find_account_by_email(&email).await?.is_some() {
        info!("Registration refused: email already registered");
        return Err(ApiError::validation(
            "This email is already registered. Please use a different one.",
        ));
    }

    let password_hash =
        hash_password(&body.password).map_err(|e| internal("Failed to hash password", e))?;

    let active = state.catalog.active(&state.store).await?;
    let leave_types: Vec<_> = applicable(&active, body.gender).cloned().collect();

    let account = state
        .store
        .create_account(
            NewAccount {
                username,
                first_name: body.first_name.trim().to_string(),
                last_name: body.last_name.trim().to_string(),
                email,
                password_hash,
                id_number: body.id_number.trim().to_string(),
                phone_number: body.phone_number.trim().to_string(),
                gender: body.gender,
            },
            &leave_types,
        )
        .await
        .map_err(|e| match e {
            StoreError::Conflict("email") => ApiError::validation(
                "This email is already registered. Please use a different one.",
            ),
            StoreError::Conflict(_) => ApiError::validation(
                "This ID number or username is already registered. Please use a different one.",
            ),
            other => other.into(),
        })?;

    info!(user_id = account.user.id, allowances = leave_types.len(), "Account registered");

    Ok(HttpResponse::Created().json(json!({
        "message": format!("Account created for {}! You can now login.", account.user.username),
        "employee_id": account.profile.employee_id,
    })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, user), fields(username = %user.username))]
pub async fn login<S: Store>(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::validation("Username or password required"));
    }

    let Some(account) = state.store.find_account_by_username(user.username.trim()).await? else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if let Err(e) = verify_password(&user.password, &account.user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let tokens = issue_tokens(state.get_ref(), &account.user).await?;
    info!(user_id = account.user.id, "Login successful");

    Ok(HttpResponse::Ok().json(tokens))
}

/// Rotates a refresh token: the presented one is revoked and a new pair issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token<S: Store>(
    req: HttpRequest,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Invalid refresh token".into());

    let token = bearer(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &state.config.jwt_secret).map_err(|_| unauthorized())?;
    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    match state.store.find_refresh_token(&claims.jti).await? {
        Some(stored) if !stored.revoked => {}
        _ => return Err(unauthorized()),
    }

    // A concurrent refresh may have revoked it between the lookup and now.
    if !state.store.revoke_refresh_token(&claims.jti).await? {
        return Err(unauthorized());
    }

    let Some(account) = state.store.find_account(claims.user_id).await? else {
        return Err(unauthorized());
    };

    let tokens = issue_tokens(state.get_ref(), &account.user).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked, or nothing to revoke")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout<S: Store>(
    req: HttpRequest,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let Some(token) = bearer(&req) else {
        return Ok(HttpResponse::NoContent().finish());
    };

    // only refresh tokens can log out
    match verify_token(token, &state.config.jwt_secret) {
        Ok(claims) if claims.token_type == TokenType::Refresh => {
            state.store.revoke_refresh_token(&claims.jti).await?;
        }
        _ => {}
    }

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/auth/password-reset",
    request_body = PasswordResetReq,
    responses(
        (status = 200, description = "Reset link emailed",
         body = Object,
         example = json!({"message": "A password reset link has been sent to your email."})),
        (status = 404, description = "No account with that email")
    ),
    tag = "Auth"
)]
pub async fn password_reset_request<S: Store>(
    body: web::Json<PasswordResetReq>,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let email = body.email.trim().to_lowercase();

    let Some(account) = state.store.find_account_by_email(&email).await? else {
        return Err(ApiError::not_found("No account found with that email."));
    };

    let token = PasswordResetToken::issue(account.user.id, Utc::now());
    state.store.insert_reset_token(&token).await?;
    info!(user_id = account.user.id, "Password reset token issued");

    let reset_url = format!(
        "{}/reset-password/{}",
        state.config.app_base_url.trim_end_matches('/'),
        token.token
    );
    state
        .notifier
        .relay(OutgoingMail {
            to: account.user.email.clone(),
            to_name: account.user.full_name(),
            subject: format!("{SUBJECT}: Password Reset Request"),
            body: templates::password_reset_text(&reset_url),
            is_html: false,
        })
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "A password reset link has been sent to your email."
    })))
}

#[utoipa::path(
    post,
    path = "/auth/password-reset/{token}",
    request_body = PasswordResetConfirm,
    params(("token" = String, Path, description = "Reset token from the emailed link")),
    responses(
        (status = 200, description = "Password changed",
         body = Object,
         example = json!({"message": "Your password has been reset successfully. Please login."})),
        (status = 400, description = "Invalid, used or expired token, or passwords do not match")
    ),
    tag = "Auth"
)]
pub async fn password_reset_confirm<S: Store>(
    path: web::Path<String>,
    body: web::Json<PasswordResetConfirm>,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let token = path.into_inner();
    let now = Utc::now();

    match state.store.find_reset_token(&token).await? {
        Some(stored) if stored.is_valid(now) => {}
        _ => return Err(ApiError::validation(INVALID_RESET_TOKEN)),
    }

    check_new_password(&body.password, &body.confirm_password)?;

    let password_hash =
        hash_password(&body.password).map_err(|e| internal("Failed to hash password", e))?;

    if !state.store.reset_password(&token, &password_hash, now).await? {
        return Err(ApiError::validation(INVALID_RESET_TOKEN));
    }

    info!("Password reset completed");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Your password has been reset successfully. Please login."
    })))
}
