use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::notification::Notification;
use crate::state::AppState;
use crate::store::Store;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct NotificationList {
    pub unread: Vec<Notification>,
    pub read: Vec<Notification>,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Own notifications, newest first", body = NotificationList),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let (read, unread): (Vec<_>, Vec<_>) = state
        .store
        .list_notifications(auth.user_id)
        .await?
        .into_iter()
        .partition(|n| n.is_read);

    Ok(HttpResponse::Ok().json(NotificationList { unread, read }))
}

/// Marks one notification read and returns it so the client can follow its link.
#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification to mark read")),
    responses(
        (status = 200, description = "Marked read", body = Notification),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not found or not yours")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let notification_id = path.into_inner();

    match state
        .store
        .mark_notification_read(auth.user_id, notification_id)
        .await?
    {
        Some(notification) => Ok(HttpResponse::Ok().json(notification)),
        None => Err(ApiError::not_found("Notification not found.")),
    }
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "Number of notifications marked read",
         body = Object, example = json!({"updated": 3})),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read<S: Store>(
    auth: AuthUser,
    state: web::Data<AppState<S>>,
) -> Result<HttpResponse, ApiError> {
    let updated = state.store.mark_all_notifications_read(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}
