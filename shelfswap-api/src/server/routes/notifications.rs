use crate::{
    server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json},
    service::notifications::Notifications,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use shelfswap_common::model::{
    Id,
    notification::{Notification, NotificationMarker},
    user::UserMarker,
};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_own_notifications)
        .typed_patch(mark_all_read)
        .typed_get(get_notification)
        .typed_patch(mark_read)
        .typed_get(get_user_notifications)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct MarkAllReadResponse {
    updated: u64,
}

#[derive(TypedPath)]
#[typed_path("/notifications")]
struct NotificationsPath;

async fn get_own_notifications(
    _: NotificationsPath,
    State(notifications): State<Arc<Notifications>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Notification>>> {
    let listed = notifications.list(user.user_id(), user.user_id()).await?;

    Ok(Json(listed))
}

async fn mark_all_read(
    _: NotificationsPath,
    State(notifications): State<Arc<Notifications>>,
    user: AuthenticatedUser,
) -> Result<Json<MarkAllReadResponse>> {
    let updated = notifications.mark_all_read(user.user_id()).await?;

    Ok(Json(MarkAllReadResponse { updated }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/notifications/{id}", rejection(ServerError))]
struct NotificationPath {
    id: Id<NotificationMarker>,
}

async fn get_notification(
    NotificationPath { id }: NotificationPath,
    State(notifications): State<Arc<Notifications>>,
    user: AuthenticatedUser,
) -> Result<Json<Notification>> {
    let notification = notifications.get(user.user_id(), id).await?;

    Ok(Json(notification))
}

async fn mark_read(
    NotificationPath { id }: NotificationPath,
    State(notifications): State<Arc<Notifications>>,
    user: AuthenticatedUser,
) -> Result<Json<Notification>> {
    let notification = notifications.mark_read(user.user_id(), id).await?;

    Ok(Json(notification))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/notifications", rejection(ServerError))]
struct UserNotificationsPath {
    id: Id<UserMarker>,
}

async fn get_user_notifications(
    UserNotificationsPath { id }: UserNotificationsPath,
    State(notifications): State<Arc<Notifications>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Notification>>> {
    let listed = notifications.list(user.user_id(), id).await?;

    Ok(Json(listed))
}
