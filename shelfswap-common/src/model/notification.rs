use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Number of notifications kept per recipient. Older ones are evicted on
/// insert.
pub const NOTIFICATION_CAP: usize = 3;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct NotificationMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Notification {
    pub id: Id<NotificationMarker>,
    pub user_id: Id<UserMarker>,
    pub post_id: Id<PostMarker>,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub read: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreateNotification {
    pub user_id: Id<UserMarker>,
    pub post_id: Id<PostMarker>,
    pub message: String,
}
