use crate::service::{Result, ServiceError};
use shelfswap_common::model::{
    Id,
    notification::{NOTIFICATION_CAP, Notification, NotificationMarker},
    user::UserMarker,
};
use shelfswap_db::ListingStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Read access to the notifications written by the notifier.
pub struct Notifications {
    store: Arc<dyn ListingStore>,
}

impl Notifications {
    #[must_use]
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self { store }
    }

    /// The most recent notifications of `user_id`, newest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        caller: Id<UserMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Vec<Notification>> {
        if caller != user_id {
            return Err(ServiceError::Unauthorized("read notifications of other users"));
        }

        Ok(self
            .store
            .fetch_user_notifications(user_id, NOTIFICATION_CAP)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        caller: Id<UserMarker>,
        notification_id: Id<NotificationMarker>,
    ) -> Result<Notification> {
        let notification = self
            .store
            .fetch_notification(notification_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification", notification_id))?;
        if notification.user_id != caller {
            return Err(ServiceError::Unauthorized("read notifications of other users"));
        }

        Ok(notification)
    }

    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        caller: Id<UserMarker>,
        notification_id: Id<NotificationMarker>,
    ) -> Result<Notification> {
        let mut notification = self.get(caller, notification_id).await?;

        // Evicted between the read and the write.
        if !self.store.mark_notification_read(notification_id).await? {
            return Err(ServiceError::not_found("Notification", notification_id));
        }
        notification.read = true;
        Ok(notification)
    }

    /// Returns how many notifications were unread.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, caller: Id<UserMarker>) -> Result<u64> {
        let updated = self.store.mark_all_notifications_read(caller).await?;
        debug!(updated, "Marked notifications read");
        Ok(updated)
    }
}
