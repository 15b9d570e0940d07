use crate::service::{Result, ServiceError, notifier::Notifier};
use serde::Deserialize;
use shelfswap_common::model::{
    Id,
    post::{Post, PostMarker},
    textbook::TextbookMarker,
    user::UserMarker,
    watchlist::{CreateWatchlistEntry, WatchlistEntry},
};
use shelfswap_db::ListingStore;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct AddWatchRequest {
    pub post_id: Id<PostMarker>,
    pub textbook_id: Id<TextbookMarker>,
}

pub struct Watchlists {
    store: Arc<dyn ListingStore>,
    notifier: Arc<Notifier>,
}

fn ensure_self(caller: Id<UserMarker>, user_id: Id<UserMarker>) -> Result<()> {
    if caller == user_id {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized("access the watchlist of other users"))
    }
}

impl Watchlists {
    #[must_use]
    pub fn new(store: Arc<dyn ListingStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    #[instrument(skip(self))]
    pub async fn add(
        &self,
        caller: Id<UserMarker>,
        user_id: Id<UserMarker>,
        request: AddWatchRequest,
    ) -> Result<WatchlistEntry> {
        ensure_self(caller, user_id)?;
        let watcher = self
            .store
            .fetch_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;
        let post = self
            .store
            .fetch_post(request.post_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post", request.post_id))?;
        if self.store.fetch_textbook(request.textbook_id).await?.is_none() {
            return Err(ServiceError::not_found("Textbook", request.textbook_id));
        }
        if post.textbook.id != request.textbook_id {
            return Err(ServiceError::TextbookMismatch {
                post: post.id.into(),
                given: request.textbook_id.into(),
                actual: post.textbook.id.into(),
            });
        }

        let entry = self
            .store
            .create_watchlist_entry(&CreateWatchlistEntry {
                user_id,
                post_id: request.post_id,
                textbook_id: request.textbook_id,
            })
            .await?;
        info!(entry_id = %entry.id, "Post added to watchlist");

        self.notifier.watch_added(&post, &watcher).await;
        Ok(entry)
    }

    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        caller: Id<UserMarker>,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<()> {
        ensure_self(caller, user_id)?;
        if self.store.delete_watchlist_entry(user_id, post_id).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found("Watchlist entry for post", post_id))
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, caller: Id<UserMarker>, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        ensure_self(caller, user_id)?;
        if self.store.fetch_user(user_id).await?.is_none() {
            return Err(ServiceError::not_found("User", user_id));
        }

        Ok(self.store.fetch_watched_posts(user_id).await?)
    }
}
