use async_trait::async_trait;
use shelfswap_common::model::{
    Id, ModelValidationError,
    auth::{AuthTokenHash, Authentication, PasswordHash},
    comment::{Comment, CommentMarker, CreateComment},
    notification::{CreateNotification, Notification, NotificationMarker},
    post::{CreatePost, PartialPost, Post, PostMarker, UpdatePost},
    textbook::{Textbook, TextbookMarker},
    user::{CreateUser, EduEmail, User, UserMarker},
    watchlist::{CreateWatchlistEntry, WatchlistEntry},
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A {0} with the same key already exists")]
    Duplicate(&'static str),
    #[error("The referenced {0} does not exist")]
    MissingReference(&'static str),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Everything the marketplace persists.
///
/// Each method is one unit of work: multi-row operations such as cascading
/// deletes and the capped notification insert either happen completely or
/// not at all.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Fails with [`DbError::Duplicate`] if the email is taken.
    async fn create_user(&self, user: &CreateUser, password: &PasswordHash) -> Result<User>;
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;
    async fn fetch_user_credentials(&self, email: &EduEmail)
    -> Result<Option<(User, PasswordHash)>>;
    /// Removes the user along with their posts (and everything hanging off
    /// them), comments, watchlist entries, notifications and tokens.
    async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<bool>;

    async fn create_authentication(&self, authentication: &Authentication) -> Result<()>;
    async fn fetch_authentication(&self, token_hash: &AuthTokenHash)
    -> Result<Option<Authentication>>;

    async fn fetch_textbook(&self, textbook_id: Id<TextbookMarker>) -> Result<Option<Textbook>>;

    /// Files the post under the textbook with its ISBN, creating the
    /// textbook if there is none yet. An existing textbook keeps its details
    /// but picks up an image if it had none.
    async fn create_post(&self, post: &CreatePost) -> Result<Post>;
    async fn fetch_partial_post(&self, post_id: Id<PostMarker>) -> Result<Option<PartialPost>>;
    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;
    async fn fetch_posts(&self) -> Result<Vec<Post>>;
    /// Writes every mutable column of the post and applies the details patch
    /// to its textbook. Moving to another ISBN resolves that textbook like
    /// [`create_post`](Self::create_post) does, watchlist entries follow the
    /// post, and a textbook left without posts is removed.
    async fn update_post(&self, post: &UpdatePost) -> Result<bool>;
    /// Removes the post with its comments, watchlist entries and
    /// notifications.
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool>;

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment>;
    async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>>;
    async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool>;

    /// Fails with [`DbError::Duplicate`] if the user already watches the post.
    async fn create_watchlist_entry(&self, entry: &CreateWatchlistEntry)
    -> Result<WatchlistEntry>;
    async fn delete_watchlist_entry(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool>;
    async fn fetch_watched_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>>;
    async fn fetch_watchers(&self, post_id: Id<PostMarker>) -> Result<Vec<User>>;

    /// Inserts the notification and evicts the recipient's oldest ones so
    /// that at most `cap` remain.
    async fn push_notification(
        &self,
        notification: &CreateNotification,
        cap: usize,
    ) -> Result<Notification>;
    async fn fetch_notification(
        &self,
        notification_id: Id<NotificationMarker>,
    ) -> Result<Option<Notification>>;
    /// Newest first.
    async fn fetch_user_notifications(
        &self,
        user_id: Id<UserMarker>,
        limit: usize,
    ) -> Result<Vec<Notification>>;
    async fn mark_notification_read(&self, notification_id: Id<NotificationMarker>)
    -> Result<bool>;
    async fn mark_all_notifications_read(&self, user_id: Id<UserMarker>) -> Result<u64>;
}
