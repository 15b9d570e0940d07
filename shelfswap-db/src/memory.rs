//! A [`ListingStore`] kept entirely in process memory.
//!
//! Used when no database is configured and by the service tests. Every
//! method takes the single lock once, so each call is atomic just like a
//! transaction on the postgres side.

use crate::store::{DbError, ListingStore, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use shelfswap_common::{
    model::{
        Id, ShelfswapSnowflakeGenerator,
        auth::{AuthTokenHash, Authentication, PasswordHash},
        comment::{Comment, CommentMarker, CreateComment},
        notification::{CreateNotification, Notification, NotificationMarker},
        post::{CreatePost, PartialPost, Post, PostMarker, UpdatePost},
        textbook::{CreateTextbook, Textbook, TextbookMarker},
        user::{CreateUser, EduEmail, User, UserMarker},
        watchlist::{CreateWatchlistEntry, WatchlistEntry, WatchlistMarker},
    },
    snowflake::{ProcessId, WorkerId},
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Default)]
struct Tables {
    users: BTreeMap<Id<UserMarker>, (User, PasswordHash)>,
    authentications: HashMap<AuthTokenHash, Authentication>,
    textbooks: BTreeMap<Id<TextbookMarker>, Textbook>,
    posts: BTreeMap<Id<PostMarker>, PartialPost>,
    comments: BTreeMap<Id<CommentMarker>, Comment>,
    watchlist: BTreeMap<Id<WatchlistMarker>, WatchlistEntry>,
    notifications: BTreeMap<Id<NotificationMarker>, Notification>,
}

struct Inner {
    tables: Tables,
    snowflake_generator: ShelfswapSnowflakeGenerator,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        let inner = Inner {
            tables: Tables::default(),
            snowflake_generator: ShelfswapSnowflakeGenerator::new(worker_id, process_id),
        };

        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(WorkerId::default(), ProcessId::default())
    }
}

impl Tables {
    fn user(&self, user_id: Id<UserMarker>) -> Option<&User> {
        self.users.get(&user_id).map(|(user, _)| user)
    }

    fn assemble(&self, post: &PartialPost) -> Result<Post> {
        let user = self
            .user(post.user_id)
            .ok_or(DbError::MissingReference("user"))?
            .clone();
        let textbook = self
            .textbooks
            .get(&post.textbook_id)
            .ok_or(DbError::MissingReference("textbook"))?
            .clone();
        // Ids grow with creation time, so id order is oldest first.
        let comments = self
            .comments
            .values()
            .filter(|comment| comment.post_id == post.id)
            .cloned()
            .collect();

        Ok(Post::assemble(post.clone(), user, textbook, comments))
    }

    /// Id of the textbook with `textbook.isbn`, created from `textbook` if
    /// there is none. An existing textbook only picks up a missing image.
    fn resolve_textbook(
        &mut self,
        snowflake_generator: &mut ShelfswapSnowflakeGenerator,
        textbook: &CreateTextbook,
    ) -> Id<TextbookMarker> {
        let existing = self
            .textbooks
            .values_mut()
            .find(|existing| existing.isbn == textbook.isbn);
        if let Some(existing) = existing {
            if existing.image.is_none() {
                existing.image.clone_from(&textbook.image);
            }
            return existing.id;
        }

        let created = Textbook {
            id: snowflake_generator.generate().into(),
            author: textbook.author.clone(),
            title: textbook.title.clone(),
            subject: textbook.subject.clone(),
            isbn: textbook.isbn,
            image: textbook.image.clone(),
        };
        let textbook_id = created.id;
        self.textbooks.insert(textbook_id, created);
        textbook_id
    }

    fn remove_post_dependents(&mut self, post_id: Id<PostMarker>) {
        self.comments.retain(|_, comment| comment.post_id != post_id);
        self.watchlist.retain(|_, entry| entry.post_id != post_id);
        self.notifications
            .retain(|_, notification| notification.post_id != post_id);
    }

    fn remove_if_orphaned(&mut self, textbook_id: Id<TextbookMarker>) {
        let in_use = self
            .posts
            .values()
            .any(|post| post.textbook_id == textbook_id);
        if !in_use && self.textbooks.remove(&textbook_id).is_some() {
            debug!(%textbook_id, "Removed textbook without posts");
        }
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn create_user(&self, user: &CreateUser, password: &PasswordHash) -> Result<User> {
        let mut inner = self.inner.lock();

        let taken = inner
            .tables
            .users
            .values()
            .any(|(existing, _)| existing.email == user.email);
        if taken {
            return Err(DbError::Duplicate("user"));
        }

        let created = User {
            id: inner.snowflake_generator.generate().into(),
            email: user.email.clone(),
            name: user.name.clone(),
        };
        inner
            .tables
            .users
            .insert(created.id, (created.clone(), password.clone()));

        Ok(created)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.inner.lock().tables.user(user_id).cloned())
    }

    async fn fetch_user_credentials(
        &self,
        email: &EduEmail,
    ) -> Result<Option<(User, PasswordHash)>> {
        let inner = self.inner.lock();
        let credentials = inner
            .tables
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .cloned();

        Ok(credentials)
    }

    async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<bool> {
        let tables = &mut self.inner.lock().tables;
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }

        let owned_posts: Vec<PartialPost> = tables
            .posts
            .values()
            .filter(|post| post.user_id == user_id)
            .cloned()
            .collect();
        for post in &owned_posts {
            tables.posts.remove(&post.id);
            tables.remove_post_dependents(post.id);
        }
        for post in &owned_posts {
            tables.remove_if_orphaned(post.textbook_id);
        }

        tables.comments.retain(|_, comment| comment.user.id != user_id);
        tables.watchlist.retain(|_, entry| entry.user_id != user_id);
        tables
            .notifications
            .retain(|_, notification| notification.user_id != user_id);
        tables
            .authentications
            .retain(|_, authentication| authentication.user != user_id);

        Ok(true)
    }

    async fn create_authentication(&self, authentication: &Authentication) -> Result<()> {
        let tables = &mut self.inner.lock().tables;
        if !tables.users.contains_key(&authentication.user) {
            return Err(DbError::MissingReference("user"));
        }
        if tables
            .authentications
            .contains_key(&authentication.token_hash)
        {
            return Err(DbError::Duplicate("authentication"));
        }

        tables
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());
        Ok(())
    }

    async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        Ok(self
            .inner
            .lock()
            .tables
            .authentications
            .get(token_hash)
            .cloned())
    }

    async fn fetch_textbook(&self, textbook_id: Id<TextbookMarker>) -> Result<Option<Textbook>> {
        Ok(self.inner.lock().tables.textbooks.get(&textbook_id).cloned())
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut inner = self.inner.lock();
        let Inner {
            tables,
            snowflake_generator,
        } = &mut *inner;
        if !tables.users.contains_key(&post.user_id) {
            return Err(DbError::MissingReference("post owner"));
        }

        let textbook_id = tables.resolve_textbook(snowflake_generator, &post.textbook);
        let snowflake = snowflake_generator.generate();
        let created = PartialPost {
            id: snowflake.into(),
            user_id: post.user_id,
            textbook_id,
            price: post.price,
            condition: post.condition,
            image: post.image.clone(),
            location: post.location,
            created_at: snowflake.created_at(),
        };
        tables.posts.insert(created.id, created.clone());

        tables.assemble(&created)
    }

    async fn fetch_partial_post(&self, post_id: Id<PostMarker>) -> Result<Option<PartialPost>> {
        Ok(self.inner.lock().tables.posts.get(&post_id).cloned())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let tables = &self.inner.lock().tables;
        tables
            .posts
            .get(&post_id)
            .map(|post| tables.assemble(post))
            .transpose()
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let tables = &self.inner.lock().tables;
        // Newest first, matching the postgres ordering.
        tables
            .posts
            .values()
            .rev()
            .map(|post| tables.assemble(post))
            .collect()
    }

    async fn update_post(&self, post: &UpdatePost) -> Result<bool> {
        let mut inner = self.inner.lock();
        let Inner {
            tables,
            snowflake_generator,
        } = &mut *inner;
        let Some(previous_textbook) = tables
            .posts
            .get(&post.id)
            .map(|existing| existing.textbook_id)
        else {
            return Ok(false);
        };
        let current = tables
            .textbooks
            .get(&previous_textbook)
            .ok_or(DbError::MissingReference("textbook"))?;

        let textbook_id = if current.isbn == post.isbn {
            previous_textbook
        } else {
            let seed = CreateTextbook {
                isbn: post.isbn,
                author: current.author.clone(),
                title: current.title.clone(),
                subject: current.subject.clone(),
                image: post.image.clone(),
            };
            tables.resolve_textbook(snowflake_generator, &seed)
        };
        if let Some(textbook) = tables.textbooks.get_mut(&textbook_id) {
            post.details.apply(textbook);
        }

        let Some(existing) = tables.posts.get_mut(&post.id) else {
            return Ok(false);
        };
        existing.textbook_id = textbook_id;
        existing.price = post.price;
        existing.condition = post.condition;
        existing.image.clone_from(&post.image);
        existing.location = post.location;

        if previous_textbook != textbook_id {
            for entry in tables.watchlist.values_mut() {
                if entry.post_id == post.id {
                    entry.textbook_id = textbook_id;
                }
            }
            tables.remove_if_orphaned(previous_textbook);
        }

        Ok(true)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let tables = &mut self.inner.lock().tables;
        let Some(removed) = tables.posts.remove(&post_id) else {
            return Ok(false);
        };

        tables.remove_post_dependents(post_id);
        tables.remove_if_orphaned(removed.textbook_id);
        Ok(true)
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let mut inner = self.inner.lock();
        if !inner.tables.posts.contains_key(&comment.post_id) {
            return Err(DbError::MissingReference("post"));
        }
        let Some(user) = inner.tables.user(comment.user_id).cloned() else {
            return Err(DbError::MissingReference("author"));
        };

        let snowflake = inner.snowflake_generator.generate();
        let created = Comment {
            id: snowflake.into(),
            post_id: comment.post_id,
            user,
            text: comment.text.clone(),
            created_at: snowflake.created_at(),
        };
        inner.tables.comments.insert(created.id, created.clone());

        Ok(created)
    }

    async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        Ok(self.inner.lock().tables.comments.get(&comment_id).cloned())
    }

    async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .tables
            .comments
            .remove(&comment_id)
            .is_some())
    }

    async fn create_watchlist_entry(
        &self,
        entry: &CreateWatchlistEntry,
    ) -> Result<WatchlistEntry> {
        let mut inner = self.inner.lock();
        let tables = &inner.tables;
        if !tables.users.contains_key(&entry.user_id) {
            return Err(DbError::MissingReference("user"));
        }
        if !tables.posts.contains_key(&entry.post_id) {
            return Err(DbError::MissingReference("post"));
        }
        if !tables.textbooks.contains_key(&entry.textbook_id) {
            return Err(DbError::MissingReference("textbook"));
        }
        let watching = tables
            .watchlist
            .values()
            .any(|existing| existing.user_id == entry.user_id && existing.post_id == entry.post_id);
        if watching {
            return Err(DbError::Duplicate("watchlist entry"));
        }

        let created = WatchlistEntry {
            id: inner.snowflake_generator.generate().into(),
            user_id: entry.user_id,
            post_id: entry.post_id,
            textbook_id: entry.textbook_id,
        };
        inner.tables.watchlist.insert(created.id, created);

        Ok(created)
    }

    async fn delete_watchlist_entry(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let tables = &mut self.inner.lock().tables;
        let before = tables.watchlist.len();
        tables
            .watchlist
            .retain(|_, entry| entry.user_id != user_id || entry.post_id != post_id);

        Ok(tables.watchlist.len() < before)
    }

    async fn fetch_watched_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let tables = &self.inner.lock().tables;
        tables
            .watchlist
            .values()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .filter_map(|entry| tables.posts.get(&entry.post_id))
            .map(|post| tables.assemble(post))
            .collect()
    }

    async fn fetch_watchers(&self, post_id: Id<PostMarker>) -> Result<Vec<User>> {
        let tables = &self.inner.lock().tables;
        let watchers = tables
            .watchlist
            .values()
            .filter(|entry| entry.post_id == post_id)
            .filter_map(|entry| tables.user(entry.user_id))
            .cloned()
            .collect();

        Ok(watchers)
    }

    async fn push_notification(
        &self,
        notification: &CreateNotification,
        cap: usize,
    ) -> Result<Notification> {
        let mut inner = self.inner.lock();
        if !inner.tables.users.contains_key(&notification.user_id) {
            return Err(DbError::MissingReference("recipient"));
        }
        if !inner.tables.posts.contains_key(&notification.post_id) {
            return Err(DbError::MissingReference("post"));
        }

        let snowflake = inner.snowflake_generator.generate();
        let created = Notification {
            id: snowflake.into(),
            user_id: notification.user_id,
            post_id: notification.post_id,
            message: notification.message.clone(),
            created_at: snowflake.created_at(),
            read: false,
        };
        let notifications = &mut inner.tables.notifications;
        notifications.insert(created.id, created.clone());

        let evicted: Vec<_> = notifications
            .values()
            .rev()
            .filter(|existing| existing.user_id == notification.user_id)
            .skip(cap)
            .map(|existing| existing.id)
            .collect();
        for id in &evicted {
            notifications.remove(id);
        }
        if !evicted.is_empty() {
            debug!(
                evicted = evicted.len(),
                user_id = %notification.user_id,
                "Evicted old notifications"
            );
        }

        Ok(created)
    }

    async fn fetch_notification(
        &self,
        notification_id: Id<NotificationMarker>,
    ) -> Result<Option<Notification>> {
        Ok(self
            .inner
            .lock()
            .tables
            .notifications
            .get(&notification_id)
            .cloned())
    }

    async fn fetch_user_notifications(
        &self,
        user_id: Id<UserMarker>,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let tables = &self.inner.lock().tables;
        let notifications = tables
            .notifications
            .values()
            .rev()
            .filter(|notification| notification.user_id == user_id)
            .take(limit)
            .cloned()
            .collect();

        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Id<NotificationMarker>,
    ) -> Result<bool> {
        let tables = &mut self.inner.lock().tables;
        let Some(notification) = tables.notifications.get_mut(&notification_id) else {
            return Ok(false);
        };

        notification.read = true;
        Ok(true)
    }

    async fn mark_all_notifications_read(&self, user_id: Id<UserMarker>) -> Result<u64> {
        let tables = &mut self.inner.lock().tables;
        let mut updated = 0;
        for notification in tables.notifications.values_mut() {
            if notification.user_id == user_id && !notification.read {
                notification.read = true;
                updated += 1;
            }
        }

        Ok(updated)
    }
}
