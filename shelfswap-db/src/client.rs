use crate::{
    record::{
        AuthenticationRecord, CommentRecord, CredentialsRecord, FullPostRecord,
        NotificationRecord, PartialPostRecord, TextbookRecord, UserRecord, WatchlistRecord,
    },
    store::{DbError, ListingStore, Result},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shelfswap_common::{
    model::{
        Id, ShelfswapSnowflake, ShelfswapSnowflakeGenerator,
        auth::{AuthTokenHash, Authentication, PasswordHash},
        comment::{Comment, CommentMarker, CreateComment},
        notification::{CreateNotification, Notification, NotificationMarker},
        post::{CreatePost, PartialPost, Post, PostMarker, UpdatePost},
        textbook::{CreateTextbook, Textbook, TextbookMarker},
        user::{CreateUser, EduEmail, User, UserMarker},
        watchlist::{CreateWatchlistEntry, WatchlistEntry},
    },
    snowflake::{ProcessId, WorkerId},
};
use sqlx::{
    PgPool, Postgres, Transaction, migrate::Migrator, postgres::PgPoolOptions, query, query_as,
    query_scalar,
};
use std::collections::HashMap;
use tracing::debug;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const FULL_POST_SELECT: &str = "
    SELECT
        posts.post_snowflake,
        posts.user_snowflake,
        posts.textbook_snowflake,
        posts.price_cents,
        posts.condition,
        posts.image,
        posts.latitude,
        posts.longitude,
        posts.created_at,
        users.email,
        users.name,
        textbooks.isbn,
        textbooks.author,
        textbooks.title,
        textbooks.subject,
        textbooks.image AS textbook_image
    FROM
        listings.posts
        JOIN users.users USING (user_snowflake)
        JOIN listings.textbooks USING (textbook_snowflake)
";

const PARTIAL_POST_COLUMNS: &str = "
    post_snowflake,
    user_snowflake,
    textbook_snowflake,
    price_cents,
    condition,
    image,
    latitude,
    longitude,
    created_at
";

const TEXTBOOK_COLUMNS: &str = "textbook_snowflake, isbn, author, title, subject, image";

const NOTIFICATION_COLUMNS: &str =
    "notification_snowflake, user_snowflake, post_snowflake, message, created_at, read";

const COMMENT_SELECT: &str = "
    SELECT
        comments.comment_snowflake,
        comments.post_snowflake,
        comments.text,
        comments.created_at,
        users.user_snowflake,
        users.email,
        users.name
    FROM
        listings.comments
        JOIN users.users USING (user_snowflake)
";

fn duplicate_as(what: &'static str) -> impl FnOnce(sqlx::Error) -> DbError {
    move |err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Duplicate(what),
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::MissingReference(what)
        }
        _ => err.into(),
    }
}

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<ShelfswapSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(ShelfswapSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Connects to `database_url` and brings the schema up to date.
    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        let client = Self::new(pool, worker_id, process_id);
        client.migrate().await?;

        Ok(client)
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    fn next_snowflake(&self) -> ShelfswapSnowflake {
        self.snowflake_generator.lock().generate()
    }

    /// Builds full posts for the given rows, attaching their comments oldest
    /// first.
    async fn assemble_posts(&self, records: Vec<FullPostRecord>) -> Result<Vec<Post>> {
        let post_snowflakes: Vec<i64> = records
            .iter()
            .map(|record| record.post.post_snowflake)
            .collect();

        let comment_records = query_as::<_, CommentRecord>(&format!(
            "{COMMENT_SELECT}
            WHERE comments.post_snowflake = ANY($1)
            ORDER BY comments.created_at, comments.comment_snowflake"
        ))
        .bind(&post_snowflakes)
        .fetch_all(&self.pool)
        .await?;

        let mut comments: HashMap<Id<PostMarker>, Vec<Comment>> = HashMap::new();
        for record in comment_records {
            let comment = Comment::try_from(record)?;
            comments.entry(comment.post_id).or_default().push(comment);
        }

        records
            .into_iter()
            .map(|record| {
                let (post, user, textbook) = record.into_parts()?;
                let post_comments = comments.remove(&post.id).unwrap_or_default();
                Ok(Post::assemble(post, user, textbook, post_comments))
            })
            .collect()
    }

    /// Snowflake of the textbook with `textbook.isbn`, inserted from
    /// `textbook` if there is none. An existing textbook only picks up a
    /// missing image.
    async fn resolve_textbook(
        tx: &mut Transaction<'_, Postgres>,
        textbook_snowflake: ShelfswapSnowflake,
        textbook: &CreateTextbook,
    ) -> Result<i64> {
        let resolved: i64 = query_scalar(&format!(
            "
            INSERT INTO listings.textbooks AS textbooks ({TEXTBOOK_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (isbn) DO UPDATE
                SET image = COALESCE(textbooks.image, EXCLUDED.image)
            RETURNING textbook_snowflake
            "
        ))
        .bind(textbook_snowflake.get().cast_signed())
        .bind(textbook.isbn.as_db())
        .bind(&textbook.author)
        .bind(&textbook.title)
        .bind(&textbook.subject)
        .bind(&textbook.image)
        .fetch_one(&mut **tx)
        .await?;

        Ok(resolved)
    }

    async fn remove_orphaned_textbooks(
        tx: &mut Transaction<'_, Postgres>,
        textbook_snowflakes: &[i64],
    ) -> Result<()> {
        let removed = query(
            "
            DELETE FROM listings.textbooks
            WHERE
                textbooks.textbook_snowflake = ANY($1)
                AND NOT EXISTS (
                    SELECT 1 FROM listings.posts
                    WHERE posts.textbook_snowflake = textbooks.textbook_snowflake
                )
            ",
        )
        .bind(textbook_snowflakes)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if removed > 0 {
            debug!(removed, "Removed textbooks without posts");
        }
        Ok(())
    }
}

#[async_trait]
impl ListingStore for DbClient {
    async fn create_user(&self, user: &CreateUser, password: &PasswordHash) -> Result<User> {
        let user_snowflake = self.next_snowflake();

        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (user_snowflake, email, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING user_snowflake, email, name
            ",
        )
        .bind(user_snowflake.get().cast_signed())
        .bind(user.email.get())
        .bind(&user.name)
        .bind(password.get())
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_as("user"))?;

        Ok(User::try_from(record)?)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT user_snowflake, email, name
            FROM users.users
            WHERE user_snowflake = $1
            ",
        )
        .bind(user_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn fetch_user_credentials(
        &self,
        email: &EduEmail,
    ) -> Result<Option<(User, PasswordHash)>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT user_snowflake, email, name, password_hash
            FROM users.users
            WHERE email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(TryInto::try_into).transpose()?;
        Ok(credentials)
    }

    async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<bool> {
        let user_snowflake = user_id.as_db();
        let mut tx = self.pool.begin().await?;

        let owned_posts = "SELECT post_snowflake FROM listings.posts WHERE user_snowflake = $1";
        for table in ["notifications", "watchlist", "comments"] {
            query(&format!(
                "
                DELETE FROM listings.{table}
                WHERE user_snowflake = $1 OR post_snowflake IN ({owned_posts})
                "
            ))
            .bind(user_snowflake)
            .execute(&mut *tx)
            .await?;
        }

        let textbook_snowflakes: Vec<i64> = query_scalar(
            "
            DELETE FROM listings.posts
            WHERE user_snowflake = $1
            RETURNING textbook_snowflake
            ",
        )
        .bind(user_snowflake)
        .fetch_all(&mut *tx)
        .await?;
        Self::remove_orphaned_textbooks(&mut tx, &textbook_snowflakes).await?;

        query("DELETE FROM users.authentications WHERE user_snowflake = $1")
            .bind(user_snowflake)
            .execute(&mut *tx)
            .await?;
        let deleted = query("DELETE FROM users.users WHERE user_snowflake = $1")
            .bind(user_snowflake)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn create_authentication(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO users.authentications (token_hash, user_snowflake, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(authentication.token_hash.0.as_slice())
        .bind(authentication.user.as_db())
        .bind(authentication.created_at)
        .bind(authentication.expires_at)
        .execute(&self.pool)
        .await
        .map_err(duplicate_as("authentication"))?;

        Ok(())
    }

    async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT user_snowflake, token_hash, created_at, expires_at
            FROM users.authentications
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    async fn fetch_textbook(&self, textbook_id: Id<TextbookMarker>) -> Result<Option<Textbook>> {
        let record = query_as::<_, TextbookRecord>(&format!(
            "SELECT {TEXTBOOK_COLUMNS} FROM listings.textbooks WHERE textbook_snowflake = $1"
        ))
        .bind(textbook_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        let textbook = record.map(Textbook::try_from).transpose()?;
        Ok(textbook)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let textbook_snowflake = self.next_snowflake();
        let post_snowflake = self.next_snowflake();
        let mut tx = self.pool.begin().await?;

        let textbook_snowflake =
            Self::resolve_textbook(&mut tx, textbook_snowflake, &post.textbook).await?;
        query(&format!(
            "
            INSERT INTO listings.posts ({PARTIAL_POST_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "
        ))
        .bind(post_snowflake.get().cast_signed())
        .bind(post.user_id.as_db())
        .bind(textbook_snowflake)
        .bind(post.price.as_db())
        .bind(post.condition.as_str())
        .bind(&post.image)
        .bind(post.location.map(|location| location.latitude()))
        .bind(post.location.map(|location| location.longitude()))
        .bind(post_snowflake.created_at())
        .execute(&mut *tx)
        .await
        .map_err(duplicate_as("post owner"))?;

        let record = query_as::<_, FullPostRecord>(&format!(
            "{FULL_POST_SELECT} WHERE posts.post_snowflake = $1"
        ))
        .bind(post_snowflake.get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        let (post, user, textbook) = record.into_parts()?;
        Ok(Post::assemble(post, user, textbook, Vec::new()))
    }

    async fn fetch_partial_post(&self, post_id: Id<PostMarker>) -> Result<Option<PartialPost>> {
        let record = query_as::<_, PartialPostRecord>(&format!(
            "SELECT {PARTIAL_POST_COLUMNS} FROM listings.posts WHERE post_snowflake = $1"
        ))
        .bind(post_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(PartialPost::try_from).transpose()?;
        Ok(post)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "{FULL_POST_SELECT} WHERE posts.post_snowflake = $1"
        ))
        .bind(post_id.as_db())
        .fetch_all(&self.pool)
        .await?;

        Ok(self.assemble_posts(records).await?.into_iter().next())
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "{FULL_POST_SELECT} ORDER BY posts.created_at DESC, posts.post_snowflake DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_posts(records).await
    }

    async fn update_post(&self, post: &UpdatePost) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let current = query_as::<_, TextbookRecord>(
            "
            SELECT
                textbooks.textbook_snowflake,
                textbooks.isbn,
                textbooks.author,
                textbooks.title,
                textbooks.subject,
                textbooks.image
            FROM
                listings.posts
                JOIN listings.textbooks USING (textbook_snowflake)
            WHERE posts.post_snowflake = $1
            FOR UPDATE OF posts
            ",
        )
        .bind(post.id.as_db())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(current) = current else {
            return Ok(false);
        };
        let current = Textbook::try_from(current)?;
        let previous_textbook = current.id.as_db();

        let textbook_snowflake = if current.isbn == post.isbn {
            previous_textbook
        } else {
            let seed = CreateTextbook {
                isbn: post.isbn,
                author: current.author,
                title: current.title,
                subject: current.subject,
                image: post.image.clone(),
            };
            Self::resolve_textbook(&mut tx, self.next_snowflake(), &seed).await?
        };

        if !post.details.is_empty() {
            query(
                "
                UPDATE listings.textbooks
                SET
                    author = COALESCE($2, author),
                    title = COALESCE($3, title),
                    subject = COALESCE($4, subject)
                WHERE textbook_snowflake = $1
                ",
            )
            .bind(textbook_snowflake)
            .bind(&post.details.author)
            .bind(&post.details.title)
            .bind(&post.details.subject)
            .execute(&mut *tx)
            .await?;
        }

        query(
            "
            UPDATE listings.posts
            SET
                textbook_snowflake = $2,
                price_cents = $3,
                condition = $4,
                image = $5,
                latitude = $6,
                longitude = $7
            WHERE post_snowflake = $1
            ",
        )
        .bind(post.id.as_db())
        .bind(textbook_snowflake)
        .bind(post.price.as_db())
        .bind(post.condition.as_str())
        .bind(&post.image)
        .bind(post.location.map(|location| location.latitude()))
        .bind(post.location.map(|location| location.longitude()))
        .execute(&mut *tx)
        .await?;

        if previous_textbook != textbook_snowflake {
            query("UPDATE listings.watchlist SET textbook_snowflake = $2 WHERE post_snowflake = $1")
                .bind(post.id.as_db())
                .bind(textbook_snowflake)
                .execute(&mut *tx)
                .await?;
            Self::remove_orphaned_textbooks(&mut tx, &[previous_textbook]).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        for table in ["notifications", "watchlist", "comments"] {
            query(&format!(
                "DELETE FROM listings.{table} WHERE post_snowflake = $1"
            ))
            .bind(post_id.as_db())
            .execute(&mut *tx)
            .await?;
        }

        let textbook_snowflake: Option<i64> = query_scalar(
            "
            DELETE FROM listings.posts
            WHERE post_snowflake = $1
            RETURNING textbook_snowflake
            ",
        )
        .bind(post_id.as_db())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(textbook_snowflake) = textbook_snowflake else {
            return Ok(false);
        };
        Self::remove_orphaned_textbooks(&mut tx, &[textbook_snowflake]).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let comment_snowflake = self.next_snowflake();
        let mut tx = self.pool.begin().await?;

        query(
            "
            INSERT INTO listings.comments
                (comment_snowflake, post_snowflake, user_snowflake, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(comment_snowflake.get().cast_signed())
        .bind(comment.post_id.as_db())
        .bind(comment.user_id.as_db())
        .bind(comment.text.get())
        .bind(comment_snowflake.created_at())
        .execute(&mut *tx)
        .await
        .map_err(duplicate_as("post or author"))?;

        let record = query_as::<_, CommentRecord>(&format!(
            "{COMMENT_SELECT} WHERE comments.comment_snowflake = $1"
        ))
        .bind(comment_snowflake.get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Comment::try_from(record)?)
    }

    async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(&format!(
            "{COMMENT_SELECT} WHERE comments.comment_snowflake = $1"
        ))
        .bind(comment_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let deleted = query("DELETE FROM listings.comments WHERE comment_snowflake = $1")
            .bind(comment_id.as_db())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn create_watchlist_entry(
        &self,
        entry: &CreateWatchlistEntry,
    ) -> Result<WatchlistEntry> {
        let watchlist_snowflake = self.next_snowflake();

        let record = query_as::<_, WatchlistRecord>(
            "
            INSERT INTO listings.watchlist
                (watchlist_snowflake, user_snowflake, post_snowflake, textbook_snowflake)
            VALUES ($1, $2, $3, $4)
            RETURNING watchlist_snowflake, user_snowflake, post_snowflake, textbook_snowflake
            ",
        )
        .bind(watchlist_snowflake.get().cast_signed())
        .bind(entry.user_id.as_db())
        .bind(entry.post_id.as_db())
        .bind(entry.textbook_id.as_db())
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_as("watchlist entry"))?;

        Ok(record.into())
    }

    async fn delete_watchlist_entry(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let deleted = query(
            "DELETE FROM listings.watchlist WHERE user_snowflake = $1 AND post_snowflake = $2",
        )
        .bind(user_id.as_db())
        .bind(post_id.as_db())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted > 0)
    }

    async fn fetch_watched_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "
            {FULL_POST_SELECT}
                JOIN listings.watchlist ON watchlist.post_snowflake = posts.post_snowflake
            WHERE watchlist.user_snowflake = $1
            ORDER BY watchlist.watchlist_snowflake DESC
            "
        ))
        .bind(user_id.as_db())
        .fetch_all(&self.pool)
        .await?;

        self.assemble_posts(records).await
    }

    async fn fetch_watchers(&self, post_id: Id<PostMarker>) -> Result<Vec<User>> {
        let records = query_as::<_, UserRecord>(
            "
            SELECT users.user_snowflake, users.email, users.name
            FROM
                listings.watchlist
                JOIN users.users USING (user_snowflake)
            WHERE watchlist.post_snowflake = $1
            ORDER BY watchlist.watchlist_snowflake
            ",
        )
        .bind(post_id.as_db())
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn push_notification(
        &self,
        notification: &CreateNotification,
        cap: usize,
    ) -> Result<Notification> {
        let notification_snowflake = self.next_snowflake();
        let user_snowflake = notification.user_id.as_db();
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent pushes for the same recipient until commit.
        query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_snowflake)
            .execute(&mut *tx)
            .await?;

        let record = query_as::<_, NotificationRecord>(&format!(
            "
            INSERT INTO listings.notifications ({NOTIFICATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {NOTIFICATION_COLUMNS}
            "
        ))
        .bind(notification_snowflake.get().cast_signed())
        .bind(user_snowflake)
        .bind(notification.post_id.as_db())
        .bind(&notification.message)
        .bind(notification_snowflake.created_at())
        .fetch_one(&mut *tx)
        .await
        .map_err(duplicate_as("recipient or post"))?;

        let evicted = query(
            "
            DELETE FROM listings.notifications
            WHERE notification_snowflake IN (
                SELECT notification_snowflake
                FROM listings.notifications
                WHERE user_snowflake = $1
                ORDER BY created_at DESC, notification_snowflake DESC
                OFFSET $2
            )
            ",
        )
        .bind(user_snowflake)
        .bind(i64::try_from(cap).unwrap_or(i64::MAX))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if evicted > 0 {
            debug!(evicted, user_id = %notification.user_id, "Evicted old notifications");
        }
        Ok(record.into())
    }

    async fn fetch_notification(
        &self,
        notification_id: Id<NotificationMarker>,
    ) -> Result<Option<Notification>> {
        let record = query_as::<_, NotificationRecord>(&format!(
            "
            SELECT {NOTIFICATION_COLUMNS}
            FROM listings.notifications
            WHERE notification_snowflake = $1
            "
        ))
        .bind(notification_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Notification::from))
    }

    async fn fetch_user_notifications(
        &self,
        user_id: Id<UserMarker>,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let records = query_as::<_, NotificationRecord>(&format!(
            "
            SELECT {NOTIFICATION_COLUMNS}
            FROM listings.notifications
            WHERE user_snowflake = $1
            ORDER BY created_at DESC, notification_snowflake DESC
            LIMIT $2
            "
        ))
        .bind(user_id.as_db())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(
        &self,
        notification_id: Id<NotificationMarker>,
    ) -> Result<bool> {
        let updated =
            query("UPDATE listings.notifications SET read = TRUE WHERE notification_snowflake = $1")
                .bind(notification_id.as_db())
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(updated > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: Id<UserMarker>) -> Result<u64> {
        let updated = query(
            "UPDATE listings.notifications SET read = TRUE WHERE user_snowflake = $1 AND NOT read",
        )
        .bind(user_id.as_db())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }
}
