use shelfswap_common::model::{
    Id, ModelValidationError,
    auth::{Authentication, PasswordHash},
    comment::{Comment, CommentText},
    notification::Notification,
    post::{Location, PartialPost, Price},
    textbook::{Isbn, Textbook},
    user::{EduEmail, User},
    watchlist::WatchlistEntry,
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub email: String,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    pub user_snowflake: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct TextbookRecord {
    pub textbook_snowflake: i64,
    pub isbn: i64,
    pub author: String,
    pub title: String,
    pub subject: String,
    pub image: Option<String>,
}

#[derive(Clone, PartialEq, Debug, FromRow)]
pub(crate) struct PartialPostRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub textbook_snowflake: i64,
    pub price_cents: i64,
    pub condition: String,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: OffsetDateTime,
}

/// A post joined with its owner and textbook.
#[derive(Clone, PartialEq, Debug, FromRow)]
pub(crate) struct FullPostRecord {
    #[sqlx(flatten)]
    pub post: PartialPostRecord,
    pub email: String,
    pub name: String,
    pub isbn: i64,
    pub author: String,
    pub title: String,
    pub subject: String,
    pub textbook_image: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub user_snowflake: i64,
    pub email: String,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct WatchlistRecord {
    pub watchlist_snowflake: i64,
    pub user_snowflake: i64,
    pub post_snowflake: i64,
    pub textbook_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct NotificationRecord {
    pub notification_snowflake: i64,
    pub user_snowflake: i64,
    pub post_snowflake: i64,
    pub message: String,
    pub created_at: OffsetDateTime,
    pub read: bool,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.user_snowflake),
            email: EduEmail::new(value.email)?,
            name: value.name,
        })
    }
}

impl TryFrom<CredentialsRecord> for (User, PasswordHash) {
    type Error = ModelValidationError;

    fn try_from(value: CredentialsRecord) -> Result<Self, Self::Error> {
        let user = User {
            id: Id::from_db(value.user_snowflake),
            email: EduEmail::new(value.email)?,
            name: value.name,
        };
        Ok((user, PasswordHash::from_stored(value.password_hash)?))
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_db(value.user_snowflake),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_at: value.expires_at,
        })
    }
}

impl TryFrom<TextbookRecord> for Textbook {
    type Error = ModelValidationError;

    fn try_from(value: TextbookRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.textbook_snowflake),
            author: value.author,
            title: value.title,
            subject: value.subject,
            isbn: Isbn::from_db(value.isbn)?,
            image: value.image,
        })
    }
}

impl TryFrom<PartialPostRecord> for PartialPost {
    type Error = ModelValidationError;

    fn try_from(value: PartialPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.post_snowflake),
            user_id: Id::from_db(value.user_snowflake),
            textbook_id: Id::from_db(value.textbook_snowflake),
            price: Price::from_db(value.price_cents)?,
            condition: value.condition.parse()?,
            image: value.image,
            location: Location::from_optional(value.latitude, value.longitude)?,
            created_at: value.created_at,
        })
    }
}

impl FullPostRecord {
    pub fn into_parts(self) -> Result<(PartialPost, User, Textbook), ModelValidationError> {
        let user = User {
            id: Id::from_db(self.post.user_snowflake),
            email: EduEmail::new(self.email)?,
            name: self.name,
        };
        let textbook = Textbook {
            id: Id::from_db(self.post.textbook_snowflake),
            author: self.author,
            title: self.title,
            subject: self.subject,
            isbn: Isbn::from_db(self.isbn)?,
            image: self.textbook_image,
        };

        Ok((self.post.try_into()?, user, textbook))
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.comment_snowflake),
            post_id: Id::from_db(value.post_snowflake),
            user: User {
                id: Id::from_db(value.user_snowflake),
                email: EduEmail::new(value.email)?,
                name: value.name,
            },
            text: CommentText::new(value.text)?,
            created_at: value.created_at,
        })
    }
}

impl From<WatchlistRecord> for WatchlistEntry {
    fn from(value: WatchlistRecord) -> Self {
        Self {
            id: Id::from_db(value.watchlist_snowflake),
            user_id: Id::from_db(value.user_snowflake),
            post_id: Id::from_db(value.post_snowflake),
            textbook_id: Id::from_db(value.textbook_snowflake),
        }
    }
}

impl From<NotificationRecord> for Notification {
    fn from(value: NotificationRecord) -> Self {
        Self {
            id: Id::from_db(value.notification_snowflake),
            user_id: Id::from_db(value.user_snowflake),
            post_id: Id::from_db(value.post_snowflake),
            message: value.message,
            created_at: value.created_at,
            read: value.read,
        }
    }
}
