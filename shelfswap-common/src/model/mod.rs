pub mod auth;
pub mod comment;
pub mod notification;
pub mod post;
pub mod textbook;
pub mod user;
pub mod watchlist;

use crate::{
    model::{
        auth::{InvalidAuthTokenHashError, InvalidPasswordHashError},
        comment::InvalidCommentTextError,
        post::{InvalidConditionError, InvalidLocationError, InvalidPriceError},
        textbook::InvalidIsbnError,
        user::InvalidEmailError,
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData, str::FromStr};
use thiserror::Error;
use time::{OffsetDateTime, macros::datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
    #[error(transparent)]
    Isbn(#[from] InvalidIsbnError),
    #[error(transparent)]
    Price(#[from] InvalidPriceError),
    #[error(transparent)]
    Condition(#[from] InvalidConditionError),
    #[error(transparent)]
    Location(#[from] InvalidLocationError),
    #[error(transparent)]
    CommentText(#[from] InvalidCommentTextError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
    #[error(transparent)]
    PasswordHash(#[from] InvalidPasswordHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ShelfswapEpoch;
impl Epoch for ShelfswapEpoch {
    const EPOCH_TIME: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);
}

pub type ShelfswapSnowflake = Snowflake<ShelfswapEpoch>;
pub type ShelfswapSnowflakeGenerator = SnowflakeGenerator<ShelfswapEpoch>;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(ShelfswapSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: ShelfswapSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> ShelfswapSnowflake {
        self.0
    }

    /// The id as stored in a signed `BIGINT` column.
    #[must_use]
    pub fn as_db(self) -> i64 {
        self.0.get().cast_signed()
    }

    #[must_use]
    pub fn from_db(value: i64) -> Self {
        value.cast_unsigned().into()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str(s).map(Self::from)
    }
}

impl<Marker> From<ShelfswapSnowflake> for Id<Marker> {
    fn from(value: ShelfswapSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(ShelfswapSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
