use crate::model::{
    Id,
    post::PostMarker,
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::OffsetDateTime;

pub const COMMENT_TEXT_MAX_LEN: usize = 2_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub user: User,
    pub text: CommentText,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub post_id: Id<PostMarker>,
    pub user_id: Id<UserMarker>,
    pub text: CommentText,
}

/// Non-blank comment body.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentText(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Comment text must be non-empty and at most {COMMENT_TEXT_MAX_LEN} characters")]
pub struct InvalidCommentTextError(String);

impl CommentText {
    pub fn new(text: String) -> Result<Self, InvalidCommentTextError> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.chars().count() > COMMENT_TEXT_MAX_LEN {
            Err(InvalidCommentTextError(text))
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CommentText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentText::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"non-empty comment text"))
    }
}
