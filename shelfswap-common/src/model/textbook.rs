use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const ISBN_MIN: u64 = 1_000_000_000_000;
pub const ISBN_MAX_EXCLUSIVE: u64 = 10_000_000_000_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct TextbookMarker;

/// The canonical record for one ISBN. Every post selling a copy of the same
/// book points at the same textbook.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Textbook {
    pub id: Id<TextbookMarker>,
    pub author: String,
    pub title: String,
    pub subject: String,
    pub isbn: Isbn,
    pub image: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateTextbook {
    pub isbn: Isbn,
    pub author: String,
    pub title: String,
    pub subject: String,
    pub image: Option<String>,
}

/// Edits to the descriptive fields of a textbook. `None` leaves a field as is.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct TextbookDetailsPatch {
    pub author: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
}

impl TextbookDetailsPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.title.is_none() && self.subject.is_none()
    }

    pub fn apply(&self, textbook: &mut Textbook) {
        if let Some(author) = &self.author {
            textbook.author.clone_from(author);
        }
        if let Some(title) = &self.title {
            textbook.title.clone_from(title);
        }
        if let Some(subject) = &self.subject {
            textbook.subject.clone_from(subject);
        }
    }
}

/// A 13 digit ISBN kept as an integer.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Isbn(u64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("ISBN must be a 13 digit number, got {0}")]
pub struct InvalidIsbnError(i128);

impl Isbn {
    pub fn new(isbn: u64) -> Result<Self, InvalidIsbnError> {
        if (ISBN_MIN..ISBN_MAX_EXCLUSIVE).contains(&isbn) {
            Ok(Self(isbn))
        } else {
            Err(InvalidIsbnError(isbn.into()))
        }
    }

    pub fn from_db(isbn: i64) -> Result<Self, InvalidIsbnError> {
        u64::try_from(isbn)
            .map_err(|_| InvalidIsbnError(isbn.into()))
            .and_then(Self::new)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn as_db(self) -> i64 {
        self.0.cast_signed()
    }
}

impl Display for Isbn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for Isbn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = u64::deserialize(deserializer)?;
        Isbn::new(inner)
            .map_err(|_| Error::invalid_value(Unexpected::Unsigned(inner), &"a 13 digit ISBN"))
    }
}
