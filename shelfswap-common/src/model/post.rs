use crate::model::{
    Id,
    comment::Comment,
    textbook::{CreateTextbook, Isbn, Textbook, TextbookDetailsPatch, TextbookMarker},
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;
use time::OffsetDateTime;

/// Highest accepted listing price, in cents.
pub const PRICE_MAX_CENTS: u64 = 100_000_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A listing together with everything a client needs to render it.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub user: User,
    pub textbook: Textbook,
    pub price: Price,
    pub condition: Condition,
    pub image: Option<String>,
    #[serde(flatten)]
    pub location: Option<Location>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub comments: Vec<Comment>,
    /// Miles from the searched point, rounded to one decimal. Only present
    /// in results of a geo query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// A listing as stored: related records by id only.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub user_id: Id<UserMarker>,
    pub textbook_id: Id<TextbookMarker>,
    pub price: Price,
    pub condition: Condition,
    pub image: Option<String>,
    #[serde(flatten)]
    pub location: Option<Location>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A new listing, filed under the canonical textbook of `textbook.isbn`.
/// The textbook is created from `textbook` if the ISBN is new.
#[derive(Clone, PartialEq, Debug)]
pub struct CreatePost {
    pub user_id: Id<UserMarker>,
    pub textbook: CreateTextbook,
    pub price: Price,
    pub condition: Condition,
    pub image: Option<String>,
    pub location: Option<Location>,
}

/// The complete new state of a listing.
#[derive(Clone, PartialEq, Debug)]
pub struct UpdatePost {
    pub id: Id<PostMarker>,
    /// A different ISBN moves the post to that ISBN's textbook, which
    /// starts out with the details of the current one if it is new.
    pub isbn: Isbn,
    /// Applied to the textbook the post ends up on.
    pub details: TextbookDetailsPatch,
    pub price: Price,
    pub condition: Condition,
    pub image: Option<String>,
    pub location: Option<Location>,
}

impl Post {
    #[must_use]
    pub fn assemble(
        post: PartialPost,
        user: User,
        textbook: Textbook,
        comments: Vec<Comment>,
    ) -> Self {
        Self {
            id: post.id,
            user,
            textbook,
            price: post.price,
            condition: post.condition,
            image: post.image,
            location: post.location,
            created_at: post.created_at,
            comments,
            distance: None,
        }
    }

    /// An update that leaves the post as it is.
    #[must_use]
    pub fn to_update(&self) -> UpdatePost {
        UpdatePost {
            id: self.id,
            isbn: self.textbook.isbn,
            details: TextbookDetailsPatch::default(),
            price: self.price,
            condition: self.condition,
            image: self.image.clone(),
            location: self.location,
        }
    }
}

/// A price in whole cents. Travels over the wire as a decimal number of
/// dollars.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Price(u64);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Price must be between 0 and 1000000 dollars, got {0}")]
pub struct InvalidPriceError(String);

impl Price {
    pub fn from_cents(cents: u64) -> Result<Self, InvalidPriceError> {
        if cents <= PRICE_MAX_CENTS {
            Ok(Self(cents))
        } else {
            Err(InvalidPriceError(format!("{cents} cents")))
        }
    }

    pub fn from_dollars(dollars: f64) -> Result<Self, InvalidPriceError> {
        let cents = (dollars * 100.0).round();
        #[allow(clippy::cast_precision_loss)]
        let in_range = dollars.is_finite() && cents >= 0.0 && cents <= PRICE_MAX_CENTS as f64;
        if !in_range {
            return Err(InvalidPriceError(dollars.to_string()));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cents = cents as u64;
        Ok(Self(cents))
    }

    pub fn from_db(cents: i64) -> Result<Self, InvalidPriceError> {
        u64::try_from(cents)
            .map_err(|_| InvalidPriceError(format!("{cents} cents")))
            .and_then(Self::from_cents)
    }

    #[must_use]
    pub fn cents(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn as_db(self) -> i64 {
        self.0.cast_signed()
    }

    #[must_use]
    pub fn as_dollars(self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let dollars = self.0 as f64 / 100.0;
        dollars
    }
}

/// Always two decimals: `50.00`, `12.5` becomes `12.50`.
impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_dollars())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = f64::deserialize(deserializer)?;
        Price::from_dollars(inner)
            .map_err(|_| Error::invalid_value(Unexpected::Float(inner), &"a price in dollars"))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum Condition {
    New,
    LikeNew,
    #[default]
    Good,
    Fair,
    Acceptable,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Condition must be one of New, Like New, Good, Fair or Acceptable, got {0:?}")]
pub struct InvalidConditionError(String);

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::New,
        Condition::LikeNew,
        Condition::Good,
        Condition::Fair,
        Condition::Acceptable,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Acceptable => "Acceptable",
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = InvalidConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        Condition::ALL
            .into_iter()
            .find(|condition| condition.as_str().replace(' ', "").to_lowercase() == wanted)
            .ok_or_else(|| InvalidConditionError(s.to_owned()))
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        inner
            .parse()
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"a listing condition"))
    }
}

/// A validated point on the globe, in degrees.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "LocationParts")]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct LocationParts {
    latitude: f64,
    longitude: f64,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidLocationError {
    #[error("Latitude and longitude must be given together")]
    Incomplete,
    #[error("Latitude must be within [-90, 90], got {0}")]
    Latitude(String),
    #[error("Longitude must be within [-180, 180], got {0}")]
    Longitude(String),
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidLocationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(InvalidLocationError::Latitude(latitude.to_string()));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidLocationError::Longitude(longitude.to_string()));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Both halves or neither.
    pub fn from_optional(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, InvalidLocationError> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Self::new(latitude, longitude).map(Some),
            (None, None) => Ok(None),
            _ => Err(InvalidLocationError::Incomplete),
        }
    }

    #[must_use]
    pub fn latitude(self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(self) -> f64 {
        self.longitude
    }
}

impl TryFrom<LocationParts> for Location {
    type Error = InvalidLocationError;

    fn try_from(value: LocationParts) -> Result<Self, Self::Error> {
        Self::new(value.latitude, value.longitude)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{Condition, Location, Price};

    #[test]
    fn price_rounds_to_cents() {
        assert_eq!(Price::from_dollars(50.0).unwrap().cents(), 5_000);
        assert_eq!(Price::from_dollars(19.999).unwrap().cents(), 2_000);
        assert_eq!(Price::from_dollars(0.0).unwrap().cents(), 0);
        assert!(Price::from_dollars(-1.0).is_err());
        assert!(Price::from_dollars(f64::NAN).is_err());
        assert!(Price::from_dollars(2_000_000.0).is_err());
    }

    #[test]
    fn price_display_has_two_decimals() {
        assert_eq!(Price::from_cents(5_000).unwrap().to_string(), "50.00");
        assert_eq!(Price::from_cents(1_205).unwrap().to_string(), "12.05");
        assert_eq!(Price::from_cents(7).unwrap().to_string(), "0.07");
    }

    #[test]
    fn price_serializes_as_dollars() {
        let price = Price::from_cents(4_050).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "40.5");
        assert_eq!(serde_json::from_str::<Price>("40.5").unwrap(), price);
    }

    #[test]
    fn condition_parsing_is_lenient() {
        assert_eq!("Like New".parse::<Condition>().unwrap(), Condition::LikeNew);
        assert_eq!("like_new".parse::<Condition>().unwrap(), Condition::LikeNew);
        assert_eq!("GOOD".parse::<Condition>().unwrap(), Condition::Good);
        assert!("Mint".parse::<Condition>().is_err());
        assert_eq!(
            serde_json::to_string(&Condition::LikeNew).unwrap(),
            "\"Like New\""
        );
    }

    #[test]
    fn location_ranges() {
        assert!(Location::new(90.0, 180.0).is_ok());
        assert!(Location::new(-90.0, -180.0).is_ok());
        assert!(Location::new(90.1, 0.0).is_err());
        assert!(Location::new(0.0, -180.5).is_err());
        assert!(Location::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn location_halves_travel_together() {
        assert_eq!(Location::from_optional(None, None).unwrap(), None);
        assert!(Location::from_optional(Some(10.0), None).is_err());
        assert!(Location::from_optional(None, Some(10.0)).is_err());
        assert!(Location::from_optional(Some(10.0), Some(10.0)).unwrap().is_some());
    }

    #[test]
    fn location_deserialization_validates() {
        assert!(serde_json::from_str::<Location>(r#"{"latitude":1,"longitude":2}"#).is_ok());
        assert!(serde_json::from_str::<Location>(r#"{"latitude":100,"longitude":2}"#).is_err());
    }
}
