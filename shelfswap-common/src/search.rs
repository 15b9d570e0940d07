//! Filtering and ordering of listings.
//!
//! Everything here is a pure function of the posts handed in and the query,
//! so the same inputs always produce the same page.

use crate::model::{
    Id,
    post::{Condition, Location, Post, Price},
    user::UserMarker,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Mean radius of the Earth in miles.
pub const EARTH_RADIUS_MILES: f64 = 3956.0;
pub const DEFAULT_RADIUS_MILES: f64 = 10.0;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Date,
    /// Cheapest first.
    Price,
    /// Closest first; posts without a distance go last.
    Distance,
}

/// A point to search around together with the accepted radius.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct GeoQuery {
    pub origin: Location,
    pub radius_miles: f64,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct PostQuery {
    pub user_id: Option<Id<UserMarker>>,
    pub subject: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub condition: Option<Condition>,
    pub text: Option<String>,
    pub geo: Option<GeoQuery>,
    pub sort: SortOrder,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("Search radius must be a positive number of miles, got {0}")]
pub struct InvalidRadiusError(String);

impl GeoQuery {
    pub fn new(origin: Location, radius_miles: Option<f64>) -> Result<Self, InvalidRadiusError> {
        let radius_miles = radius_miles.unwrap_or(DEFAULT_RADIUS_MILES);
        if radius_miles.is_finite() && radius_miles > 0.0 {
            Ok(Self {
                origin,
                radius_miles,
            })
        } else {
            Err(InvalidRadiusError(radius_miles.to_string()))
        }
    }
}

/// Great-circle distance between two points, in miles.
#[must_use]
pub fn haversine_miles(from: Location, to: Location) -> f64 {
    let lat_from = from.latitude().to_radians();
    let lat_to = to.latitude().to_radians();
    let delta_lat = (to.latitude() - from.latitude()).to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat_from.cos() * lat_to.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can leave `a` a hair above 1 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_MILES * c
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl PostQuery {
    fn matches(&self, post: &Post) -> bool {
        if self.user_id.is_some_and(|user_id| post.user.id != user_id) {
            return false;
        }
        if let Some(subject) = &self.subject
            && !post.textbook.subject.eq_ignore_ascii_case(subject.trim())
        {
            return false;
        }
        if self.min_price.is_some_and(|min| post.price < min)
            || self.max_price.is_some_and(|max| post.price > max)
        {
            return false;
        }
        if self.condition.is_some_and(|condition| post.condition != condition) {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.trim().to_lowercase();
            let haystacks = [
                post.textbook.title.to_lowercase(),
                post.textbook.author.to_lowercase(),
                post.textbook.isbn.to_string(),
            ];
            if !needle.is_empty() && !haystacks.iter().any(|hay| hay.contains(&needle)) {
                return false;
            }
        }

        true
    }

    /// Applies every filter, attaches distances for a geo query and sorts.
    #[must_use]
    pub fn apply(&self, posts: Vec<Post>) -> Vec<Post> {
        let mut hits: Vec<(Post, Option<f64>)> = posts
            .into_iter()
            .filter(|post| self.matches(post))
            .filter_map(|post| match self.geo {
                None => Some((post, None)),
                Some(geo) => {
                    let distance = haversine_miles(geo.origin, post.location?);
                    (distance <= geo.radius_miles).then_some((post, Some(distance)))
                }
            })
            .collect();

        hits.sort_by(|(a, _), (b, _)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        match self.sort {
            SortOrder::Date => {}
            SortOrder::Price => hits.sort_by_key(|(post, _)| post.price),
            SortOrder::Distance => hits.sort_by(|(_, a), (_, b)| match (a, b) {
                (Some(a), Some(b)) => a.total_cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }),
        }

        hits.into_iter()
            .map(|(mut post, distance)| {
                post.distance = distance.map(round_to_tenth);
                post
            })
            .collect()
    }
}
