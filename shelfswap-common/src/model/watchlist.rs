use crate::model::{Id, post::PostMarker, textbook::TextbookMarker, user::UserMarker};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct WatchlistMarker;

/// One user watching one post. The textbook is carried along so watched
/// listings can be grouped by book without a join.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct WatchlistEntry {
    pub id: Id<WatchlistMarker>,
    pub user_id: Id<UserMarker>,
    pub post_id: Id<PostMarker>,
    pub textbook_id: Id<TextbookMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateWatchlistEntry {
    pub user_id: Id<UserMarker>,
    pub post_id: Id<PostMarker>,
    pub textbook_id: Id<TextbookMarker>,
}
