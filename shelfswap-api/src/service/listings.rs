use crate::service::{Result, ServiceError, notifier::Notifier};
use serde::Deserialize;
use shelfswap_common::{
    model::{
        Id, ModelValidationError,
        comment::{Comment, CommentMarker, CommentText, CreateComment},
        post::{Condition, CreatePost, Location, Post, PostMarker, Price},
        textbook::{CreateTextbook, Isbn, TextbookDetailsPatch},
        user::UserMarker,
    },
    search::{GeoQuery, PostQuery, SortOrder},
};
use shelfswap_db::ListingStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct CreatePostRequest {
    /// Defaults to the caller. Naming anybody else is refused.
    #[serde(default)]
    pub user_id: Option<Id<UserMarker>>,
    pub isbn: Isbn,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subject: String,
    pub price: Price,
    pub condition: Condition,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng")]
    pub longitude: Option<f64>,
}

/// Every field is optional; absent fields keep their current value.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdatePostRequest {
    pub price: Option<Price>,
    pub condition: Option<Condition>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub isbn: Option<Isbn>,
    pub image: Option<String>,
    #[serde(alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(alias = "lng")]
    pub longitude: Option<f64>,
}

/// Query string of a listing search.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListPostsParams {
    pub user_id: Option<Id<UserMarker>>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    pub sort: Option<SortOrder>,
    pub q: Option<String>,
    pub subject: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub condition: Option<Condition>,
}

impl TryFrom<ListPostsParams> for PostQuery {
    type Error = ServiceError;

    fn try_from(value: ListPostsParams) -> Result<Self> {
        let origin = Location::from_optional(value.lat, value.lng)
            .map_err(ModelValidationError::from)?;
        let geo = origin
            .map(|origin| GeoQuery::new(origin, value.radius))
            .transpose()?;
        let min_price = value
            .min_price
            .map(Price::from_dollars)
            .transpose()
            .map_err(ModelValidationError::from)?;
        let max_price = value
            .max_price
            .map(Price::from_dollars)
            .transpose()
            .map_err(ModelValidationError::from)?;

        Ok(Self {
            user_id: value.user_id,
            subject: value.subject.filter(|subject| !subject.trim().is_empty()),
            min_price,
            max_price,
            condition: value.condition,
            text: value.q.filter(|q| !q.trim().is_empty()),
            geo,
            sort: value.sort.unwrap_or_default(),
        })
    }
}

/// Create, update and delete of listings and their comments.
pub struct Listings {
    store: Arc<dyn ListingStore>,
    notifier: Arc<Notifier>,
}

impl Listings {
    #[must_use]
    pub fn new(store: Arc<dyn ListingStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    #[instrument(skip(self, request), fields(isbn = %request.isbn))]
    pub async fn create(&self, caller: Id<UserMarker>, request: CreatePostRequest) -> Result<Post> {
        let owner_id = request.user_id.unwrap_or(caller);
        if owner_id != caller {
            return Err(ServiceError::Unauthorized("create posts for other users"));
        }
        let location = Location::from_optional(request.latitude, request.longitude)
            .map_err(ModelValidationError::from)?;
        if self.store.fetch_user(owner_id).await?.is_none() {
            return Err(ServiceError::not_found("User", owner_id));
        }

        let post = self
            .store
            .create_post(&CreatePost {
                user_id: owner_id,
                textbook: CreateTextbook {
                    isbn: request.isbn,
                    author: request.author,
                    title: request.title,
                    subject: request.subject,
                    image: request.image.clone(),
                },
                price: request.price,
                condition: request.condition,
                image: request.image,
                location,
            })
            .await?;

        info!(post_id = %post.id, textbook_id = %post.textbook.id, "Created post");
        Ok(post)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, post_id: Id<PostMarker>) -> Result<Post> {
        self.store
            .fetch_post(post_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post", post_id))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let posts = self.store.fetch_posts().await?;
        Ok(query.apply(posts))
    }

    /// Applies `request` to a post owned by the caller. A strict price drop
    /// notifies watchers once the post is stored.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        caller: Id<UserMarker>,
        post_id: Id<PostMarker>,
        request: UpdatePostRequest,
    ) -> Result<Post> {
        let post = self.get(post_id).await?;
        if post.user.id != caller {
            return Err(ServiceError::Unauthorized("modify posts of other users"));
        }

        let mut updated = post.to_update();
        if request.latitude.is_some() || request.longitude.is_some() {
            updated.location = Location::from_optional(request.latitude, request.longitude)
                .map_err(ModelValidationError::from)?;
        }
        if let Some(isbn) = request.isbn {
            updated.isbn = isbn;
        }
        updated.details = TextbookDetailsPatch {
            author: request.author,
            title: request.title,
            subject: request.subject,
        };
        if let Some(price) = request.price {
            updated.price = price;
        }
        if let Some(condition) = request.condition {
            updated.condition = condition;
        }
        if let Some(image) = request.image {
            updated.image = Some(image);
        }

        if !self.store.update_post(&updated).await? {
            return Err(ServiceError::not_found("Post", post_id));
        }
        let stored = self.get(post_id).await?;

        if stored.price < post.price {
            let notified = self
                .notifier
                .price_dropped(&stored, post.price, stored.price)
                .await;
            debug!(notified, "Price drop notifications sent");
        }

        Ok(stored)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, caller: Id<UserMarker>, post_id: Id<PostMarker>) -> Result<()> {
        let post = self
            .store
            .fetch_partial_post(post_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Post", post_id))?;
        if post.user_id != caller {
            return Err(ServiceError::Unauthorized("delete posts of other users"));
        }

        if !self.store.delete_post(post_id).await? {
            return Err(ServiceError::not_found("Post", post_id));
        }
        info!("Deleted post");
        Ok(())
    }

    /// Comments on the post, oldest first.
    #[instrument(skip(self))]
    pub async fn comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        Ok(self.get(post_id).await?.comments)
    }

    #[instrument(skip(self, text))]
    pub async fn add_comment(
        &self,
        caller: Id<UserMarker>,
        post_id: Id<PostMarker>,
        text: String,
    ) -> Result<Comment> {
        let text = CommentText::new(text).map_err(ModelValidationError::from)?;
        if self.store.fetch_partial_post(post_id).await?.is_none() {
            return Err(ServiceError::not_found("Post", post_id));
        }

        let comment = self
            .store
            .create_comment(&CreateComment {
                post_id,
                user_id: caller,
                text,
            })
            .await?;
        Ok(comment)
    }

    #[instrument(skip(self))]
    pub async fn delete_comment(
        &self,
        caller: Id<UserMarker>,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<()> {
        let comment = self
            .store
            .fetch_comment(comment_id)
            .await?
            .filter(|comment| comment.post_id == post_id)
            .ok_or_else(|| ServiceError::not_found("Comment", comment_id))?;
        if comment.user.id != caller {
            return Err(ServiceError::Unauthorized("delete comments of other users"));
        }

        if !self.store.delete_comment(comment_id).await? {
            return Err(ServiceError::not_found("Comment", comment_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::service::{
        ServiceError,
        listings::{CreatePostRequest, ListPostsParams, Listings, UpdatePostRequest},
        notifier::{
            Notifier,
            tests::{RecordingEmailSender, user, watch},
        },
    };
    use shelfswap_common::{
        model::{
            Id,
            post::{Condition, Price},
            textbook::Isbn,
            user::UserMarker,
        },
        search::PostQuery,
    };
    use shelfswap_db::{ListingStore, MemoryStore};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, Arc<RecordingEmailSender>, Listings) {
        let store = Arc::new(MemoryStore::default());
        let email = Arc::new(RecordingEmailSender::default());
        let notifier = Arc::new(Notifier::new(store.clone(), email.clone()));
        let listings = Listings::new(store.clone(), notifier);
        (store, email, listings)
    }

    fn request(isbn: u64, dollars: f64) -> CreatePostRequest {
        CreatePostRequest {
            user_id: None,
            isbn: Isbn::new(isbn).unwrap(),
            title: "Calculus".to_owned(),
            author: "Stewart".to_owned(),
            subject: "Math".to_owned(),
            price: Price::from_dollars(dollars).unwrap(),
            condition: Condition::Good,
            image: None,
            latitude: None,
            longitude: None,
        }
    }

    fn price_update(dollars: f64) -> UpdatePostRequest {
        UpdatePostRequest {
            price: Some(Price::from_dollars(dollars).unwrap()),
            ..UpdatePostRequest::default()
        }
    }

    #[tokio::test]
    async fn create_embeds_owner_and_textbook() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;

        let post = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();

        assert_eq!(post.user, owner);
        assert_eq!(post.textbook.isbn.get(), 9_780_134_093_413);
        assert_eq!(post.textbook.title, "Calculus");
        assert!(post.comments.is_empty());
        assert_eq!(listings.get(post.id).await.unwrap(), post);
    }

    #[tokio::test]
    async fn create_checks_owner_and_location() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;
        let other = user(&*store, "other@school.edu").await;

        let for_other = CreatePostRequest {
            user_id: Some(other.id),
            ..request(9_780_134_093_413, 50.0)
        };
        assert!(matches!(
            listings.create(owner.id, for_other).await,
            Err(ServiceError::Unauthorized(_))
        ));

        let ghost: Id<UserMarker> = Id::from(12_345);
        assert!(matches!(
            listings.create(ghost, request(9_780_134_093_413, 50.0)).await,
            Err(ServiceError::NotFound { kind: "User", .. })
        ));

        let half_location = CreatePostRequest {
            latitude: Some(10.0),
            ..request(9_780_134_093_413, 50.0)
        };
        assert!(matches!(
            listings.create(owner.id, half_location).await,
            Err(ServiceError::Validation(_))
        ));

        let out_of_range = CreatePostRequest {
            latitude: Some(91.0),
            longitude: Some(0.0),
            ..request(9_780_134_093_413, 50.0)
        };
        assert!(matches!(
            listings.create(owner.id, out_of_range).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(store.fetch_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_isbn_shares_one_textbook() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;

        let first = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();
        let second = listings
            .create(owner.id, request(9_780_134_093_413, 30.0))
            .await
            .unwrap();

        assert_eq!(first.textbook.id, second.textbook.id);
    }

    #[tokio::test]
    async fn price_drop_notifies_watchers() {
        let (store, email, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;
        let watcher = user(&*store, "watcher@school.edu").await;
        let post = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();
        watch(&*store, &watcher, &post).await;

        let updated = listings
            .update(owner.id, post.id, price_update(40.0))
            .await
            .unwrap();
        assert_eq!(updated.price, Price::from_dollars(40.0).unwrap());

        let notifications = store.fetch_user_notifications(watcher.id, 50).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].message,
            "Price dropped for Calculus from $50.00 to $40.00!"
        );
        assert_eq!(email.sent.lock().len(), 1);

        // A raise or an unchanged price is silent.
        listings
            .update(owner.id, post.id, price_update(45.0))
            .await
            .unwrap();
        listings
            .update(owner.id, post.id, price_update(45.0))
            .await
            .unwrap();
        assert_eq!(
            store.fetch_user_notifications(watcher.id, 50).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn email_outage_does_not_fail_update() {
        let store = Arc::new(MemoryStore::default());
        let email = Arc::new(RecordingEmailSender {
            fail: true,
            ..RecordingEmailSender::default()
        });
        let notifier = Arc::new(Notifier::new(store.clone(), email));
        let listings = Listings::new(store.clone(), notifier);

        let owner = user(&*store, "owner@school.edu").await;
        let watcher = user(&*store, "watcher@school.edu").await;
        let post = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();
        watch(&*store, &watcher, &post).await;

        assert!(listings.update(owner.id, post.id, price_update(10.0)).await.is_ok());
        assert_eq!(
            store.fetch_user_notifications(watcher.id, 50).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn only_the_owner_may_update_or_delete() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;
        let other = user(&*store, "other@school.edu").await;
        let post = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();

        assert!(matches!(
            listings.update(other.id, post.id, price_update(1.0)).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            listings.delete(other.id, post.id).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert_eq!(listings.get(post.id).await.unwrap().price, post.price);

        listings.delete(owner.id, post.id).await.unwrap();
        assert!(matches!(
            listings.delete(owner.id, post.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn isbn_change_moves_post_to_canonical_textbook() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;
        let first = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();
        let second = listings
            .create(owner.id, request(9_780_134_093_999, 20.0))
            .await
            .unwrap();

        let moved = listings
            .update(
                owner.id,
                first.id,
                UpdatePostRequest {
                    isbn: Some(second.textbook.isbn),
                    ..UpdatePostRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.textbook.id, second.textbook.id);
        assert_eq!(store.fetch_textbook(first.textbook.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn detail_edits_reach_the_textbook() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;
        let post = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();

        let updated = listings
            .update(
                owner.id,
                post.id,
                UpdatePostRequest {
                    title: Some("Calculus: Early Transcendentals".to_owned()),
                    condition: Some(Condition::Fair),
                    ..UpdatePostRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.textbook.title, "Calculus: Early Transcendentals");
        assert_eq!(updated.textbook.author, "Stewart");
        assert_eq!(updated.condition, Condition::Fair);
        assert_eq!(updated.price, post.price);
    }

    #[tokio::test]
    async fn rejected_update_changes_nothing() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;
        let post = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();

        let half_location = UpdatePostRequest {
            title: Some("Renamed".to_owned()),
            isbn: Some(Isbn::new(9_999_999_999_999).unwrap()),
            price: Some(Price::from_dollars(10.0).unwrap()),
            latitude: Some(10.0),
            ..UpdatePostRequest::default()
        };
        assert!(matches!(
            listings.update(owner.id, post.id, half_location).await,
            Err(ServiceError::Validation(_))
        ));
        let rename_only = UpdatePostRequest {
            title: Some("Renamed".to_owned()),
            longitude: Some(200.0),
            ..UpdatePostRequest::default()
        };
        assert!(matches!(
            listings.update(owner.id, post.id, rename_only).await,
            Err(ServiceError::Validation(_))
        ));

        assert_eq!(listings.get(post.id).await.unwrap(), post);
        let fresh = listings
            .create(
                owner.id,
                CreatePostRequest {
                    title: "Linear Algebra".to_owned(),
                    ..request(9_999_999_999_999, 30.0)
                },
            )
            .await
            .unwrap();
        assert_eq!(fresh.textbook.title, "Linear Algebra");
    }

    #[tokio::test]
    async fn comments_belong_to_their_author() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;
        let other = user(&*store, "other@school.edu").await;
        let post = listings
            .create(owner.id, request(9_780_134_093_413, 50.0))
            .await
            .unwrap();

        assert!(matches!(
            listings.add_comment(other.id, post.id, "   ".to_owned()).await,
            Err(ServiceError::Validation(_))
        ));
        let comment = listings
            .add_comment(other.id, post.id, "Is this still available?".to_owned())
            .await
            .unwrap();
        assert_eq!(listings.get(post.id).await.unwrap().comments, [comment.clone()]);
        assert_eq!(listings.comments(post.id).await.unwrap(), [comment.clone()]);

        assert!(matches!(
            listings.delete_comment(owner.id, post.id, comment.id).await,
            Err(ServiceError::Unauthorized(_))
        ));
        listings
            .delete_comment(other.id, post.id, comment.id)
            .await
            .unwrap();
        assert!(listings.comments(post.id).await.unwrap().is_empty());
        listings.delete(owner.id, post.id).await.unwrap();
        assert!(matches!(
            listings.comments(post.id).await,
            Err(ServiceError::NotFound { kind: "Post", .. })
        ));
    }

    #[tokio::test]
    async fn list_applies_query_params() {
        let (store, _, listings) = setup();
        let owner = user(&*store, "owner@school.edu").await;
        let near = CreatePostRequest {
            latitude: Some(10.0),
            longitude: Some(10.0),
            ..request(9_780_134_093_413, 50.0)
        };
        let far = CreatePostRequest {
            latitude: Some(10.29),
            longitude: Some(10.0),
            ..request(9_780_134_093_414, 20.0)
        };
        let near = listings.create(owner.id, near).await.unwrap();
        listings.create(owner.id, far).await.unwrap();

        let params = ListPostsParams {
            lat: Some(10.0),
            lng: Some(10.0),
            radius: Some(10.0),
            ..ListPostsParams::default()
        };
        let query = PostQuery::try_from(params).unwrap();
        let found = listings.list(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, near.id);

        let everything = listings.list(&PostQuery::default()).await.unwrap();
        assert_eq!(everything.len(), 2);

        let half_origin = ListPostsParams {
            lat: Some(10.0),
            ..ListPostsParams::default()
        };
        assert!(PostQuery::try_from(half_origin).is_err());
    }
}
