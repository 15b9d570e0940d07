use crate::email::{EmailSender, OutgoingEmail};
use shelfswap_common::model::{
    notification::{CreateNotification, NOTIFICATION_CAP},
    post::{Post, Price},
    user::User,
};
use shelfswap_db::ListingStore;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

#[must_use]
pub fn price_drop_message(title: &str, original: Price, new: Price) -> String {
    format!("Price dropped for {title} from ${original} to ${new}!")
}

/// Fans price drops out to watchers and tells owners about new watchers.
///
/// Nothing here returns an error: every failure is logged and the
/// remaining recipients are still served.
pub struct Notifier {
    store: Arc<dyn ListingStore>,
    email: Arc<dyn EmailSender>,
}

impl Notifier {
    #[must_use]
    pub fn new(store: Arc<dyn ListingStore>, email: Arc<dyn EmailSender>) -> Self {
        Self { store, email }
    }

    /// Writes a capped notification for every watcher of `post` and emails
    /// them. Returns how many notifications were stored.
    #[instrument(skip_all, fields(post_id = %post.id, %original, %new))]
    pub async fn price_dropped(&self, post: &Post, original: Price, new: Price) -> usize {
        if new >= original {
            return 0;
        }

        let watchers = match self.store.fetch_watchers(post.id).await {
            Ok(watchers) => watchers,
            Err(err) => {
                error!(%err, "Fetching watchers failed, nobody is notified");
                return 0;
            }
        };

        let message = price_drop_message(&post.textbook.title, original, new);
        let mut notified = 0;
        for watcher in &watchers {
            let notification = CreateNotification {
                user_id: watcher.id,
                post_id: post.id,
                message: message.clone(),
            };
            match self
                .store
                .push_notification(&notification, NOTIFICATION_CAP)
                .await
            {
                Ok(_) => notified += 1,
                Err(err) => error!(%err, user_id = %watcher.id, "Storing notification failed"),
            }

            let email = OutgoingEmail {
                subject: format!("Price drop: {}", post.textbook.title),
                recipients: vec![watcher.email.get().to_owned()],
                body: message.clone(),
                reply_to: Some(post.user.email.get().to_owned()),
            };
            self.deliver(&email).await;
        }

        debug!(watchers = watchers.len(), notified, "Price drop handled");
        notified
    }

    /// Lets the owner of `post` know that `watcher` started watching it.
    #[instrument(skip_all, fields(post_id = %post.id, watcher_id = %watcher.id))]
    pub async fn watch_added(&self, post: &Post, watcher: &User) {
        let email = OutgoingEmail {
            subject: format!("Someone is watching {}", post.textbook.title),
            recipients: vec![post.user.email.get().to_owned()],
            body: format!(
                "{} added your listing of {} for ${} to their watchlist.",
                watcher.name, post.textbook.title, post.price
            ),
            reply_to: Some(watcher.email.get().to_owned()),
        };
        self.deliver(&email).await;
    }

    async fn deliver(&self, email: &OutgoingEmail) {
        if let Err(err) = self.email.send(email).await {
            warn!(%err, recipients = ?email.recipients, "Sending email failed");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        email::{EmailError, EmailSender, OutgoingEmail},
        service::notifier::{Notifier, price_drop_message},
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shelfswap_common::model::{
        auth::PasswordHash,
        post::{Condition, CreatePost, Post, Price},
        textbook::{CreateTextbook, Isbn},
        user::{CreateUser, EduEmail, User},
        watchlist::CreateWatchlistEntry,
    };
    use shelfswap_db::{ListingStore, MemoryStore};
    use std::sync::Arc;

    /// Keeps every email it is handed, optionally failing each send.
    #[derive(Default)]
    pub(crate) struct RecordingEmailSender {
        pub sent: Mutex<Vec<OutgoingEmail>>,
        pub fail: bool,
    }

    #[async_trait]
    impl EmailSender for RecordingEmailSender {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
            self.sent.lock().push(email.clone());
            if self.fail {
                Err(EmailError::Status(reqwest::StatusCode::BAD_GATEWAY))
            } else {
                Ok(())
            }
        }
    }

    pub(crate) async fn user(store: &dyn ListingStore, email: &str) -> User {
        let create = CreateUser {
            email: EduEmail::new(email.to_owned()).unwrap(),
            name: email.split('@').next().unwrap().to_owned(),
        };
        let password = PasswordHash::generate("password123").unwrap();
        store.create_user(&create, &password).await.unwrap()
    }

    pub(crate) async fn listing(store: &dyn ListingStore, owner: &User, dollars: f64) -> Post {
        store
            .create_post(&CreatePost {
                user_id: owner.id,
                textbook: CreateTextbook {
                    isbn: Isbn::new(9_780_134_093_413).unwrap(),
                    author: "Stewart".to_owned(),
                    title: "Calculus".to_owned(),
                    subject: "Math".to_owned(),
                    image: None,
                },
                price: Price::from_dollars(dollars).unwrap(),
                condition: Condition::Good,
                image: None,
                location: None,
            })
            .await
            .unwrap()
    }

    pub(crate) async fn watch(store: &dyn ListingStore, watcher: &User, post: &Post) {
        store
            .create_watchlist_entry(&CreateWatchlistEntry {
                user_id: watcher.id,
                post_id: post.id,
                textbook_id: post.textbook.id,
            })
            .await
            .unwrap();
    }

    fn dollars(dollars: f64) -> Price {
        Price::from_dollars(dollars).unwrap()
    }

    #[test]
    fn message_format() {
        assert_eq!(
            price_drop_message("Calculus", dollars(50.0), dollars(40.0)),
            "Price dropped for Calculus from $50.00 to $40.00!"
        );
    }

    #[tokio::test]
    async fn every_watcher_is_notified_and_capped() {
        let store = Arc::new(MemoryStore::default());
        let email = Arc::new(RecordingEmailSender::default());
        let notifier = Notifier::new(store.clone(), email.clone());

        let owner = user(&*store, "owner@school.edu").await;
        let first = user(&*store, "first@school.edu").await;
        let second = user(&*store, "second@school.edu").await;
        let post = listing(&*store, &owner, 50.0).await;
        watch(&*store, &first, &post).await;
        watch(&*store, &second, &post).await;

        let mut price = 50.0;
        for _ in 0..5 {
            let notified = notifier
                .price_dropped(&post, dollars(price), dollars(price - 1.0))
                .await;
            assert_eq!(notified, 2);
            price -= 1.0;
        }

        for watcher in [&first, &second] {
            let notifications = store.fetch_user_notifications(watcher.id, 50).await.unwrap();
            let messages: Vec<&str> = notifications
                .iter()
                .map(|notification| notification.message.as_str())
                .collect();
            assert_eq!(
                messages,
                [
                    "Price dropped for Calculus from $46.00 to $45.00!",
                    "Price dropped for Calculus from $47.00 to $46.00!",
                    "Price dropped for Calculus from $48.00 to $47.00!",
                ]
            );
        }
        assert!(
            store
                .fetch_user_notifications(owner.id, 50)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(email.sent.lock().len(), 10);
    }

    #[tokio::test]
    async fn raises_are_ignored() {
        let store = Arc::new(MemoryStore::default());
        let email = Arc::new(RecordingEmailSender::default());
        let notifier = Notifier::new(store.clone(), email.clone());

        let owner = user(&*store, "owner@school.edu").await;
        let watcher = user(&*store, "watcher@school.edu").await;
        let post = listing(&*store, &owner, 50.0).await;
        watch(&*store, &watcher, &post).await;

        assert_eq!(notifier.price_dropped(&post, dollars(50.0), dollars(50.0)).await, 0);
        assert_eq!(notifier.price_dropped(&post, dollars(50.0), dollars(60.0)).await, 0);
        assert!(email.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn email_failures_keep_notifications() {
        let store = Arc::new(MemoryStore::default());
        let email = Arc::new(RecordingEmailSender {
            fail: true,
            ..RecordingEmailSender::default()
        });
        let notifier = Notifier::new(store.clone(), email.clone());

        let owner = user(&*store, "owner@school.edu").await;
        let watcher = user(&*store, "watcher@school.edu").await;
        let post = listing(&*store, &owner, 50.0).await;
        watch(&*store, &watcher, &post).await;

        assert_eq!(notifier.price_dropped(&post, dollars(50.0), dollars(40.0)).await, 1);
        assert_eq!(
            store.fetch_user_notifications(watcher.id, 50).await.unwrap().len(),
            1
        );
        assert_eq!(email.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn owner_hears_about_new_watchers() {
        let store = Arc::new(MemoryStore::default());
        let email = Arc::new(RecordingEmailSender::default());
        let notifier = Notifier::new(store.clone(), email.clone());

        let owner = user(&*store, "owner@school.edu").await;
        let watcher = user(&*store, "watcher@school.edu").await;
        let post = listing(&*store, &owner, 50.0).await;

        notifier.watch_added(&post, &watcher).await;

        let sent = email.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, ["owner@school.edu"]);
        assert_eq!(sent[0].reply_to.as_deref(), Some("watcher@school.edu"));
    }
}
