use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct OutgoingEmail {
    pub subject: String,
    pub recipients: Vec<String>,
    pub body: String,
    /// Address of the user whose action caused the email.
    pub reply_to: Option<String>,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Sending to the email relay failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Email relay answered with status {0}")]
    Status(reqwest::StatusCode),
}

/// Outbound email transport. Callers never let a failure here fail the
/// operation that triggered the email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// Only writes emails to the log. Used when no relay is configured.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LogEmailSender {
    from: String,
}

impl LogEmailSender {
    #[must_use]
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        info!(
            from = %self.from,
            recipients = ?email.recipients,
            subject = %email.subject,
            "Email not sent, no relay configured"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    #[serde(flatten)]
    email: &'a OutgoingEmail,
}

/// Posts every email as JSON to an HTTP relay.
#[derive(Clone, Debug)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    relay_url: Url,
    from: String,
}

impl HttpEmailSender {
    #[must_use]
    pub fn new(client: reqwest::Client, relay_url: Url, from: String) -> Self {
        Self {
            client,
            relay_url,
            from,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    #[instrument(skip_all, fields(relay_url = %self.relay_url, subject = %email.subject))]
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = RelayMessage {
            from: &self.from,
            email,
        };

        let response = self
            .client
            .post(self.relay_url.clone())
            .json(&message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmailError::Status(response.status()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::email::{OutgoingEmail, RelayMessage};

    #[test]
    fn relay_message_is_flat() {
        let email = OutgoingEmail {
            subject: "Hello".to_owned(),
            recipients: vec!["a@school.edu".to_owned()],
            body: "Body".to_owned(),
            reply_to: None,
        };
        let message = RelayMessage {
            from: "noreply@shelfswap.edu",
            email: &email,
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["from"], "noreply@shelfswap.edu");
        assert_eq!(json["subject"], "Hello");
        assert_eq!(json["recipients"][0], "a@school.edu");
        assert!(json["reply_to"].is_null());
    }
}
