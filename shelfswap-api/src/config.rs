use serde::Deserialize;
use std::net::IpAddr;
use thiserror::Error;
use time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
}

fn default_email_from() -> String {
    "noreply@shelfswap.edu".to_owned()
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    /// Without a database everything lives in memory until shutdown.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub worker_id: u8,
    #[serde(default)]
    pub process_id: u8,
    /// Without a relay emails are only logged.
    #[serde(default)]
    pub email_relay_url: Option<Url>,
    #[serde(default = "default_email_from")]
    pub email_from: String,
    #[serde(default)]
    pub token_lifetime_hours: Option<u32>,
}

impl Env {
    #[must_use]
    pub fn token_lifetime(&self) -> Option<Duration> {
        self.token_lifetime_hours
            .map(|hours| Duration::hours(hours.into()))
    }
}

/// Reads the environment, after loading a `.env` file if there is one.
pub fn get_env() -> Result<Env, ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    Ok(envy::from_env()?)
}

#[cfg(test)]
mod tests {
    use crate::config::Env;
    use time::Duration;
    use url::Url;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn minimal_env_uses_defaults() {
        let env: Env =
            envy::from_iter(vars(&[("SERVER_ADDRESS", "127.0.0.1"), ("SERVER_PORT", "8080")]))
                .unwrap();

        assert_eq!(env.server_port, 8080);
        assert_eq!(env.database_url, None);
        assert_eq!(env.worker_id, 0);
        assert_eq!(env.email_relay_url, None);
        assert_eq!(env.email_from, "noreply@shelfswap.edu");
        assert_eq!(env.token_lifetime(), None);
    }

    #[test]
    fn full_env() {
        let env: Env = envy::from_iter(vars(&[
            ("SERVER_ADDRESS", "0.0.0.0"),
            ("SERVER_PORT", "3000"),
            ("DATABASE_URL", "postgres://localhost/shelfswap"),
            ("WORKER_ID", "3"),
            ("PROCESS_ID", "7"),
            ("EMAIL_RELAY_URL", "http://mail.local/send"),
            ("TOKEN_LIFETIME_HOURS", "24"),
        ]))
        .unwrap();

        assert_eq!(env.database_url.as_deref(), Some("postgres://localhost/shelfswap"));
        assert_eq!((env.worker_id, env.process_id), (3, 7));
        assert_eq!(
            env.email_relay_url.as_ref().map(Url::as_str),
            Some("http://mail.local/send")
        );
        assert_eq!(env.token_lifetime(), Some(Duration::hours(24)));
    }

    #[test]
    fn port_is_required() {
        assert!(envy::from_iter::<_, Env>(vars(&[("SERVER_ADDRESS", "127.0.0.1")])).is_err());
    }
}
