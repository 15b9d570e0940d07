use crate::model::{Id, user::UserMarker};
use argon2::{
    Argon2, Params,
    password_hash::{self, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::OffsetDateTime;

pub const AUTH_TOKEN_CORE_LEN: usize = 24;
pub const AUTH_TOKEN_SALT_LEN: usize = 18;
pub const AUTH_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;
pub const PASSWORD_SALT_LEN: usize = 16;
pub const PASSWORD_MIN_LEN: usize = 8;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing auth token failed: {0}")]
pub struct AuthTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// Bearer token handed out at login: `user_id:core:salt`, both trailing
/// parts base64. Only [`AuthTokenHash`] is ever persisted.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; AUTH_TOKEN_CORE_LEN],
    pub salt: [u8; AUTH_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthTokenHash(pub Box<[u8; AUTH_TOKEN_HASH_LEN]>);

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub token_hash: AuthTokenHash,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

impl Authentication {
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl AuthToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        let core = rand::random();
        let salt = rand::random();

        Self {
            user_id,
            core,
            salt,
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_core = Base64Display::new(&self.core, &BASE64_STANDARD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{user_id}:{encoded_core}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<AuthTokenHash, AuthTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; AUTH_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(AuthTokenHashError)?;

        Ok(AuthTokenHash(hash))
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = user_id_part.parse().map_err(Self::Err::InvalidUserId)?;
        let core = BASE64_STANDARD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;
        let salt = BASE64_STANDARD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AuthTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The auth token hash had an invalid length")]
pub struct InvalidAuthTokenHashError;

impl TryFrom<Vec<u8>> for AuthTokenHash {
    type Error = InvalidAuthTokenHashError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Self(
            value
                .into_boxed_slice()
                .try_into()
                .map_err(|_| InvalidAuthTokenHashError)?,
        ))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum PasswordError {
    #[error("Password must be at least {PASSWORD_MIN_LEN} characters long")]
    TooShort,
    #[error("Hashing password failed: {0}")]
    Hash(password_hash::Error),
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Stored password hash is not a valid PHC string")]
pub struct InvalidPasswordHashError;

/// Salted argon2 hash of a user's password in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn generate(password: &str) -> Result<Self, PasswordError> {
        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(PasswordError::TooShort);
        }

        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordError::Hash)?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordError::Hash)?;

        Ok(Self(hash.to_string()))
    }

    pub fn from_stored(stored: String) -> Result<Self, InvalidPasswordHashError> {
        password_hash::PasswordHash::new(&stored).map_err(|_| InvalidPasswordHashError)?;
        Ok(Self(stored))
    }

    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        password_hash::PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[redacted]").finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::auth::{AuthToken, AuthTokenDecodeError, PasswordError, PasswordHash};

    #[test]
    fn token_string_round_trips() {
        let token = AuthToken::generate_random(42.into());
        let parsed: AuthToken = token.as_token_str().parse().unwrap();

        assert_eq!(parsed, token);
        assert_eq!(parsed.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(
            "42:abc".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::NotEnoughParts)
        );
        assert!(matches!(
            "x:AAAA:AAAA".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::InvalidUserId(_))
        ));
        assert_eq!(
            "42:AAAA:AAAA".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::InvalidCoreLength)
        );
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = PasswordHash::generate("correct horse").unwrap();

        assert!(!hash.get().contains("correct horse"));
        assert!(hash.verify("correct horse"));
        assert!(!hash.verify("battery staple"));
        assert!(PasswordHash::from_stored(hash.get().to_owned()).is_ok());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert_eq!(
            PasswordHash::generate("short").unwrap_err(),
            PasswordError::TooShort
        );
    }
}
