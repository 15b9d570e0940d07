use crate::service::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use shelfswap_common::model::{
    Id, ModelValidationError,
    auth::{AuthToken, Authentication, PasswordHash},
    user::{CreateUser, EduEmail, USER_NAME_MAX_LEN, User, UserMarker},
};
use shelfswap_db::ListingStore;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Signup, login and bearer token checks.
pub struct Accounts {
    store: Arc<dyn ListingStore>,
    token_lifetime: Option<Duration>,
}

impl Accounts {
    #[must_use]
    pub fn new(store: Arc<dyn ListingStore>, token_lifetime: Option<Duration>) -> Self {
        Self {
            store,
            token_lifetime,
        }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> Result<User> {
        let email = EduEmail::new(request.email).map_err(ModelValidationError::from)?;
        let name: String = request.name.trim().chars().take(USER_NAME_MAX_LEN).collect();
        let password = PasswordHash::generate(&request.password)?;

        let user = self
            .store
            .create_user(&CreateUser { email, name }, &password)
            .await?;
        info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let email = EduEmail::new(request.email).map_err(|_| ServiceError::InvalidCredentials)?;
        let (user, password) = self
            .store
            .fetch_user_credentials(&email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;
        if !password.verify(&request.password) {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = AuthToken::generate_random(user.id);
        let created_at = OffsetDateTime::now_utc();
        let authentication = Authentication {
            user: user.id,
            token_hash: token.hash()?,
            created_at,
            expires_at: self.token_lifetime.map(|lifetime| created_at + lifetime),
        };
        self.store.create_authentication(&authentication).await?;

        debug!(user_id = %user.id, "Issued auth token");
        Ok(LoginResponse {
            token: token.as_token_str(),
            user,
        })
    }

    /// Resolves a bearer token to the user it was issued to.
    pub async fn authenticate(&self, token: &AuthToken) -> Result<Id<UserMarker>> {
        let token_hash = token.hash()?;
        let authentication = self
            .store
            .fetch_authentication(&token_hash)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if authentication.user != token.user_id
            || authentication.is_expired_at(OffsetDateTime::now_utc())
        {
            return Err(ServiceError::InvalidToken);
        }

        Ok(authentication.user)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Id<UserMarker>) -> Result<User> {
        self.store
            .fetch_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, caller: Id<UserMarker>, user_id: Id<UserMarker>) -> Result<()> {
        if caller != user_id {
            return Err(ServiceError::Unauthorized("delete other users"));
        }

        if !self.store.delete_user(user_id).await? {
            return Err(ServiceError::not_found("User", user_id));
        }
        info!("User deleted");
        Ok(())
    }
}
