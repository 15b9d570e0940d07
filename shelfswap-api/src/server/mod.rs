use crate::{
    email::EmailSender,
    service::{
        ServiceError, accounts::Accounts, listings::Listings, notifications::Notifications,
        notifier::Notifier, watchlist::Watchlists,
    },
};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use serde::{Deserialize, Serialize};
use shelfswap_common::model::auth::{AuthTokenDecodeError, PasswordError};
use shelfswap_db::ListingStore;
use std::sync::Arc;
use thiserror::Error;
use time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

mod auth;
mod json;
mod query;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub accounts: Arc<Accounts>,
    pub listings: Arc<Listings>,
    pub watchlists: Arc<Watchlists>,
    pub notifications: Arc<Notifications>,
}

impl ServerState {
    /// Wires every service to the same store and email sender.
    #[must_use]
    pub fn new(
        store: Arc<dyn ListingStore>,
        email: Arc<dyn EmailSender>,
        token_lifetime: Option<Duration>,
    ) -> Self {
        let notifier = Arc::new(Notifier::new(store.clone(), email));

        Self {
            accounts: Arc::new(Accounts::new(store.clone(), token_lifetime)),
            listings: Arc::new(Listings::new(store.clone(), notifier.clone())),
            watchlists: Arc::new(Watchlists::new(store.clone(), notifier)),
            notifications: Arc::new(Notifications::new(store)),
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

/// The complete application with request tracing.
pub fn app(state: ServerState) -> Router {
    routes().layer(TraceLayer::new_for_http()).with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Service(err) => service_status(err),
        }
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_)
        | ServiceError::Radius(_)
        | ServiceError::Password(PasswordError::TooShort)
        | ServiceError::TextbookMismatch { .. } => StatusCode::BAD_REQUEST,
        ServiceError::NotFound { .. } | ServiceError::MissingReference(_) => StatusCode::NOT_FOUND,
        ServiceError::Unauthorized(_)
        | ServiceError::InvalidCredentials
        | ServiceError::InvalidToken => StatusCode::UNAUTHORIZED,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Password(PasswordError::Hash(_))
        | ServiceError::AuthTokenHash(_)
        | ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
            "Internal server error".to_owned()
        } else {
            warn!(error = %self, %status, "Replying with error");
            self.to_string()
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
