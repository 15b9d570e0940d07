use crate::{
    server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json},
    service::accounts::{Accounts, LoginRequest, LoginResponse, SignupRequest},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use shelfswap_common::model::{
    Id,
    user::{User, UserMarker},
};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(signup)
        .typed_post(login)
        .typed_get(get_user)
        .typed_delete(delete_user)
}

#[derive(TypedPath)]
#[typed_path("/signup")]
struct SignupPath;

async fn signup(
    _: SignupPath,
    State(accounts): State<Arc<Accounts>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = accounts.signup(request).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(TypedPath)]
#[typed_path("/login")]
struct LoginPath;

async fn login(
    _: LoginPath,
    State(accounts): State<Arc<Accounts>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = accounts.login(request).await?;

    Ok(Json(response))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(accounts): State<Arc<Accounts>>,
) -> Result<Json<User>> {
    let user = accounts.get(id).await?;

    Ok(Json(user))
}

async fn delete_user(
    UserPath { id }: UserPath,
    State(accounts): State<Arc<Accounts>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    accounts.delete(user.user_id(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}
