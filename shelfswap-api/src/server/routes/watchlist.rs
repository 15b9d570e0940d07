use crate::{
    server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json},
    service::watchlist::{AddWatchRequest, Watchlists},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use shelfswap_common::model::{
    Id,
    post::{Post, PostMarker},
    user::UserMarker,
    watchlist::WatchlistEntry,
};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_watchlist)
        .typed_post(add_to_watchlist)
        .typed_delete(remove_from_watchlist)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/watchlist", rejection(ServerError))]
struct WatchlistPath {
    id: Id<UserMarker>,
}

async fn get_watchlist(
    WatchlistPath { id }: WatchlistPath,
    State(watchlists): State<Arc<Watchlists>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Post>>> {
    let posts = watchlists.list(user.user_id(), id).await?;

    Ok(Json(posts))
}

async fn add_to_watchlist(
    WatchlistPath { id }: WatchlistPath,
    State(watchlists): State<Arc<Watchlists>>,
    user: AuthenticatedUser,
    Json(request): Json<AddWatchRequest>,
) -> Result<(StatusCode, Json<WatchlistEntry>)> {
    let entry = watchlists.add(user.user_id(), id, request).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/watchlist/{post_id}", rejection(ServerError))]
struct WatchlistEntryPath {
    id: Id<UserMarker>,
    post_id: Id<PostMarker>,
}

async fn remove_from_watchlist(
    WatchlistEntryPath { id, post_id }: WatchlistEntryPath,
    State(watchlists): State<Arc<Watchlists>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    watchlists.remove(user.user_id(), id, post_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
