use crate::{
    server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json, query::Query},
    service::listings::{CreatePostRequest, ListPostsParams, Listings, UpdatePostRequest},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use shelfswap_common::{
    model::{
        Id,
        post::{Post, PostMarker},
    },
    search::PostQuery,
};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath)]
#[typed_path("/posts")]
struct PostsPath;

async fn list_posts(
    _: PostsPath,
    State(listings): State<Arc<Listings>>,
    Query(params): Query<ListPostsParams>,
) -> Result<Json<Vec<Post>>> {
    let query = PostQuery::try_from(params)?;
    let posts = listings.list(&query).await?;

    Ok(Json(posts))
}

async fn create_post(
    _: PostsPath,
    State(listings): State<Arc<Listings>>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = listings.create(user.user_id(), request).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(listings): State<Arc<Listings>>,
) -> Result<Json<Post>> {
    let post = listings.get(id).await?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(listings): State<Arc<Listings>>,
    user: AuthenticatedUser,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Post>> {
    let post = listings.update(user.user_id(), id, request).await?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(listings): State<Arc<Listings>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    listings.delete(user.user_id(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}
