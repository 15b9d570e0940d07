use crate::{
    server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json},
    service::listings::Listings,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use shelfswap_common::model::{
    Id,
    comment::{Comment, CommentMarker},
    post::PostMarker,
};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_delete(delete_comment)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct CreateCommentRequest {
    text: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct CommentsPath {
    id: Id<PostMarker>,
}

async fn list_comments(
    CommentsPath { id }: CommentsPath,
    State(listings): State<Arc<Listings>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = listings.comments(id).await?;

    Ok(Json(comments))
}

async fn create_comment(
    CommentsPath { id }: CommentsPath,
    State(listings): State<Arc<Listings>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = listings.add_comment(user.user_id(), id, request.text).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments/{comment_id}", rejection(ServerError))]
struct CommentPath {
    id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
}

async fn delete_comment(
    CommentPath { id, comment_id }: CommentPath,
    State(listings): State<Arc<Listings>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    listings.delete_comment(user.user_id(), id, comment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
