use crate::server::ServerRouter;

mod comments;
mod notifications;
mod posts;
mod users;
mod watchlist;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(users::routes())
        .merge(watchlist::routes())
        .merge(notifications::routes())
}
