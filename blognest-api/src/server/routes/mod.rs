use crate::server::ServerRouter;
use axum::Router;

mod admin;
mod auth;
mod communities;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(communities::routes())
        .merge(posts::routes())
        .merge(admin::routes())
}
