use crate::server::{Reply, Result, ServerError, ServerRouter, auth::AuthenticatedUser};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blognest_common::model::post::Post;
use blognest_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/user/getuserposts", rejection(ServerError))]
struct GetUserPostsPath();

/// Every post by the caller, drafts included.
async fn get_user_posts(
    GetUserPostsPath(): GetUserPostsPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Reply<Vec<Post>>> {
    let posts = db_client
        .fetch_user_posts(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Reply::ok("Posts fetched successfully", posts))
}
