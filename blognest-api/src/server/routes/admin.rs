use crate::server::{Reply, Result, ServerError, ServerRouter, auth::AuthenticatedAdmin};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blognest_common::model::post::Post;
use blognest_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_reported_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/admin/reportedposts", rejection(ServerError))]
struct GetReportedPostsPath();

/// Posts with standing reports, most reported first, for moderation review.
async fn get_reported_posts(
    GetReportedPostsPath(): GetReportedPostsPath,
    State(db_client): State<Arc<DbClient>>,
    _admin: AuthenticatedAdmin,
) -> Result<Reply<Vec<Post>>> {
    let posts = db_client.fetch_reported_posts().await?;

    Ok(Reply::ok("Reported posts fetched successfully", posts))
}
