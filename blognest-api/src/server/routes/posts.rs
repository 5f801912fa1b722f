use crate::server::{
    Reply, Result, ServerError, ServerRouter, auth::AuthenticatedUser, banners::BannerHost,
    json::Json,
};
use axum::extract::{Query, State, rejection::QueryRejection};
use axum_extra::routing::{RouterExt, TypedPath};
use blognest_common::model::{
    Id,
    community::CommunityMarker,
    post::{CreatePost, NewPost, Post, PostMarker, normalize_tags},
};
use blognest_db::client::{DbClient, LikeUpdate, PostInsert, ReportUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_put(create_post)
        .typed_get(get_all_posts)
        .typed_get(get_post)
        .typed_get(get_community_posts)
        .typed_get(get_posts_by_tags)
        .typed_post(update_title)
        .typed_post(update_content)
        .typed_post(publish_draft)
        .typed_post(add_impression)
        .typed_delete(delete_post)
        .typed_post(add_like)
        .typed_post(remove_like)
        .typed_post(report_post)
        .typed_post(unreport_post)
        .typed_get(like_status)
        .typed_get(report_status)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostBody {
    post_id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/createpost", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(post): Json<CreatePost>,
) -> Result<Reply<Post>> {
    if post.title.trim().is_empty() {
        return Err(ServerError::MissingField("title"));
    }
    if post.banner.trim().is_empty() {
        return Err(ServerError::MissingField("banner"));
    }
    if post.content.trim().is_empty() {
        return Err(ServerError::MissingField("content"));
    }

    let insert = db_client
        .create_post(&NewPost {
            title: post.title,
            banner: post.banner,
            content: post.content,
            tags: normalize_tags(post.tags),
            author: user.user_id(),
            community: post.community_id,
            is_draft: post.is_draft,
        })
        .await?;

    let post = match insert {
        PostInsert::Created(post) => post,
        PostInsert::MissingCommunity(community_id) => {
            return Err(ServerError::CommunityByIdNotFound(community_id));
        }
    };

    let message = if post.is_draft {
        "Draft saved successfully"
    } else {
        "Post created successfully"
    };

    Ok(Reply::created(message, post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/getallpost", rejection(ServerError))]
struct GetAllPostsPath();

/// The public feed: published, unflagged posts, newest first.
async fn get_all_posts(
    GetAllPostsPath(): GetAllPostsPath,
    State(db_client): State<Arc<DbClient>>,
) -> Result<Reply<Vec<Post>>> {
    let posts = db_client.fetch_posts().await?;

    Ok(Reply::ok("Posts fetched successfully", posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/getpost/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db_client): State<Arc<DbClient>>,
) -> Result<Reply<Vec<Post>>> {
    let post = db_client
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    // Clients consume this as a one-element listing.
    Ok(Reply::ok("Post fetched successfully", vec![post]))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/getcommunityposts/{id}", rejection(ServerError))]
struct GetCommunityPostsPath {
    id: Id<CommunityMarker>,
}

async fn get_community_posts(
    GetCommunityPostsPath { id }: GetCommunityPostsPath,
    State(db_client): State<Arc<DbClient>>,
) -> Result<Reply<Vec<Post>>> {
    let posts = db_client
        .fetch_community_posts(id)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(id))?;

    Ok(Reply::ok("Posts fetched successfully", posts))
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
struct TagsQuery {
    tags: Option<String>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/getbytags", rejection(ServerError))]
struct GetPostsByTagsPath();

/// Matches posts sharing at least one tag with the comma separated query.
async fn get_posts_by_tags(
    GetPostsByTagsPath(): GetPostsByTagsPath,
    State(db_client): State<Arc<DbClient>>,
    query: Result<Query<TagsQuery>, QueryRejection>,
) -> Result<Reply<Vec<Post>>> {
    let Query(query) = query?;

    let tags = normalize_tags(
        query
            .tags
            .unwrap_or_default()
            .split(',')
            .map(ToOwned::to_owned)
            .collect(),
    );

    if tags.is_empty() {
        return Err(ServerError::MissingTags);
    }

    let posts = db_client.fetch_posts_by_tags(&tags).await?;

    Ok(Reply::ok("Posts fetched successfully", posts))
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTitleBody {
    post_id: Id<PostMarker>,
    title: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/updatetitle", rejection(ServerError))]
struct UpdateTitlePath();

async fn update_title(
    UpdateTitlePath(): UpdateTitlePath,
    State(db_client): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
    Json(body): Json<UpdateTitleBody>,
) -> Result<Reply> {
    if body.title.trim().is_empty() {
        return Err(ServerError::MissingField("title"));
    }

    db_client
        .update_post_title(body.post_id, &body.title)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    Ok(Reply::message("Title updated successfully"))
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateContentBody {
    post_id: Id<PostMarker>,
    content: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/updatecontent", rejection(ServerError))]
struct UpdateContentPath();

async fn update_content(
    UpdateContentPath(): UpdateContentPath,
    State(db_client): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
    Json(body): Json<UpdateContentBody>,
) -> Result<Reply> {
    if body.content.trim().is_empty() {
        return Err(ServerError::MissingField("content"));
    }

    db_client
        .update_post_content(body.post_id, &body.content)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    Ok(Reply::message("Content updated successfully"))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/publishdraft", rejection(ServerError))]
struct PublishDraftPath();

async fn publish_draft(
    PublishDraftPath(): PublishDraftPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<PostBody>,
) -> Result<Reply> {
    let author = db_client
        .fetch_post_author(body.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    if author != user.user_id() {
        return Err(ServerError::AccessDenied);
    }

    db_client
        .publish_post(body.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    Ok(Reply::message("Post published successfully"))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct ImpressionData {
    impressions: i64,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/addimpression", rejection(ServerError))]
struct AddImpressionPath();

/// Impressions count anonymous views, so there is no token gate.
async fn add_impression(
    AddImpressionPath(): AddImpressionPath,
    State(db_client): State<Arc<DbClient>>,
    Json(body): Json<PostBody>,
) -> Result<Reply<ImpressionData>> {
    let impressions = db_client
        .add_impression(body.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    Ok(Reply::ok(
        "Impression recorded successfully",
        ImpressionData { impressions },
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/deletepost", rejection(ServerError))]
struct DeletePostPath();

async fn delete_post(
    DeletePostPath(): DeletePostPath,
    State(db_client): State<Arc<DbClient>>,
    State(banners): State<BannerHost>,
    _user: AuthenticatedUser,
    Json(body): Json<PostBody>,
) -> Result<Reply> {
    let banner = db_client
        .delete_post(body.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    // The row is already gone; the hosted banner is cleaned up best effort.
    banners.delete(&banner).await;

    Ok(Reply::message("Post deleted successfully"))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct LikeData {
    likes: i64,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/addlike", rejection(ServerError))]
struct AddLikePath();

async fn add_like(
    AddLikePath(): AddLikePath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<PostBody>,
) -> Result<Reply<LikeData>> {
    let update = db_client
        .like_post(user.user_id(), body.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    match update {
        LikeUpdate::Applied { likes } => {
            Ok(Reply::ok("Post liked successfully", LikeData { likes }))
        }
        LikeUpdate::Duplicate => Err(ServerError::AlreadyLiked),
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/removelike", rejection(ServerError))]
struct RemoveLikePath();

async fn remove_like(
    RemoveLikePath(): RemoveLikePath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<PostBody>,
) -> Result<Reply<LikeData>> {
    let update = db_client
        .unlike_post(user.user_id(), body.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    match update {
        LikeUpdate::Applied { likes } => {
            Ok(Reply::ok("Like removed successfully", LikeData { likes }))
        }
        LikeUpdate::Duplicate => Err(ServerError::NotLiked),
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportData {
    report_count: i64,
    is_valid: bool,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/reportpost", rejection(ServerError))]
struct ReportPostPath();

async fn report_post(
    ReportPostPath(): ReportPostPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<PostBody>,
) -> Result<Reply<ReportData>> {
    let update = db_client
        .report_post(user.user_id(), body.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    match update {
        ReportUpdate::Applied(tally) => Ok(Reply::ok(
            "Post reported successfully",
            ReportData {
                report_count: tally.report_count,
                is_valid: tally.is_valid,
            },
        )),
        ReportUpdate::Duplicate => Err(ServerError::AlreadyReported),
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/unreportpost", rejection(ServerError))]
struct UnreportPostPath();

async fn unreport_post(
    UnreportPostPath(): UnreportPostPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<PostBody>,
) -> Result<Reply<ReportData>> {
    let update = db_client
        .unreport_post(user.user_id(), body.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(body.post_id))?;

    match update {
        ReportUpdate::Applied(tally) => Ok(Reply::ok(
            "Report removed successfully",
            ReportData {
                report_count: tally.report_count,
                is_valid: tally.is_valid,
            },
        )),
        ReportUpdate::Duplicate => Err(ServerError::NotReported),
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct LikeStatusData {
    liked: bool,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/likestatus/{id}", rejection(ServerError))]
struct LikeStatusPath {
    id: Id<PostMarker>,
}

async fn like_status(
    LikeStatusPath { id }: LikeStatusPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Reply<LikeStatusData>> {
    let liked = db_client
        .check_like(user.user_id(), id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Reply::ok(
        "Like status fetched successfully",
        LikeStatusData { liked },
    ))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct ReportStatusData {
    reported: bool,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/reportstatus/{id}", rejection(ServerError))]
struct ReportStatusPath {
    id: Id<PostMarker>,
}

async fn report_status(
    ReportStatusPath { id }: ReportStatusPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Reply<ReportStatusData>> {
    let reported = db_client
        .check_report(user.user_id(), id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Reply::ok(
        "Report status fetched successfully",
        ReportStatusData { reported },
    ))
}
