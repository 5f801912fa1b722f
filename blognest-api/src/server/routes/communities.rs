use crate::server::{Reply, Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blognest_common::model::{
    Id,
    community::{
        Community, CommunityDetail, CommunityMarker, CommunityName, CreateCommunity, NewCommunity,
    },
};
use blognest_db::client::{DbClient, MembershipUpdate};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_put(create_community)
        .typed_get(get_all_communities)
        .typed_get(get_community)
        .typed_get(get_all_categories)
        .typed_get(get_user_communities)
        .typed_post(join_community)
        .typed_post(leave_community)
        .typed_post(update_name)
        .typed_post(update_description)
        .typed_delete(delete_community)
}

/// Name change and deletion are reserved for the community's admin.
async fn require_admin(
    db_client: &DbClient,
    user: &AuthenticatedUser,
    community_id: Id<CommunityMarker>,
) -> Result<()> {
    let admin = db_client
        .fetch_community_admin(community_id)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(community_id))?;

    if admin != user.user_id() {
        return Err(ServerError::AccessDenied);
    }

    Ok(())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/createcommunity", rejection(ServerError))]
struct CreateCommunityPath();

async fn create_community(
    CreateCommunityPath(): CreateCommunityPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(community): Json<CreateCommunity>,
) -> Result<Reply<CommunityDetail>> {
    if community.description.trim().is_empty() {
        return Err(ServerError::MissingField("description"));
    }
    if community.banner.trim().is_empty() {
        return Err(ServerError::MissingField("banner"));
    }
    if community.category.trim().is_empty() {
        return Err(ServerError::MissingField("category"));
    }

    let community = db_client
        .create_community(&NewCommunity {
            name: community.name,
            description: community.description,
            banner: community.banner,
            category: community.category,
            admin: user.user_id(),
        })
        .await?;

    Ok(Reply::created("Community created successfully", community))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/getAllCommunities", rejection(ServerError))]
struct GetAllCommunitiesPath();

async fn get_all_communities(
    GetAllCommunitiesPath(): GetAllCommunitiesPath,
    State(db_client): State<Arc<DbClient>>,
) -> Result<Reply<Vec<CommunityDetail>>> {
    let communities = db_client.fetch_communities().await?;

    Ok(Reply::ok("Communities fetched successfully", communities))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/getcommunity/{id}", rejection(ServerError))]
struct GetCommunityPath {
    id: Id<CommunityMarker>,
}

async fn get_community(
    GetCommunityPath { id }: GetCommunityPath,
    State(db_client): State<Arc<DbClient>>,
) -> Result<Reply<Vec<CommunityDetail>>> {
    let community = db_client
        .fetch_community(id)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(id))?;

    // Clients consume this as a one-element listing.
    Ok(Reply::ok("Community fetched successfully", vec![community]))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/getallcategories", rejection(ServerError))]
struct GetAllCategoriesPath();

async fn get_all_categories(
    GetAllCategoriesPath(): GetAllCategoriesPath,
    State(db_client): State<Arc<DbClient>>,
) -> Result<Reply<Vec<String>>> {
    let categories = db_client.fetch_categories().await?;

    Ok(Reply::ok("Categories fetched successfully", categories))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/getUserCommunities", rejection(ServerError))]
struct GetUserCommunitiesPath();

async fn get_user_communities(
    GetUserCommunitiesPath(): GetUserCommunitiesPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Reply<Vec<Community>>> {
    let communities = db_client.fetch_user_communities(user.user_id()).await?;

    Ok(Reply::ok("Communities fetched successfully", communities))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipBody {
    community_id: Id<CommunityMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/joinCommunity", rejection(ServerError))]
struct JoinCommunityPath();

async fn join_community(
    JoinCommunityPath(): JoinCommunityPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<MembershipBody>,
) -> Result<Reply> {
    db_client
        .join_community(user.user_id(), body.community_id)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(body.community_id))?;

    Ok(Reply::message("Community joined successfully"))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/leaveCommunity", rejection(ServerError))]
struct LeaveCommunityPath();

async fn leave_community(
    LeaveCommunityPath(): LeaveCommunityPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<MembershipBody>,
) -> Result<Reply> {
    let update = db_client
        .leave_community(user.user_id(), body.community_id)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(body.community_id))?;

    match update {
        MembershipUpdate::Updated => Ok(Reply::message("Community left successfully")),
        MembershipUpdate::AdminCannotLeave => Err(ServerError::AdminCannotLeave),
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateNameBody {
    community_id: Id<CommunityMarker>,
    name: CommunityName,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/updatename", rejection(ServerError))]
struct UpdateNamePath();

async fn update_name(
    UpdateNamePath(): UpdateNamePath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateNameBody>,
) -> Result<Reply> {
    require_admin(&db_client, &user, body.community_id).await?;

    db_client
        .update_community_name(body.community_id, &body.name)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(body.community_id))?;

    Ok(Reply::message("Community name updated successfully"))
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDescriptionBody {
    community_id: Id<CommunityMarker>,
    description: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/updatedescription", rejection(ServerError))]
struct UpdateDescriptionPath();

async fn update_description(
    UpdateDescriptionPath(): UpdateDescriptionPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateDescriptionBody>,
) -> Result<Reply> {
    if body.description.trim().is_empty() {
        return Err(ServerError::MissingField("description"));
    }

    require_admin(&db_client, &user, body.community_id).await?;

    db_client
        .update_community_description(body.community_id, &body.description)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(body.community_id))?;

    Ok(Reply::message("Community description updated successfully"))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/community/deletecommunity", rejection(ServerError))]
struct DeleteCommunityPath();

async fn delete_community(
    DeleteCommunityPath(): DeleteCommunityPath,
    State(db_client): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(body): Json<MembershipBody>,
) -> Result<Reply> {
    require_admin(&db_client, &user, body.community_id).await?;

    db_client
        .delete_community(body.community_id)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(body.community_id))?;

    Ok(Reply::message("Community deleted successfully"))
}
