use blognest_common::model::{
    Id, ModelValidationError,
    community::{Community, CommunityMarker, CommunityName},
    post::{CommunityRef, Post, PostMarker},
    user::{Credentials, EmailAddress, Role, User, UserMarker, UserSummary},
};
use std::str::FromStr;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct UserSummaryRecord {
    pub user_snowflake: i64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct CredentialsRecord {
    pub user_snowflake: i64,
    pub role: String,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct CommunityRecord {
    pub community_snowflake: i64,
    pub name: String,
    pub description: String,
    pub banner: String,
    pub category: String,
    pub admin_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct FullPostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub banner: String,
    pub content: String,
    pub tags: String,
    pub likes: i64,
    pub impressions: i64,
    pub report_count: i64,
    pub is_valid: bool,
    pub is_draft: bool,
    pub author_snowflake: i64,
    pub first_name: String,
    pub last_name: String,
    pub community_snowflake: Option<i64>,
    pub community_name: Option<String>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let id: Id<UserMarker> = value.user_snowflake.cast_unsigned().into();

        Ok(Self {
            id,
            first_name: value.first_name,
            last_name: value.last_name,
            email: EmailAddress::new(value.email)?,
            role: Role::from_str(&value.role)?,
            created_at: id.created_at_unix(),
        })
    }
}

impl From<UserSummaryRecord> for UserSummary {
    fn from(value: UserSummaryRecord) -> Self {
        Self {
            id: value.user_snowflake.cast_unsigned().into(),
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

impl TryFrom<CredentialsRecord> for Credentials {
    type Error = ModelValidationError;

    fn try_from(value: CredentialsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: value.user_snowflake.cast_unsigned().into(),
            role: Role::from_str(&value.role)?,
            password_hash: value.password_hash,
        })
    }
}

impl TryFrom<CommunityRecord> for Community {
    type Error = ModelValidationError;

    fn try_from(value: CommunityRecord) -> Result<Self, Self::Error> {
        let id: Id<CommunityMarker> = value.community_snowflake.cast_unsigned().into();

        Ok(Self {
            id,
            name: CommunityName::new(value.name)?,
            description: value.description,
            banner: value.banner,
            category: value.category,
            admin_id: value.admin_snowflake.cast_unsigned().into(),
            created_at: id.created_at_unix(),
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        let id: Id<PostMarker> = value.post_snowflake.cast_unsigned().into();

        let community = match (value.community_snowflake, value.community_name) {
            (Some(snowflake), Some(name)) => Some(CommunityRef {
                id: snowflake.cast_unsigned().into(),
                name: CommunityName::new(name)?,
            }),
            _ => None,
        };

        Ok(Self {
            id,
            title: value.title,
            banner: value.banner,
            content: value.content,
            // The column is only ever written by us; unreadable tags degrade to none.
            tags: serde_json::from_str(&value.tags).unwrap_or_default(),
            author: UserSummary {
                id: value.author_snowflake.cast_unsigned().into(),
                first_name: value.first_name,
                last_name: value.last_name,
            },
            community,
            likes: value.likes,
            impressions: value.impressions,
            report_count: value.report_count,
            is_valid: value.is_valid,
            is_draft: value.is_draft,
            created_at: id.created_at_unix(),
        })
    }
}
