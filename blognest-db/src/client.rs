use crate::record::{
    CommunityRecord, CredentialsRecord, FullPostRecord, UserRecord, UserSummaryRecord,
};
use blognest_common::model::community::{
    Community, CommunityDetail, CommunityMarker, CommunityName, NewCommunity,
};
use blognest_common::model::post::{NewPost, Post, PostMarker, REPORT_THRESHOLD};
use blognest_common::model::user::{
    Credentials, EmailAddress, NewUser, User, UserMarker, UserSummary,
};
use blognest_common::model::{
    BlognestSnowflake, BlognestSnowflakeGenerator, Id, ModelValidationError,
};
use blognest_common::snowflake::NodeId;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{query, query_as, query_scalar};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Tags could not be encoded for storage: {0}")]
    Tags(#[from] serde_json::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Outcome of a like or unlike attempt on an existing post.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum LikeUpdate {
    Applied { likes: i64 },
    /// The like set was already in the requested state.
    Duplicate,
}

/// Outcome of a report or unreport attempt on an existing post.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ReportUpdate {
    Applied(ReportTally),
    /// The report set was already in the requested state.
    Duplicate,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct ReportTally {
    pub report_count: i64,
    pub is_valid: bool,
}

/// Outcome of a leave attempt on an existing community.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum MembershipUpdate {
    Updated,
    AdminCannotLeave,
}

/// Outcome of a post insert.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum PostInsert {
    Created(Post),
    /// The referenced community no longer exists.
    MissingCommunity(Id<CommunityMarker>),
}

const POST_SELECT: &str = "
    SELECT
        posts.post_snowflake,
        posts.title,
        posts.banner,
        posts.content,
        posts.tags,
        posts.likes,
        posts.impressions,
        posts.report_count,
        posts.is_valid,
        posts.is_draft,
        posts.author_snowflake,
        users.first_name,
        users.last_name,
        communities.community_snowflake,
        communities.name AS community_name
    FROM
        posts
        JOIN users ON users.user_snowflake = posts.author_snowflake
        LEFT JOIN communities ON communities.community_snowflake = posts.community_snowflake
";

pub struct DbClient {
    pool: SqlitePool,
    snowflake_generator: Mutex<BlognestSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool, node_id: NodeId) -> Self {
        let snowflake_generator = Mutex::new(BlognestSnowflakeGenerator::new(node_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Connects to the given sqlite database, creating it if missing, and
    /// runs any pending migrations.
    pub async fn connect(url: &str, node_id: NodeId) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // A single connection that is never reaped keeps in-memory databases
        // alive for the lifetime of the client.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool, node_id))
    }

    fn generate_snowflake(&self) -> BlognestSnowflake {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }

    fn collect_posts(records: Vec<FullPostRecord>) -> Result<Vec<Post>> {
        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;

        Ok(posts)
    }

    /// Returns the id of the created user, or [`None`] if the email address
    /// is already taken.
    pub async fn create_user(&self, user: &NewUser) -> Result<Option<Id<UserMarker>>> {
        let id: Id<UserMarker> = self.generate_snowflake().into();

        let result = query(
            "
            INSERT INTO
                users (user_snowflake, first_name, last_name, email, password_hash, role)
            VALUES
                (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(id.snowflake().get().cast_signed())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.email.get())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Some(id)),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                user_snowflake,
                first_name,
                last_name,
                email,
                role
            FROM
                users
            WHERE
                user_snowflake = ?
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// The login projection, the only query that reads a stored password
    /// hash back out.
    pub async fn fetch_credentials(&self, email: &EmailAddress) -> Result<Option<Credentials>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT
                user_snowflake,
                role,
                password_hash
            FROM
                users
            WHERE
                email = ?
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(Credentials::try_from).transpose()?;
        Ok(credentials)
    }

    /// All posts by the given author, drafts and flagged posts included,
    /// newest first. Returns [`None`] if the user does not exist.
    pub async fn fetch_user_posts(&self, author: Id<UserMarker>) -> Result<Option<Vec<Post>>> {
        let exists =
            query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE user_snowflake = ?)")
                .bind(author.snowflake().get().cast_signed())
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Ok(None);
        }

        let records = query_as::<_, FullPostRecord>(&format!(
            "{POST_SELECT} WHERE posts.author_snowflake = ? ORDER BY posts.post_snowflake DESC"
        ))
        .bind(author.snowflake().get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Self::collect_posts(records)?))
    }

    /// Creates a community with the given user as admin and sole member.
    pub async fn create_community(&self, community: &NewCommunity) -> Result<CommunityDetail> {
        let id: Id<CommunityMarker> = self.generate_snowflake().into();

        let mut tx = self.pool.begin().await?;

        query(
            "
            INSERT INTO
                communities (community_snowflake, name, description, banner, category, admin_snowflake)
            VALUES
                (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(id.snowflake().get().cast_signed())
        .bind(community.name.get())
        .bind(&community.description)
        .bind(&community.banner)
        .bind(&community.category)
        .bind(community.admin.snowflake().get().cast_signed())
        .execute(&mut *tx)
        .await?;

        query("INSERT INTO community_members (community_snowflake, user_snowflake) VALUES (?, ?)")
            .bind(id.snowflake().get().cast_signed())
            .bind(community.admin.snowflake().get().cast_signed())
            .execute(&mut *tx)
            .await?;

        let admin = query_as::<_, UserSummaryRecord>(
            "SELECT user_snowflake, first_name, last_name FROM users WHERE user_snowflake = ?",
        )
        .bind(community.admin.snowflake().get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let admin = UserSummary::from(admin);

        Ok(CommunityDetail {
            id,
            name: community.name.clone(),
            description: community.description.clone(),
            banner: community.banner.clone(),
            category: community.category.clone(),
            admin: admin.clone(),
            members: vec![admin],
            posts: Vec::new(),
            created_at: id.created_at_unix(),
        })
    }

    pub async fn fetch_communities(&self) -> Result<Vec<CommunityDetail>> {
        let records = query_as::<_, CommunityRecord>(
            "
            SELECT
                community_snowflake,
                name,
                description,
                banner,
                category,
                admin_snowflake
            FROM
                communities
            ORDER BY
                community_snowflake ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut communities = Vec::with_capacity(records.len());
        for record in records {
            communities.push(self.resolve_community(record).await?);
        }

        Ok(communities)
    }

    pub async fn fetch_community(
        &self,
        community_id: Id<CommunityMarker>,
    ) -> Result<Option<CommunityDetail>> {
        let record = query_as::<_, CommunityRecord>(
            "
            SELECT
                community_snowflake,
                name,
                description,
                banner,
                category,
                admin_snowflake
            FROM
                communities
            WHERE
                community_snowflake = ?
            ",
        )
        .bind(community_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(Some(self.resolve_community(record).await?)),
            None => Ok(None),
        }
    }

    async fn resolve_community(&self, record: CommunityRecord) -> Result<CommunityDetail> {
        let community = Community::try_from(record)?;

        let admin = query_as::<_, UserSummaryRecord>(
            "SELECT user_snowflake, first_name, last_name FROM users WHERE user_snowflake = ?",
        )
        .bind(community.admin_id.snowflake().get().cast_signed())
        .fetch_one(&self.pool)
        .await?;

        let members = query_as::<_, UserSummaryRecord>(
            "
            SELECT
                users.user_snowflake,
                users.first_name,
                users.last_name
            FROM
                community_members
                JOIN users ON users.user_snowflake = community_members.user_snowflake
            WHERE
                community_members.community_snowflake = ?
            ORDER BY
                users.user_snowflake ASC
            ",
        )
        .bind(community.id.snowflake().get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let posts = self.community_posts(community.id).await?;

        Ok(CommunityDetail {
            id: community.id,
            name: community.name,
            description: community.description,
            banner: community.banner,
            category: community.category,
            admin: admin.into(),
            members: members.into_iter().map(Into::into).collect(),
            posts,
            created_at: community.created_at,
        })
    }

    pub async fn fetch_community_admin(
        &self,
        community_id: Id<CommunityMarker>,
    ) -> Result<Option<Id<UserMarker>>> {
        let admin = query_scalar::<_, i64>(
            "SELECT admin_snowflake FROM communities WHERE community_snowflake = ?",
        )
        .bind(community_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(admin.map(|snowflake| snowflake.cast_unsigned().into()))
    }

    /// Categories of all communities, one entry per community.
    pub async fn fetch_categories(&self) -> Result<Vec<String>> {
        let categories = query_scalar::<_, String>(
            "SELECT category FROM communities ORDER BY community_snowflake ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Communities the given user is a member of, admin seats included.
    pub async fn fetch_user_communities(&self, user: Id<UserMarker>) -> Result<Vec<Community>> {
        let records = query_as::<_, CommunityRecord>(
            "
            SELECT
                communities.community_snowflake,
                communities.name,
                communities.description,
                communities.banner,
                communities.category,
                communities.admin_snowflake
            FROM
                community_members
                JOIN communities ON communities.community_snowflake = community_members.community_snowflake
            WHERE
                community_members.user_snowflake = ?
            ORDER BY
                communities.community_snowflake ASC
            ",
        )
        .bind(user.snowflake().get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let communities = records
            .into_iter()
            .map(Community::try_from)
            .collect::<Result<_, _>>()?;

        Ok(communities)
    }

    /// Adds the user to the community, a no-op if they are already a member.
    /// Returns [`None`] if the community does not exist.
    pub async fn join_community(
        &self,
        user: Id<UserMarker>,
        community: Id<CommunityMarker>,
    ) -> Result<Option<()>> {
        let result = query(
            "INSERT OR IGNORE INTO community_members (community_snowflake, user_snowflake) VALUES (?, ?)",
        )
        .bind(community.snowflake().get().cast_signed())
        .bind(user.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Some(())),
            // Users are never deleted, so a foreign key failure means the
            // community is gone.
            Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the user from the community, a no-op if they are not a member.
    /// The admin cannot leave their own community. Returns [`None`] if the
    /// community does not exist.
    pub async fn leave_community(
        &self,
        user: Id<UserMarker>,
        community: Id<CommunityMarker>,
    ) -> Result<Option<MembershipUpdate>> {
        let Some(admin) = self.fetch_community_admin(community).await? else {
            return Ok(None);
        };

        if admin == user {
            return Ok(Some(MembershipUpdate::AdminCannotLeave));
        }

        query("DELETE FROM community_members WHERE community_snowflake = ? AND user_snowflake = ?")
            .bind(community.snowflake().get().cast_signed())
            .bind(user.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(Some(MembershipUpdate::Updated))
    }

    pub async fn update_community_name(
        &self,
        community_id: Id<CommunityMarker>,
        name: &CommunityName,
    ) -> Result<Option<()>> {
        let result = query("UPDATE communities SET name = ? WHERE community_snowflake = ?")
            .bind(name.get())
            .bind(community_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(()))
    }

    pub async fn update_community_description(
        &self,
        community_id: Id<CommunityMarker>,
        description: &str,
    ) -> Result<Option<()>> {
        let result = query("UPDATE communities SET description = ? WHERE community_snowflake = ?")
            .bind(description)
            .bind(community_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(()))
    }

    /// Deletes the community. Memberships cascade away, posts in the
    /// community fall back to standalone posts.
    pub async fn delete_community(&self, community_id: Id<CommunityMarker>) -> Result<Option<()>> {
        let result = query("DELETE FROM communities WHERE community_snowflake = ?")
            .bind(community_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(()))
    }

    async fn community_exists(&self, community_id: Id<CommunityMarker>) -> Result<bool> {
        let exists = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM communities WHERE community_snowflake = ?)",
        )
        .bind(community_id.snowflake().get().cast_signed())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Inserts the post. A community that vanished before the insert landed
    /// is reported as [`PostInsert::MissingCommunity`], not as an error.
    pub async fn create_post(&self, post: &NewPost) -> Result<PostInsert> {
        let id: Id<PostMarker> = self.generate_snowflake().into();
        let tags = serde_json::to_string(&post.tags)?;

        let result = query(
            "
            INSERT INTO
                posts (post_snowflake, title, banner, content, tags, author_snowflake, community_snowflake, is_draft)
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(id.snowflake().get().cast_signed())
        .bind(&post.title)
        .bind(&post.banner)
        .bind(&post.content)
        .bind(tags)
        .bind(post.author.snowflake().get().cast_signed())
        .bind(
            post.community
                .map(|community| community.snowflake().get().cast_signed()),
        )
        .bind(post.is_draft)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(PostInsert::Created(self.fetch_post_required(id).await?)),
            // Users are never deleted, so a foreign key failure means the
            // community is gone.
            Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => {
                match post.community {
                    Some(community) => Ok(PostInsert::MissingCommunity(community)),
                    None => Err(sqlx::Error::Database(err).into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The public feed: published, unflagged posts, newest first.
    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "{POST_SELECT} WHERE posts.is_draft = 0 AND posts.is_valid = 1 ORDER BY posts.post_snowflake DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Self::collect_posts(records)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "{POST_SELECT} WHERE posts.post_snowflake = ?"
        ))
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn fetch_post_required(&self, post_id: Id<PostMarker>) -> Result<Post> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "{POST_SELECT} WHERE posts.post_snowflake = ?"
        ))
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_one(&self.pool)
        .await?;

        Ok(Post::try_from(record)?)
    }

    /// Published, unflagged posts in the community, newest first.
    /// Returns [`None`] if the community does not exist.
    pub async fn fetch_community_posts(
        &self,
        community: Id<CommunityMarker>,
    ) -> Result<Option<Vec<Post>>> {
        if !self.community_exists(community).await? {
            return Ok(None);
        }

        Ok(Some(self.community_posts(community).await?))
    }

    async fn community_posts(&self, community: Id<CommunityMarker>) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "{POST_SELECT} WHERE posts.community_snowflake = ? AND posts.is_draft = 0 AND posts.is_valid = 1 ORDER BY posts.post_snowflake DESC"
        ))
        .bind(community.snowflake().get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        Self::collect_posts(records)
    }

    /// Published, unflagged posts carrying at least one of the given tags,
    /// newest first.
    pub async fn fetch_posts_by_tags(&self, tags: &[String]) -> Result<Vec<Post>> {
        let tags = serde_json::to_string(tags)?;

        let records = query_as::<_, FullPostRecord>(&format!(
            "
            {POST_SELECT}
            WHERE
                posts.is_draft = 0
                AND posts.is_valid = 1
                AND EXISTS (
                    SELECT 1 FROM json_each(posts.tags) AS post_tag
                    WHERE post_tag.value IN (SELECT value FROM json_each(?))
                )
            ORDER BY
                posts.post_snowflake DESC
            "
        ))
        .bind(tags)
        .fetch_all(&self.pool)
        .await?;

        Self::collect_posts(records)
    }

    /// Posts with at least one standing report, most reported first.
    pub async fn fetch_reported_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "{POST_SELECT} WHERE posts.report_count >= 1 ORDER BY posts.report_count DESC, posts.post_snowflake DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Self::collect_posts(records)
    }

    pub async fn update_post_title(
        &self,
        post_id: Id<PostMarker>,
        title: &str,
    ) -> Result<Option<()>> {
        let result = query("UPDATE posts SET title = ? WHERE post_snowflake = ?")
            .bind(title)
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(()))
    }

    pub async fn update_post_content(
        &self,
        post_id: Id<PostMarker>,
        content: &str,
    ) -> Result<Option<()>> {
        let result = query("UPDATE posts SET content = ? WHERE post_snowflake = ?")
            .bind(content)
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(()))
    }

    pub async fn fetch_post_author(
        &self,
        post_id: Id<PostMarker>,
    ) -> Result<Option<Id<UserMarker>>> {
        let author =
            query_scalar::<_, i64>("SELECT author_snowflake FROM posts WHERE post_snowflake = ?")
                .bind(post_id.snowflake().get().cast_signed())
                .fetch_optional(&self.pool)
                .await?;

        Ok(author.map(|snowflake| snowflake.cast_unsigned().into()))
    }

    /// Publishing is one way; publishing an already published post is a
    /// no-op.
    pub async fn publish_post(&self, post_id: Id<PostMarker>) -> Result<Option<()>> {
        let result = query("UPDATE posts SET is_draft = 0 WHERE post_snowflake = ?")
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(()))
    }

    /// Deletes the post along with its likes and reports, returning the
    /// banner URL so the caller can release the hosted image.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<Option<String>> {
        let mut tx = self.pool.begin().await?;

        let banner = query_scalar::<_, String>("SELECT banner FROM posts WHERE post_snowflake = ?")
            .bind(post_id.snowflake().get().cast_signed())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(banner) = banner else {
            return Ok(None);
        };

        query("DELETE FROM posts WHERE post_snowflake = ?")
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(banner))
    }

    /// Bumps the impression counter, returning the new total.
    pub async fn add_impression(&self, post_id: Id<PostMarker>) -> Result<Option<i64>> {
        let impressions = query_scalar::<_, i64>(
            "UPDATE posts SET impressions = impressions + 1 WHERE post_snowflake = ? RETURNING impressions",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(impressions)
    }

    /// Records a like and bumps the counter. Each user counts at most once
    /// per post. Returns [`None`] if the post does not exist.
    pub async fn like_post(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Option<LikeUpdate>> {
        let mut tx = self.pool.begin().await?;

        let result = query(
            "INSERT OR IGNORE INTO post_likes (user_snowflake, post_snowflake) VALUES (?, ?)",
        )
        .bind(user.snowflake().get().cast_signed())
        .bind(post.snowflake().get().cast_signed())
        .execute(&mut *tx)
        .await;

        let result = match result {
            Ok(result) => result,
            // Users are never deleted, so a foreign key failure means the
            // post is gone.
            Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if result.rows_affected() == 0 {
            return Ok(Some(LikeUpdate::Duplicate));
        }

        let likes = query_scalar::<_, i64>(
            "UPDATE posts SET likes = likes + 1 WHERE post_snowflake = ? RETURNING likes",
        )
        .bind(post.snowflake().get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(LikeUpdate::Applied { likes }))
    }

    /// Withdraws a like and lowers the counter. Returns [`None`] if the post
    /// does not exist.
    pub async fn unlike_post(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Option<LikeUpdate>> {
        let mut tx = self.pool.begin().await?;

        let exists =
            query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM posts WHERE post_snowflake = ?)")
                .bind(post.snowflake().get().cast_signed())
                .fetch_one(&mut *tx)
                .await?;

        if !exists {
            return Ok(None);
        }

        let result =
            query("DELETE FROM post_likes WHERE user_snowflake = ? AND post_snowflake = ?")
                .bind(user.snowflake().get().cast_signed())
                .bind(post.snowflake().get().cast_signed())
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(Some(LikeUpdate::Duplicate));
        }

        let likes = query_scalar::<_, i64>(
            "UPDATE posts SET likes = likes - 1 WHERE post_snowflake = ? RETURNING likes",
        )
        .bind(post.snowflake().get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(LikeUpdate::Applied { likes }))
    }

    /// Records a report. Once the tally reaches the report threshold the
    /// post is flagged invalid and drops out of public feeds. Returns
    /// [`None`] if the post does not exist.
    pub async fn report_post(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Option<ReportUpdate>> {
        let mut tx = self.pool.begin().await?;

        let result = query(
            "INSERT OR IGNORE INTO post_reports (post_snowflake, user_snowflake) VALUES (?, ?)",
        )
        .bind(post.snowflake().get().cast_signed())
        .bind(user.snowflake().get().cast_signed())
        .execute(&mut *tx)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if result.rows_affected() == 0 {
            return Ok(Some(ReportUpdate::Duplicate));
        }

        // The right hand side of the update sees the old report_count.
        let (report_count, is_valid) = query_as::<_, (i64, bool)>(
            "
            UPDATE
                posts
            SET
                report_count = report_count + 1,
                is_valid = CASE WHEN report_count + 1 >= ? THEN 0 ELSE is_valid END
            WHERE
                post_snowflake = ?
            RETURNING
                report_count, is_valid
            ",
        )
        .bind(REPORT_THRESHOLD)
        .bind(post.snowflake().get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(ReportUpdate::Applied(ReportTally {
            report_count,
            is_valid,
        })))
    }

    /// Withdraws a report and lowers the tally. A post already flagged
    /// invalid stays invalid. Returns [`None`] if the post does not exist.
    pub async fn unreport_post(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Option<ReportUpdate>> {
        let mut tx = self.pool.begin().await?;

        let exists =
            query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM posts WHERE post_snowflake = ?)")
                .bind(post.snowflake().get().cast_signed())
                .fetch_one(&mut *tx)
                .await?;

        if !exists {
            return Ok(None);
        }

        let result =
            query("DELETE FROM post_reports WHERE post_snowflake = ? AND user_snowflake = ?")
                .bind(post.snowflake().get().cast_signed())
                .bind(user.snowflake().get().cast_signed())
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(Some(ReportUpdate::Duplicate));
        }

        let (report_count, is_valid) = query_as::<_, (i64, bool)>(
            "
            UPDATE
                posts
            SET
                report_count = report_count - 1
            WHERE
                post_snowflake = ?
            RETURNING
                report_count, is_valid
            ",
        )
        .bind(post.snowflake().get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(ReportUpdate::Applied(ReportTally {
            report_count,
            is_valid,
        })))
    }

    /// Whether the given user has a standing like on the post.
    /// Returns [`None`] if the post does not exist.
    pub async fn check_like(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Option<bool>> {
        let (post_exists, liked) = query_as::<_, (bool, bool)>(
            "
            SELECT
                EXISTS (SELECT 1 FROM posts WHERE post_snowflake = ?),
                EXISTS (SELECT 1 FROM post_likes WHERE user_snowflake = ? AND post_snowflake = ?)
            ",
        )
        .bind(post.snowflake().get().cast_signed())
        .bind(user.snowflake().get().cast_signed())
        .bind(post.snowflake().get().cast_signed())
        .fetch_one(&self.pool)
        .await?;

        Ok(post_exists.then_some(liked))
    }

    /// Whether the given user has a standing report on the post.
    /// Returns [`None`] if the post does not exist.
    pub async fn check_report(
        &self,
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Option<bool>> {
        let (post_exists, reported) = query_as::<_, (bool, bool)>(
            "
            SELECT
                EXISTS (SELECT 1 FROM posts WHERE post_snowflake = ?),
                EXISTS (SELECT 1 FROM post_reports WHERE post_snowflake = ? AND user_snowflake = ?)
            ",
        )
        .bind(post.snowflake().get().cast_signed())
        .bind(post.snowflake().get().cast_signed())
        .bind(user.snowflake().get().cast_signed())
        .fetch_one(&self.pool)
        .await?;

        Ok(post_exists.then_some(reported))
    }
}
