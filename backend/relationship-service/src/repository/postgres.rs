use crate::domain::models::{
    Comment, ContentKind, MediaPayload, MediaRecord, NewComment, Profile, ReactableContent,
    Reaction, ReactionType,
};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::{GraphStore, GraphTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

/// PostgreSQL-backed graph store
#[derive(Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GraphStore for PgGraphStore {
    async fn begin(&self) -> ServiceResult<Box<dyn GraphTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgGraphTx { tx }))
    }

    async fn ping(&self) -> ServiceResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Unit of work over one PostgreSQL transaction. Dropping it rolls back.
pub struct PgGraphTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: i64,
    owner: String,
    kind: String,
    num_of_comments: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for ReactableContent {
    type Error = ServiceError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        Ok(ReactableContent {
            id: row.id,
            owner: row.owner,
            kind: row.kind.parse().map_err(ServiceError::Internal)?,
            num_of_comments: row.num_of_comments,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    author: String,
    commented_on: i64,
    text_data: String,
    num_of_comments: i64,
    created_at: DateTime<Utc>,
    media_id: i64,
    media_data: Vec<u8>,
    media_mime_type: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            author: row.author,
            commented_on: row.commented_on,
            text: row.text_data,
            media: MediaRecord {
                id: row.media_id,
                data: row.media_data,
                mime_type: row.media_mime_type,
            },
            num_of_comments: row.num_of_comments,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReactionRow {
    id: i64,
    reactor: String,
    reaction_type: String,
    content_id: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReactionRow> for Reaction {
    type Error = ServiceError;

    fn try_from(row: ReactionRow) -> Result<Self, Self::Error> {
        Ok(Reaction {
            id: row.id,
            reactor: row.reactor,
            reaction_type: row.reaction_type.parse().map_err(ServiceError::Internal)?,
            content_id: row.content_id,
            created_at: row.created_at,
        })
    }
}

const CONTENT_COLUMNS: &str = "id, owner, kind, num_of_comments, created_at";

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.author, c.commented_on, c.text_data,
           rc.num_of_comments, rc.created_at,
           m.id AS media_id, m.data AS media_data, m.mime_type AS media_mime_type
    FROM comments c
    JOIN reactable_content rc ON rc.id = c.id
    JOIN media_records m ON m.id = c.media_id
"#;

const REACTION_COLUMNS: &str = "id, reactor, reaction_type, content_id, created_at";

#[async_trait]
impl GraphTx for PgGraphTx {
    async fn insert_content(
        &mut self,
        owner: &str,
        kind: ContentKind,
    ) -> ServiceResult<ReactableContent> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "INSERT INTO reactable_content (owner, kind) VALUES ($1, $2) RETURNING {}",
            CONTENT_COLUMNS
        ))
        .bind(owner)
        .bind(kind.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn find_content(&mut self, id: i64) -> ServiceResult<Option<ReactableContent>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {} FROM reactable_content WHERE id = $1",
            CONTENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn lock_content(&mut self, id: i64) -> ServiceResult<Option<ReactableContent>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {} FROM reactable_content WHERE id = $1 FOR UPDATE",
            CONTENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn adjust_comment_count(&mut self, id: i64, delta: i64) -> ServiceResult<i64> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE reactable_content
            SET num_of_comments = num_of_comments + $2
            WHERE id = $1
            RETURNING num_of_comments
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;

        count.ok_or(ServiceError::ContentNotFound(id))
    }

    async fn find_comment(&mut self, id: i64) -> ServiceResult<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!("{} WHERE c.id = $1", COMMENT_SELECT))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(Comment::from))
    }

    async fn comments_on(&mut self, content_id: i64) -> ServiceResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{} WHERE c.commented_on = $1 ORDER BY c.id ASC",
            COMMENT_SELECT
        ))
        .bind(content_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn insert_comment(&mut self, comment: NewComment) -> ServiceResult<Comment> {
        let content = self
            .insert_content(&comment.author, ContentKind::Comment)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO comments (id, commented_on, author, media_id, text_data)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(content.id)
        .bind(comment.commented_on)
        .bind(&comment.author)
        .bind(comment.media_id)
        .bind(&comment.text)
        .execute(&mut *self.tx)
        .await?;

        self.find_comment(content.id).await?.ok_or_else(|| {
            ServiceError::Internal(format!("comment {} vanished after insert", content.id))
        })
    }

    async fn update_comment_text(&mut self, id: i64, text: &str) -> ServiceResult<()> {
        let affected = sqlx::query("UPDATE comments SET text_data = $2 WHERE id = $1")
            .bind(id)
            .bind(text)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(ServiceError::CommentNotFound(id));
        }
        Ok(())
    }

    async fn delete_comment(&mut self, id: i64) -> ServiceResult<()> {
        let affected = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(ServiceError::CommentNotFound(id));
        }

        sqlx::query("DELETE FROM reactable_content WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_media(&mut self, payload: &MediaPayload) -> ServiceResult<MediaRecord> {
        let record = sqlx::query_as::<_, MediaRecord>(
            r#"
            INSERT INTO media_records (data, mime_type)
            VALUES ($1, $2)
            RETURNING id, data, mime_type
            "#,
        )
        .bind(&payload.data)
        .bind(&payload.mime_type)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(record)
    }

    async fn replace_media_payload(
        &mut self,
        id: i64,
        payload: &MediaPayload,
    ) -> ServiceResult<()> {
        let affected =
            sqlx::query("UPDATE media_records SET data = $2, mime_type = $3 WHERE id = $1")
                .bind(id)
                .bind(&payload.data)
                .bind(&payload.mime_type)
                .execute(&mut *self.tx)
                .await?
                .rows_affected();

        if affected == 0 {
            return Err(ServiceError::Internal(format!(
                "media record {} does not exist",
                id
            )));
        }
        Ok(())
    }

    async fn delete_media(&mut self, id: i64) -> ServiceResult<()> {
        sqlx::query("DELETE FROM media_records WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn find_reaction(&mut self, id: i64) -> ServiceResult<Option<Reaction>> {
        let row = sqlx::query_as::<_, ReactionRow>(&format!(
            "SELECT {} FROM reactions WHERE id = $1",
            REACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_reaction_by(
        &mut self,
        reactor: &str,
        content_id: i64,
    ) -> ServiceResult<Option<Reaction>> {
        let row = sqlx::query_as::<_, ReactionRow>(&format!(
            "SELECT {} FROM reactions WHERE reactor = $1 AND content_id = $2",
            REACTION_COLUMNS
        ))
        .bind(reactor)
        .bind(content_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn reactions_on(&mut self, content_id: i64) -> ServiceResult<Vec<Reaction>> {
        let rows = sqlx::query_as::<_, ReactionRow>(&format!(
            "SELECT {} FROM reactions WHERE content_id = $1 ORDER BY id ASC",
            REACTION_COLUMNS
        ))
        .bind(content_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert_reaction(
        &mut self,
        reactor: &str,
        content_id: i64,
        reaction_type: ReactionType,
    ) -> ServiceResult<Reaction> {
        let row = sqlx::query_as::<_, ReactionRow>(&format!(
            "INSERT INTO reactions (reactor, content_id, reaction_type) VALUES ($1, $2, $3) RETURNING {}",
            REACTION_COLUMNS
        ))
        .bind(reactor)
        .bind(content_id)
        .bind(reaction_type.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn update_reaction_type(
        &mut self,
        id: i64,
        reaction_type: ReactionType,
    ) -> ServiceResult<Reaction> {
        let row = sqlx::query_as::<_, ReactionRow>(&format!(
            "UPDATE reactions SET reaction_type = $2 WHERE id = $1 RETURNING {}",
            REACTION_COLUMNS
        ))
        .bind(id)
        .bind(reaction_type.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.ok_or(ServiceError::ReactionNotFound(id))?.try_into()
    }

    async fn delete_reaction(&mut self, id: i64) -> ServiceResult<()> {
        sqlx::query("DELETE FROM reactions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_reactions_on(&mut self, content_id: i64) -> ServiceResult<u64> {
        let result = sqlx::query("DELETE FROM reactions WHERE content_id = $1")
            .bind(content_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_profile(&mut self, username: &str) -> ServiceResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT username, created_at FROM profiles WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(profile)
    }

    async fn insert_profile(&mut self, username: &str) -> ServiceResult<Profile> {
        sqlx::query(
            r#"
            INSERT INTO profiles (username)
            VALUES ($1)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .execute(&mut *self.tx)
        .await?;

        self.find_profile(username).await?.ok_or_else(|| {
            ServiceError::Internal(format!("profile {} vanished after insert", username))
        })
    }

    async fn insert_follow(&mut self, follower: &str, followee: &str) -> ServiceResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO profile_follows (follower, followee)
            VALUES ($1, $2)
            ON CONFLICT (follower, followee) DO NOTHING
            "#,
        )
        .bind(follower)
        .bind(followee)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&mut self, follower: &str, followee: &str) -> ServiceResult<bool> {
        let result =
            sqlx::query("DELETE FROM profile_follows WHERE follower = $1 AND followee = $2")
                .bind(follower)
                .bind(followee)
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&mut self, follower: &str, followee: &str) -> ServiceResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM profile_follows
                WHERE follower = $1 AND followee = $2
            )
            "#,
        )
        .bind(follower)
        .bind(followee)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn followers_of(&mut self, username: &str) -> ServiceResult<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT p.username, p.created_at
            FROM profile_follows f
            JOIN profiles p ON p.username = f.follower
            WHERE f.followee = $1
            ORDER BY p.username ASC
            "#,
        )
        .bind(username)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(profiles)
    }

    async fn following_of(&mut self, username: &str) -> ServiceResult<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT p.username, p.created_at
            FROM profile_follows f
            JOIN profiles p ON p.username = f.followee
            WHERE f.follower = $1
            ORDER BY p.username ASC
            "#,
        )
        .bind(username)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(profiles)
    }

    async fn commit(self: Box<Self>) -> ServiceResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
