use super::{LedgerStore, PostStore};
use crate::domain::{NewPost, Post, Profile};
use crate::error::{LedgerError, LedgerResult};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed post store and vote ledger
///
/// Uniqueness comes from the `votes` primary key on (post_id, voter_id).
/// Both vote mutations lock the post row first, so add and remove on the
/// same post always take locks in the same order.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PostStore for PgStore {
    async fn create_post(&self, new_post: NewPost) -> LedgerResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, author_id, content, created_at, vote_count
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_post.author_id)
        .bind(&new_post.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn get_post(&self, post_id: Uuid) -> LedgerResult<Post> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, content, created_at, vote_count
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(LedgerError::NotFound)
    }

    async fn list_posts(&self) -> LedgerResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, content, created_at, vote_count
            FROM posts
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Served by `idx_posts_ranking` on (vote_count DESC, created_at DESC)
    async fn list_ranked(&self) -> LedgerResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, content, created_at, vote_count
            FROM posts
            ORDER BY vote_count DESC, created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn upsert_profile(&self, profile: Profile) -> LedgerResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, username)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username, updated_at = NOW()
            RETURNING id AS user_id, username
            "#,
        )
        .bind(profile.user_id)
        .bind(&profile.username)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn usernames(&self, user_ids: &[Uuid]) -> LedgerResult<HashMap<Uuid, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, username FROM profiles WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl LedgerStore for PgStore {
    async fn add_vote(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<i64> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(LedgerError::NotFound);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO votes (post_id, voter_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, voter_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(voter_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(LedgerError::AlreadyVoted);
        }

        let count: i64 = sqlx::query_scalar(
            "UPDATE posts SET vote_count = vote_count + 1 WHERE id = $1 RETURNING vote_count",
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(%post_id, %voter_id, vote_count = count, "vote added");

        Ok(count)
    }

    async fn remove_vote(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<i64> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(LedgerError::NotVoted);
        }

        let deleted = sqlx::query("DELETE FROM votes WHERE post_id = $1 AND voter_id = $2")
            .bind(post_id)
            .bind(voter_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(LedgerError::NotVoted);
        }

        let count: i64 = sqlx::query_scalar(
            r#"
            UPDATE posts SET vote_count = GREATEST(vote_count - 1, 0)
            WHERE id = $1
            RETURNING vote_count
            "#,
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(%post_id, %voter_id, vote_count = count, "vote removed");

        Ok(count)
    }

    async fn has_voted(&self, post_id: Uuid, voter_id: Uuid) -> LedgerResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM votes
                WHERE post_id = $1 AND voter_id = $2
            )
            "#,
        )
        .bind(post_id)
        .bind(voter_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn votes_by_voter(&self, voter_id: Uuid) -> LedgerResult<HashSet<Uuid>> {
        let post_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT post_id FROM votes WHERE voter_id = $1")
                .bind(voter_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(post_ids.into_iter().collect())
    }

    async fn vote_count(&self, post_id: Uuid) -> LedgerResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT vote_count FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound)
    }

    async fn reconcile_vote_counts(&self) -> LedgerResult<usize> {
        let repaired = sqlx::query(
            r#"
            UPDATE posts p
            SET vote_count = counted.total
            FROM (
                SELECT p2.id, COUNT(v.voter_id) AS total
                FROM posts p2
                LEFT JOIN votes v ON v.post_id = p2.id
                GROUP BY p2.id
            ) AS counted
            WHERE p.id = counted.id AND p.vote_count <> counted.total
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(repaired.rows_affected() as usize)
    }
}
