use super::PostStore;
use crate::domain::models::{Post, PostDraft};
use crate::error::StoreResult;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for social_posts
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PostRepository {
    async fn insert_post(&self, user_id: Uuid, draft: &PostDraft) -> StoreResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO social_posts (user_id, content, image_url, video_url, event_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, content, image_url, video_url, event_id, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(draft.content.as_deref())
        .bind(draft.image_url.as_deref())
        .bind(draft.video_url.as_deref())
        .bind(draft.event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn recent_posts(&self, limit: i64) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, content, image_url, video_url, event_id, created_at, updated_at
            FROM social_posts
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, content, image_url, video_url, event_id, created_at, updated_at
            FROM social_posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }
}
