use super::ProfileStore;
use crate::domain::models::{NewProfile, Profile, ProfileImageKind};
use crate::error::StoreResult;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id, username, full_name, avatar_url, cover_image_url, bio, \
                               location, website, created_at, updated_at";

/// Repository for profiles
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let query = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
        let profile = sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn find_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {} FROM profiles WHERE id = ANY($1)", PROFILE_COLUMNS);
        let profiles = sqlx::query_as::<_, Profile>(&query)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    async fn insert_profile(&self, profile: &NewProfile) -> StoreResult<Profile> {
        let query = format!(
            r#"
            INSERT INTO profiles (id, username, full_name, avatar_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let created = sqlx::query_as::<_, Profile>(&query)
            .bind(profile.id)
            .bind(&profile.username)
            .bind(profile.full_name.as_deref())
            .bind(profile.avatar_url.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn update_profile_image(
        &self,
        user_id: Uuid,
        kind: ProfileImageKind,
        url: &str,
    ) -> StoreResult<Option<Profile>> {
        let column = match kind {
            ProfileImageKind::Avatar => "avatar_url",
            ProfileImageKind::Cover => "cover_image_url",
        };

        let query = format!(
            r#"
            UPDATE profiles
            SET {} = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            column, PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, Profile>(&query)
            .bind(user_id)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }
}
