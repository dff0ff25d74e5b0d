//! Backing store access.
//!
//! Each entity gets a trait so services can run against PostgreSQL in
//! production and against [`MemoryStore`] in development and tests.
//! All batch operations resolve their whole id set in one round trip.
use crate::domain::models::{Comment, NewProfile, Post, PostDraft, Profile, ProfileImageKind};
use crate::error::StoreResult;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

pub mod comments;
pub mod likes;
pub mod memory;
pub mod posts;
pub mod profiles;

pub use comments::CommentRepository;
pub use likes::LikeRepository;
pub use memory::MemoryStore;
pub use posts::PostRepository;
pub use profiles::ProfileRepository;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;

    /// Batched lookup; ids without a row are simply absent from the result.
    async fn find_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Profile>>;

    /// Fails with `StoreError::UniqueViolation` when the id or handle is taken.
    async fn insert_profile(&self, profile: &NewProfile) -> StoreResult<Profile>;

    async fn update_profile_image(
        &self,
        user_id: Uuid,
        kind: ProfileImageKind,
        url: &str,
    ) -> StoreResult<Option<Profile>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, user_id: Uuid, draft: &PostDraft) -> StoreResult<Post>;

    /// Newest first by creation time.
    async fn recent_posts(&self, limit: i64) -> StoreResult<Vec<Post>>;

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>>;
}

#[async_trait]
pub trait LikeStore: Send + Sync {
    async fn like_exists(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool>;

    /// Fails with `StoreError::UniqueViolation` if the pair already exists and
    /// `StoreError::ForeignKeyViolation` if the post does not.
    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<()>;

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool>;

    /// Like counts keyed by post id; posts without likes may be absent.
    async fn count_likes(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>>;

    /// Subset of `post_ids` the user has liked.
    async fn liked_post_ids(&self, user_id: Uuid, post_ids: &[Uuid])
        -> StoreResult<HashSet<Uuid>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> StoreResult<Comment>;

    /// Oldest first by creation time.
    async fn comments_for_post(&self, post_id: Uuid) -> StoreResult<Vec<Comment>>;

    async fn find_owned_comment(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Comment>>;

    async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    /// Comment counts keyed by post id; posts without comments may be absent.
    async fn count_comments(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>>;
}

/// Handles to every store, shared by the services.
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub posts: Arc<dyn PostStore>,
    pub likes: Arc<dyn LikeStore>,
    pub comments: Arc<dyn CommentStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            posts: Arc::new(PostRepository::new(pool.clone())),
            likes: Arc::new(LikeRepository::new(pool.clone())),
            comments: Arc::new(CommentRepository::new(pool)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            profiles: store.clone(),
            posts: store.clone(),
            likes: store.clone(),
            comments: store,
        }
    }
}
