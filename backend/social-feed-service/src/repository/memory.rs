//! In-process store with the same constraint semantics as the PostgreSQL
//! schema: unique (user, post) likes, unique profile handles and post
//! foreign keys. Used with `STORE_BACKEND=memory` and by the test suites.
use super::{CommentStore, LikeStore, PostStore, ProfileStore};
use crate::domain::models::{
    Comment, Like, NewProfile, Post, PostDraft, Profile, ProfileImageKind,
};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    posts: Vec<Post>,
    likes: Vec<Like>,
    comments: Vec<Comment>,
    clock: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing timestamps so creation order is total.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(ts);
        ts
    }

    fn post_exists(&self, post_id: Uuid) -> bool {
        self.posts.iter().any(|p| p.id == post_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable backend: every operation fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of times `operation` was invoked.
    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    pub fn profile_rows(&self) -> usize {
        lock(&self.tables).profiles.len()
    }

    pub fn post_rows(&self) -> usize {
        lock(&self.tables).posts.len()
    }

    pub fn like_rows(&self, post_id: Uuid) -> usize {
        lock(&self.tables)
            .likes
            .iter()
            .filter(|l| l.post_id == post_id)
            .count()
    }

    pub fn comment_rows(&self, post_id: Uuid) -> usize {
        lock(&self.tables)
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .count()
    }

    /// Records the call and yields once, like a real round trip would.
    async fn round_trip(&self, operation: &'static str) -> StoreResult<MutexGuard<'_, Tables>> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        tokio::task::yield_now().await;

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "memory store offline during {}",
                operation
            )));
        }

        Ok(lock(&self.tables))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let tables = self.round_trip("find_profile").await?;
        Ok(tables.profiles.get(&user_id).cloned())
    }

    async fn find_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Profile>> {
        let tables = self.round_trip("find_profiles").await?;
        Ok(user_ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| tables.profiles.get(id).cloned())
            .collect())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> StoreResult<Profile> {
        let mut tables = self.round_trip("insert_profile").await?;

        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::UniqueViolation("profiles_pkey".to_string()));
        }
        if tables
            .profiles
            .values()
            .any(|p| p.username == profile.username)
        {
            return Err(StoreError::UniqueViolation(
                "profiles_username_key".to_string(),
            ));
        }

        let now = tables.next_timestamp();
        let created = Profile {
            id: profile.id,
            username: profile.username.clone(),
            full_name: profile.full_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            cover_image_url: None,
            bio: None,
            location: None,
            website: None,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_profile_image(
        &self,
        user_id: Uuid,
        kind: ProfileImageKind,
        url: &str,
    ) -> StoreResult<Option<Profile>> {
        let mut tables = self.round_trip("update_profile_image").await?;
        let now = tables.next_timestamp();

        Ok(tables.profiles.get_mut(&user_id).map(|profile| {
            match kind {
                ProfileImageKind::Avatar => profile.avatar_url = Some(url.to_string()),
                ProfileImageKind::Cover => profile.cover_image_url = Some(url.to_string()),
            }
            profile.updated_at = now;
            profile.clone()
        }))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, user_id: Uuid, draft: &PostDraft) -> StoreResult<Post> {
        let mut tables = self.round_trip("insert_post").await?;
        let now = tables.next_timestamp();
        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            content: draft.content.clone(),
            image_url: draft.image_url.clone(),
            video_url: draft.video_url.clone(),
            event_id: draft.event_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn recent_posts(&self, limit: i64) -> StoreResult<Vec<Post>> {
        let tables = self.round_trip("recent_posts").await?;
        let mut posts = tables.posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(posts)
    }

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
        let tables = self.round_trip("find_post").await?;
        Ok(tables.posts.iter().find(|p| p.id == post_id).cloned())
    }
}

#[async_trait]
impl LikeStore for MemoryStore {
    async fn like_exists(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool> {
        let tables = self.round_trip("like_exists").await?;
        Ok(tables
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.post_id == post_id))
    }

    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        let mut tables = self.round_trip("insert_like").await?;

        if !tables.post_exists(post_id) {
            return Err(StoreError::ForeignKeyViolation(
                "likes_post_id_fkey".to_string(),
            ));
        }
        if tables
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.post_id == post_id)
        {
            return Err(StoreError::UniqueViolation("likes_pkey".to_string()));
        }

        let created_at = tables.next_timestamp();
        tables.likes.push(Like {
            user_id,
            post_id,
            created_at,
        });
        Ok(())
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.round_trip("delete_like").await?;
        let before = tables.likes.len();
        tables
            .likes
            .retain(|l| !(l.user_id == user_id && l.post_id == post_id));
        Ok(tables.likes.len() < before)
    }

    async fn count_likes(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        let tables = self.round_trip("count_likes").await?;
        let wanted: HashSet<&Uuid> = post_ids.iter().collect();
        let mut counts = HashMap::new();
        for like in tables.likes.iter().filter(|l| wanted.contains(&l.post_id)) {
            *counts.entry(like.post_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>> {
        let tables = self.round_trip("liked_post_ids").await?;
        let wanted: HashSet<&Uuid> = post_ids.iter().collect();
        Ok(tables
            .likes
            .iter()
            .filter(|l| l.user_id == user_id && wanted.contains(&l.post_id))
            .map(|l| l.post_id)
            .collect())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> StoreResult<Comment> {
        let mut tables = self.round_trip("insert_comment").await?;

        if !tables.post_exists(post_id) {
            return Err(StoreError::ForeignKeyViolation(
                "comments_post_id_fkey".to_string(),
            ));
        }

        let now = tables.next_timestamp();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comments_for_post(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        let tables = self.round_trip("comments_for_post").await?;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn find_owned_comment(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Comment>> {
        let tables = self.round_trip("find_owned_comment").await?;
        Ok(tables
            .comments
            .iter()
            .find(|c| c.id == comment_id && c.user_id == user_id)
            .cloned())
    }

    async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.round_trip("delete_comment").await?;
        let before = tables.comments.len();
        tables
            .comments
            .retain(|c| !(c.id == comment_id && c.user_id == user_id));
        Ok(tables.comments.len() < before)
    }

    async fn count_comments(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        let tables = self.round_trip("count_comments").await?;
        let wanted: HashSet<&Uuid> = post_ids.iter().collect();
        let mut counts = HashMap::new();
        for comment in tables.comments.iter().filter(|c| wanted.contains(&c.post_id)) {
            *counts.entry(comment.post_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
