/// Feed composition - joins posts with owners, counts and viewer state
use super::profiles::{display_profile, ProfileResolver};
use crate::domain::models::{FeedPost, Post, Profile};
use crate::error::ServiceResult;
use crate::repository::{CommentStore, LikeStore};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Owner ids of `posts`, de-duplicated, in first-seen order.
pub fn distinct_owner_ids(posts: &[Post]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    posts
        .iter()
        .map(|p| p.user_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

#[derive(Clone)]
pub struct FeedComposer {
    profiles: ProfileResolver,
    likes: Arc<dyn LikeStore>,
    comments: Arc<dyn CommentStore>,
}

impl FeedComposer {
    pub fn new(
        profiles: ProfileResolver,
        likes: Arc<dyn LikeStore>,
        comments: Arc<dyn CommentStore>,
    ) -> Self {
        Self {
            profiles,
            likes,
            comments,
        }
    }

    pub async fn compose(
        &self,
        posts: Vec<Post>,
        viewer: Option<Uuid>,
    ) -> ServiceResult<Vec<FeedPost>> {
        let owners = distinct_owner_ids(&posts);
        self.compose_page(posts, &owners, viewer).await
    }

    /// Build view models for a page of posts.
    ///
    /// Issues at most four store round trips regardless of page size: one
    /// profile lookup over `owner_ids`, one like count and one comment count
    /// over the post ids, and one like-membership lookup when a viewer is
    /// present. An empty page issues none.
    pub async fn compose_page(
        &self,
        posts: Vec<Post>,
        owner_ids: &[Uuid],
        viewer: Option<Uuid>,
    ) -> ServiceResult<Vec<FeedPost>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

        let viewer_likes = async {
            match viewer {
                Some(viewer_id) => self.likes.liked_post_ids(viewer_id, &post_ids).await,
                None => Ok(HashSet::new()),
            }
        };

        let (like_counts, comment_counts, liked) = tokio::try_join!(
            self.likes.count_likes(&post_ids),
            self.comments.count_comments(&post_ids),
            viewer_likes,
        )?;

        let profiles = self.profiles.resolve_many(owner_ids).await;

        Ok(assemble(posts, &profiles, &like_counts, &comment_counts, &liked))
    }

    /// Degraded view: display profiles and zero counts, no store access.
    pub fn bare(posts: Vec<Post>) -> Vec<FeedPost> {
        posts
            .into_iter()
            .map(|post| FeedPost {
                profile: display_profile(post.user_id),
                post,
                likes_count: 0,
                user_has_liked: false,
                comments_count: 0,
                comments: None,
            })
            .collect()
    }
}

fn assemble(
    posts: Vec<Post>,
    profiles: &HashMap<Uuid, Profile>,
    like_counts: &HashMap<Uuid, i64>,
    comment_counts: &HashMap<Uuid, i64>,
    liked: &HashSet<Uuid>,
) -> Vec<FeedPost> {
    posts
        .into_iter()
        .map(|post| FeedPost {
            profile: profiles
                .get(&post.user_id)
                .cloned()
                .unwrap_or_else(|| display_profile(post.user_id)),
            likes_count: like_counts.get(&post.id).copied().unwrap_or(0),
            user_has_liked: liked.contains(&post.id),
            comments_count: comment_counts.get(&post.id).copied().unwrap_or(0),
            comments: None,
            post,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PostDraft;
    use crate::repository::{LikeStore, MemoryStore, PostStore};

    fn composer(store: &Arc<MemoryStore>) -> FeedComposer {
        FeedComposer::new(
            ProfileResolver::new(store.clone()),
            store.clone(),
            store.clone(),
        )
    }

    async fn seed_posts(store: &MemoryStore, owners: &[Uuid]) -> Vec<Post> {
        let mut posts = Vec::new();
        for owner in owners {
            let draft = PostDraft {
                content: Some("ride report".to_string()),
                ..Default::default()
            };
            posts.push(store.insert_post(*owner, &draft).await.unwrap());
        }
        posts
    }

    #[test]
    fn owners_are_deduplicated_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let post = |owner| Post {
            id: Uuid::new_v4(),
            user_id: owner,
            content: None,
            image_url: None,
            video_url: None,
            event_id: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        assert_eq!(distinct_owner_ids(&[post(a), post(b), post(a)]), vec![a, b]);
    }

    #[tokio::test]
    async fn page_is_composed_without_per_post_round_trips() {
        let store = Arc::new(MemoryStore::new());
        let owners: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut all_owners = owners.clone();
        all_owners.extend(owners.iter().copied());
        let posts = seed_posts(&store, &all_owners).await;
        let viewer = Uuid::new_v4();
        store.insert_like(viewer, posts[0].id).await.unwrap();
        store.reset_calls();

        let feed = composer(&store).compose(posts.clone(), Some(viewer)).await.unwrap();

        assert_eq!(feed.len(), 6);
        assert_eq!(store.call_count("find_profiles"), 1);
        assert_eq!(store.call_count("count_likes"), 1);
        assert_eq!(store.call_count("count_comments"), 1);
        assert_eq!(store.call_count("liked_post_ids"), 1);
        assert_eq!(store.total_calls(), 4);

        assert_eq!(feed[0].likes_count, 1);
        assert!(feed[0].user_has_liked);
        assert!(!feed[1].user_has_liked);
        assert!(feed.iter().all(|p| p.comments.is_none()));
    }

    #[tokio::test]
    async fn anonymous_viewer_skips_membership_lookup() {
        let store = Arc::new(MemoryStore::new());
        let posts = seed_posts(&store, &[Uuid::new_v4()]).await;
        store.reset_calls();

        let feed = composer(&store).compose(posts, None).await.unwrap();

        assert_eq!(store.call_count("liked_post_ids"), 0);
        assert!(!feed[0].user_has_liked);
        assert_eq!(feed[0].profile.full_name.as_deref(), Some("User"));
    }

    #[tokio::test]
    async fn empty_page_touches_nothing() {
        let store = Arc::new(MemoryStore::new());
        let feed = composer(&store)
            .compose(Vec::new(), Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(feed.is_empty());
        assert_eq!(store.total_calls(), 0);
    }
}
