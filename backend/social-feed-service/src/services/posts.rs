/// Post service - handles post creation and feed reads
use super::comments::CommentService;
use super::feed::FeedComposer;
use super::profiles::ProfileResolver;
use crate::config::FeedConfig;
use crate::domain::models::{FeedPost, Post, PostDraft, Profile};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::social::{
    outcome, record_action, record_fallback, FEED_COMPOSE_DURATION_SECONDS,
};
use crate::middleware::{require_session, Session};
use crate::repository::PostStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

const PLACEHOLDER_POST_ID: Uuid = Uuid::from_u128(0x5c00_7e40_0000_4000_8000_0000_0000_0001);
const PLACEHOLDER_USER_ID: Uuid = Uuid::from_u128(0x5c00_7e40_0000_4000_8000_0000_0000_0002);

/// Parse the optional `eventId` form field. Blank means absent.
pub fn parse_event_id(raw: Option<&str>) -> ServiceResult<Option<Uuid>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| ServiceError::Validation("Invalid event id".to_string())),
    }
}

/// Fixed feed shown when posts cannot be read at all.
pub fn placeholder_feed() -> Vec<FeedPost> {
    let now = Utc::now();
    vec![FeedPost {
        post: Post {
            id: PLACEHOLDER_POST_ID,
            user_id: PLACEHOLDER_USER_ID,
            content: Some(
                "Welcome to the social feed! This is a placeholder post while we set up the database."
                    .to_string(),
            ),
            image_url: None,
            video_url: None,
            event_id: None,
            created_at: now,
            updated_at: now,
        },
        profile: Profile {
            id: PLACEHOLDER_USER_ID,
            username: "scooter_enthusiast".to_string(),
            full_name: Some("Scooter Enthusiast".to_string()),
            avatar_url: Some("/images/avatars/default-avatar.png".to_string()),
            cover_image_url: None,
            bio: None,
            location: None,
            website: None,
            created_at: now,
            updated_at: now,
        },
        likes_count: 0,
        user_has_liked: false,
        comments_count: 0,
        comments: Some(Vec::new()),
    }]
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostStore>,
    profiles: ProfileResolver,
    composer: FeedComposer,
    comments: CommentService,
    paging: FeedConfig,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        profiles: ProfileResolver,
        composer: FeedComposer,
        comments: CommentService,
        paging: FeedConfig,
    ) -> Self {
        Self {
            posts,
            profiles,
            composer,
            comments,
            paging,
        }
    }

    /// Create a post as the session user.
    ///
    /// Returns the new post as a feed entry with the author's profile, zero
    /// counts and an empty comment list.
    pub async fn create_post(
        &self,
        session: Option<&Session>,
        draft: PostDraft,
    ) -> ServiceResult<FeedPost> {
        let result = self.insert(session, draft).await;
        record_action("post", outcome(&result));
        result
    }

    async fn insert(&self, session: Option<&Session>, draft: PostDraft) -> ServiceResult<FeedPost> {
        let session = require_session(session, "You must be logged in to create a post")?;

        let draft = draft.normalized();
        if draft.is_empty() {
            return Err(ServiceError::Validation(
                "Post must have content or media".to_string(),
            ));
        }

        let profile = self.profiles.resolve_profile(&session.identity()).await;
        let post = self.posts.insert_post(session.user_id, &draft).await?;

        info!(
            post_id = %post.id,
            user_id = %session.user_id,
            has_image = post.image_url.is_some(),
            has_video = post.video_url.is_some(),
            has_event = post.event_id.is_some(),
            "post created"
        );

        Ok(FeedPost {
            post,
            profile,
            likes_count: 0,
            user_has_liked: false,
            comments_count: 0,
            comments: Some(Vec::new()),
        })
    }

    /// Newest posts first, composed for `viewer`.
    ///
    /// Never fails: an unreadable store yields the placeholder feed and a
    /// composition failure yields the posts with default owners and zero
    /// counts.
    pub async fn list_recent_posts(
        &self,
        limit: Option<i64>,
        viewer: Option<Uuid>,
    ) -> Vec<FeedPost> {
        let limit = self.paging.clamp_limit(limit);

        let posts = match self.posts.recent_posts(limit).await {
            Ok(posts) => posts,
            Err(e) => {
                error!(error = %e, "failed to read posts, serving placeholder feed");
                record_fallback("placeholder");
                return placeholder_feed();
            }
        };

        let timer = FEED_COMPOSE_DURATION_SECONDS
            .with_label_values(&["list"])
            .start_timer();
        let composed = self.composer.compose(posts.clone(), viewer).await;
        timer.observe_duration();

        match composed {
            Ok(feed) => feed,
            Err(e) => {
                warn!(
                    error = %e,
                    count = posts.len(),
                    "feed composition failed, serving bare posts"
                );
                record_fallback("bare");
                FeedComposer::bare(posts)
            }
        }
    }

    /// A single post with its comment thread populated.
    pub async fn get_post(&self, post_id: Uuid, viewer: Option<Uuid>) -> ServiceResult<FeedPost> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Post not found".to_string()))?;

        let timer = FEED_COMPOSE_DURATION_SECONDS
            .with_label_values(&["detail"])
            .start_timer();
        let (composed, thread) = tokio::join!(
            self.composer.compose(vec![post.clone()], viewer),
            self.comments.list_comments(post_id)
        );
        timer.observe_duration();

        let mut entry = match composed {
            Ok(mut feed) if !feed.is_empty() => feed.remove(0),
            Ok(_) => FeedComposer::bare(vec![post]).remove(0),
            Err(e) => {
                warn!(%post_id, error = %e, "post composition failed, serving bare post");
                record_fallback("bare");
                FeedComposer::bare(vec![post]).remove(0)
            }
        };
        entry.comments = Some(thread);
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryStore, Stores};

    fn service(store: &Arc<MemoryStore>) -> PostService {
        let stores = Stores::memory(store.clone());
        let profiles = ProfileResolver::new(stores.profiles.clone());
        PostService::new(
            stores.posts.clone(),
            profiles.clone(),
            FeedComposer::new(profiles.clone(), stores.likes.clone(), stores.comments.clone()),
            CommentService::new(stores.comments.clone(), profiles),
            FeedConfig::default(),
        )
    }

    fn session(user_id: Uuid) -> Session {
        Session {
            user_id,
            access_token: "token".to_string(),
            email: None,
            full_name: Some("Poster".to_string()),
            avatar_url: None,
        }
    }

    fn text(content: &str) -> PostDraft {
        PostDraft {
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn created_post_comes_back_as_feed_entry() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let alice = session(Uuid::new_v4());

        let created = svc.create_post(Some(&alice), text("Hello")).await.unwrap();

        assert_eq!(created.post.content.as_deref(), Some("Hello"));
        assert_eq!(created.profile.id, alice.user_id);
        assert_eq!(created.profile.full_name.as_deref(), Some("Poster"));
        assert_eq!(created.likes_count, 0);
        assert_eq!(created.comments, Some(Vec::new()));
        assert_eq!(store.post_rows(), 1);
    }

    #[tokio::test]
    async fn empty_post_is_rejected_and_not_persisted() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let alice = session(Uuid::new_v4());

        let draft = PostDraft {
            content: Some("   ".to_string()),
            image_url: Some(String::new()),
            video_url: None,
            event_id: None,
        };
        let err = svc.create_post(Some(&alice), draft).await.unwrap_err();

        assert_eq!(err.to_string(), "Post must have content or media");
        assert_eq!(store.post_rows(), 0);
    }

    #[tokio::test]
    async fn anonymous_post_is_unauthorized() {
        let store = Arc::new(MemoryStore::new());
        let err = service(&store)
            .create_post(None, text("Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert_eq!(store.post_rows(), 0);
    }

    #[tokio::test]
    async fn recent_posts_are_newest_first_and_clamped() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let alice = session(Uuid::new_v4());
        for i in 0..3 {
            svc.create_post(Some(&alice), text(&format!("post {}", i)))
                .await
                .unwrap();
        }

        let feed = svc.list_recent_posts(None, None).await;
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[0].post.content.as_deref(), Some("post 2"));

        let page = svc.list_recent_posts(Some(0), None).await;
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn unreadable_store_serves_placeholder() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        store.set_unavailable(true);

        let feed = svc.list_recent_posts(None, None).await;

        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].post.id, PLACEHOLDER_POST_ID);
        assert_eq!(feed[0].profile.username, "scooter_enthusiast");
    }

    #[tokio::test]
    async fn post_detail_includes_thread() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let alice = session(Uuid::new_v4());
        let created = svc.create_post(Some(&alice), text("Hello")).await.unwrap();
        svc.comments
            .add_comment(Some(&alice), created.post.id, "first!")
            .await
            .unwrap();

        let detail = svc.get_post(created.post.id, Some(alice.user_id)).await.unwrap();
        assert_eq!(detail.comments_count, 1);
        assert_eq!(detail.comments.as_ref().map(Vec::len), Some(1));

        let err = svc.get_post(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn event_id_must_be_a_uuid() {
        assert_eq!(parse_event_id(None).unwrap(), None);
        assert_eq!(parse_event_id(Some("  ")).unwrap(), None);

        let id = Uuid::new_v4();
        assert_eq!(parse_event_id(Some(&id.to_string())).unwrap(), Some(id));
        assert!(matches!(
            parse_event_id(Some("ride-42")),
            Err(ServiceError::Validation(_))
        ));
    }
}
