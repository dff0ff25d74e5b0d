/// Like toggle - flips (user, post) membership and reports the fresh count
use crate::domain::models::{LikeState, LikeToggle};
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::metrics::social::{outcome, record_action, LIKE_TOGGLE_RACES_TOTAL};
use crate::middleware::{require_session, Session};
use crate::repository::LikeStore;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct LikeService {
    likes: Arc<dyn LikeStore>,
}

impl LikeService {
    pub fn new(likes: Arc<dyn LikeStore>) -> Self {
        Self { likes }
    }

    /// Like the post if the session user has not, otherwise remove the like.
    ///
    /// The (user, post) unique key closes the check-then-act window: an insert
    /// that loses to a concurrent identical insert still ends in `Liked`.
    pub async fn toggle_like(
        &self,
        session: Option<&Session>,
        post_id: Uuid,
    ) -> ServiceResult<LikeToggle> {
        let result = self.toggle(session, post_id).await;
        let action = match &result {
            Ok(LikeToggle {
                state: LikeState::Unliked,
                ..
            }) => "unlike",
            _ => "like",
        };
        record_action(action, outcome(&result));
        result
    }

    async fn toggle(&self, session: Option<&Session>, post_id: Uuid) -> ServiceResult<LikeToggle> {
        let session = require_session(session, "You must be logged in to like posts")?;
        let user_id = session.user_id;

        let state = if self.likes.like_exists(user_id, post_id).await? {
            self.likes.delete_like(user_id, post_id).await?;
            LikeState::Unliked
        } else {
            match self.likes.insert_like(user_id, post_id).await {
                Ok(()) => LikeState::Liked,
                Err(StoreError::UniqueViolation(constraint)) => {
                    LIKE_TOGGLE_RACES_TOTAL.inc();
                    debug!(%user_id, %post_id, %constraint, "concurrent like already recorded");
                    LikeState::Liked
                }
                Err(StoreError::ForeignKeyViolation(_)) => {
                    return Err(ServiceError::NotFound("Post not found".to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        };

        let likes_count = self
            .likes
            .count_likes(&[post_id])
            .await?
            .get(&post_id)
            .copied()
            .unwrap_or(0);

        info!(%user_id, %post_id, ?state, likes_count, "like toggled");
        Ok(LikeToggle { state, likes_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PostDraft;
    use crate::repository::{MemoryStore, PostStore};

    fn session(user_id: Uuid) -> Session {
        Session {
            user_id,
            access_token: "token".to_string(),
            email: None,
            full_name: None,
            avatar_url: None,
        }
    }

    async fn setup() -> (Arc<MemoryStore>, LikeService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let draft = PostDraft {
            content: Some("Hello".to_string()),
            ..Default::default()
        };
        let post = store.insert_post(Uuid::new_v4(), &draft).await.unwrap();
        (store.clone(), LikeService::new(store), post.id)
    }

    #[tokio::test]
    async fn double_toggle_restores_membership() {
        let (store, svc, post_id) = setup().await;
        let bob = session(Uuid::new_v4());

        let first = svc.toggle_like(Some(&bob), post_id).await.unwrap();
        assert_eq!(first.state, LikeState::Liked);
        assert_eq!(first.likes_count, 1);

        let second = svc.toggle_like(Some(&bob), post_id).await.unwrap();
        assert_eq!(second.state, LikeState::Unliked);
        assert_eq!(second.likes_count, 0);
        assert_eq!(store.like_rows(post_id), 0);
    }

    #[tokio::test]
    async fn count_reflects_every_liker() {
        let (store, svc, post_id) = setup().await;
        for _ in 0..3 {
            svc.toggle_like(Some(&session(Uuid::new_v4())), post_id)
                .await
                .unwrap();
        }

        let toggle = svc
            .toggle_like(Some(&session(Uuid::new_v4())), post_id)
            .await
            .unwrap();
        assert_eq!(toggle.likes_count, 4);
        assert_eq!(store.like_rows(post_id), 4);
    }

    #[tokio::test]
    async fn concurrent_likes_leave_one_row() {
        let (store, svc, post_id) = setup().await;
        let bob = session(Uuid::new_v4());

        let (a, b) = tokio::join!(
            svc.toggle_like(Some(&bob), post_id),
            svc.toggle_like(Some(&bob), post_id)
        );

        assert_eq!(a.unwrap().state, LikeState::Liked);
        assert_eq!(b.unwrap().state, LikeState::Liked);
        assert_eq!(store.like_rows(post_id), 1);
    }

    #[tokio::test]
    async fn anonymous_and_missing_post_are_rejected() {
        let (_, svc, _) = setup().await;

        let err = svc.toggle_like(None, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let err = svc
            .toggle_like(Some(&session(Uuid::new_v4())), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn store_outage_is_an_error() {
        let (store, svc, post_id) = setup().await;
        store.set_unavailable(true);

        let err = svc
            .toggle_like(Some(&session(Uuid::new_v4())), post_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
    }
}
