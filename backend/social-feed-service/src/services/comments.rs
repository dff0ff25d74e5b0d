/// Comment service - ordered threads, creation and owner-gated deletion
use super::profiles::{display_profile, ProfileResolver};
use crate::domain::models::CommentView;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::metrics::social::{outcome, record_action};
use crate::middleware::{require_session, Session};
use crate::repository::CommentStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const COMMENT_NOT_FOUND: &str = "Comment not found or you can only delete your own comments";

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    profiles: ProfileResolver,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentStore>, profiles: ProfileResolver) -> Self {
        Self { comments, profiles }
    }

    /// Comments on a post, oldest first, each with its author's profile.
    ///
    /// Authors are resolved in one batched lookup. A store failure degrades to
    /// an empty thread.
    pub async fn list_comments(&self, post_id: Uuid) -> Vec<CommentView> {
        match self.thread(post_id).await {
            Ok(thread) => thread,
            Err(e) => {
                warn!(%post_id, error = %e, "failed to load comments, returning empty thread");
                Vec::new()
            }
        }
    }

    async fn thread(&self, post_id: Uuid) -> ServiceResult<Vec<CommentView>> {
        let comments = self.comments.comments_for_post(post_id).await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let authors: Vec<Uuid> = comments
            .iter()
            .map(|c| c.user_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let profiles = self.profiles.resolve_many(&authors).await;

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                profile: profiles
                    .get(&comment.user_id)
                    .cloned()
                    .unwrap_or_else(|| display_profile(comment.user_id)),
                comment,
            })
            .collect())
    }

    /// Add a comment as the session user. Content is stored trimmed.
    pub async fn add_comment(
        &self,
        session: Option<&Session>,
        post_id: Uuid,
        text: &str,
    ) -> ServiceResult<CommentView> {
        let result = self.insert(session, post_id, text).await;
        record_action("comment", outcome(&result));
        result
    }

    async fn insert(
        &self,
        session: Option<&Session>,
        post_id: Uuid,
        text: &str,
    ) -> ServiceResult<CommentView> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ServiceError::Validation("Comment cannot be empty".to_string()));
        }
        let session = require_session(session, "You must be logged in to comment")?;

        let profile = self.profiles.resolve_profile(&session.identity()).await;

        let comment = self
            .comments
            .insert_comment(session.user_id, post_id, content)
            .await
            .map_err(|e| match e {
                StoreError::ForeignKeyViolation(_) => {
                    ServiceError::NotFound("Post not found".to_string())
                }
                other => ServiceError::from(other),
            })?;

        info!(comment_id = %comment.id, %post_id, user_id = %session.user_id, "comment created");
        Ok(CommentView { comment, profile })
    }

    /// Delete a comment owned by the session user.
    ///
    /// Someone else's comment and a missing comment produce the same error.
    pub async fn delete_comment(
        &self,
        session: Option<&Session>,
        comment_id: Uuid,
    ) -> ServiceResult<()> {
        let result = self.remove(session, comment_id).await;
        record_action("delete_comment", outcome(&result));
        result
    }

    async fn remove(&self, session: Option<&Session>, comment_id: Uuid) -> ServiceResult<()> {
        let session = require_session(session, "You must be logged in to delete a comment")?;
        let not_found = || ServiceError::NotFound(COMMENT_NOT_FOUND.to_string());

        self.comments
            .find_owned_comment(comment_id, session.user_id)
            .await?
            .ok_or_else(not_found)?;

        // Raced by another delete of the same comment.
        if !self
            .comments
            .delete_comment(comment_id, session.user_id)
            .await?
        {
            return Err(not_found());
        }

        info!(%comment_id, user_id = %session.user_id, "comment deleted");
        Ok(())
    }
}
