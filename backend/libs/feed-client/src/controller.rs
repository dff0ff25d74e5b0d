//! Feed controller - drives the reducer from user actions and server calls.
//!
//! Server calls for one user action run sequentially. State is only touched
//! through `reduce`, and the lock is never held across an await.
use crate::api::FeedApi;
use crate::error::Result;
use crate::media::{MediaFile, MediaKind};
use crate::models::{NewPost, UploadedMedia};
use crate::session::{ClientSession, SessionStore, SubscriptionId};
use crate::state::{reduce, ComposerPhase, FeedAction, FeedState};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const UPLOAD_TICK: Duration = Duration::from_millis(500);
const UPLOAD_STEP: u8 = 10;
/// Estimated progress stops here until the upload really finishes.
const UPLOAD_CEILING: u8 = 90;

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn apply(guard: &mut FeedState, action: FeedAction) {
    *guard = reduce(std::mem::take(guard), action);
}

pub struct FeedController<A: FeedApi> {
    api: Arc<A>,
    sessions: Arc<SessionStore>,
    state: Arc<Mutex<FeedState>>,
    subscription: SubscriptionId,
    upload_tick: Duration,
}

impl<A: FeedApi> FeedController<A> {
    pub fn new(api: Arc<A>, sessions: Arc<SessionStore>) -> Self {
        let state = Arc::new(Mutex::new(FeedState::default()));

        let listener_state = Arc::clone(&state);
        let subscription = sessions.subscribe(move |session: Option<&ClientSession>| {
            apply(
                &mut lock(&listener_state),
                FeedAction::SessionChanged(session.is_some()),
            );
        });

        Self {
            api,
            sessions,
            state,
            subscription,
            upload_tick: UPLOAD_TICK,
        }
    }

    /// Interval between estimated upload progress updates.
    pub fn with_upload_tick(mut self, tick: Duration) -> Self {
        self.upload_tick = tick;
        self
    }

    /// Snapshot of the current state for rendering.
    pub fn state(&self) -> FeedState {
        lock(&self.state).clone()
    }

    pub fn dispatch(&self, action: FeedAction) {
        apply(&mut lock(&self.state), action);
    }

    fn require_session(&self, message: &str) -> bool {
        if self.sessions.current().is_some() {
            return true;
        }
        self.dispatch(FeedAction::BannerRaised(message.to_string()));
        false
    }

    /// Fetch (or revalidate) the feed.
    pub async fn load_feed(&self) {
        match self.api.list_posts(None).await {
            Ok(posts) => {
                debug!(count = posts.len(), "feed loaded");
                self.dispatch(FeedAction::FeedLoaded(posts));
            }
            Err(e) => {
                warn!(error = %e, "failed to load feed");
                self.dispatch(FeedAction::BannerRaised(e.banner()));
            }
        }
    }

    pub fn edit_composer(&self, text: &str) {
        self.dispatch(FeedAction::ComposerEdited(text.to_string()));
    }

    pub fn select_media(&self, kind: MediaKind, file: MediaFile) {
        self.dispatch(FeedAction::MediaSelected(kind, file));
    }

    pub fn clear_media(&self) {
        self.dispatch(FeedAction::MediaCleared);
    }

    /// Upload any attached media, then create the post in one call.
    ///
    /// Ignored while a previous submission is still in flight.
    pub async fn submit_post(&self) {
        if !self.require_session("You must be logged in to create a post") {
            return;
        }

        let composer = {
            let mut state = lock(&self.state);
            if state.composer.phase.is_busy() {
                return;
            }
            apply(&mut state, FeedAction::SubmitRequested);
            if !state.composer.phase.is_busy() {
                return;
            }
            state.composer.clone()
        };

        let mut post = NewPost {
            content: composer.content.trim().to_string(),
            ..Default::default()
        };

        if let ComposerPhase::Uploading(_) = composer.phase {
            if let Some((kind, file)) = composer.media.selected() {
                match self.upload_with_progress(kind, file).await {
                    Ok(uploaded) => {
                        self.dispatch(FeedAction::UploadProgress(100));
                        self.dispatch(FeedAction::UploadFinished);
                        match kind {
                            MediaKind::Image => post.image_url = Some(uploaded.url),
                            MediaKind::Video => post.video_url = Some(uploaded.url),
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "media upload failed");
                        self.dispatch(FeedAction::PostFailed(e.banner()));
                        return;
                    }
                }
            }
        }

        match self.api.create_post(&post).await {
            Ok(created) => {
                info!(post_id = %created.id, "post created");
                self.dispatch(FeedAction::PostConfirmed(created));
            }
            Err(e) => {
                warn!(error = %e, "post creation failed");
                self.dispatch(FeedAction::PostFailed(e.banner()));
            }
        }
    }

    /// The upload API reports no progress, so advance an estimate on a timer
    /// and jump to 100 once the upload returns.
    async fn upload_with_progress(
        &self,
        kind: MediaKind,
        file: &MediaFile,
    ) -> Result<UploadedMedia> {
        let upload = self.api.upload_media(kind, file);
        tokio::pin!(upload);

        let mut ticker = tokio::time::interval(self.upload_tick);
        ticker.tick().await;
        let mut estimate: u8 = 0;

        loop {
            tokio::select! {
                result = &mut upload => return result,
                _ = ticker.tick() => {
                    estimate = estimate.saturating_add(UPLOAD_STEP).min(UPLOAD_CEILING);
                    self.dispatch(FeedAction::UploadProgress(estimate));
                }
            }
        }
    }

    /// Flip the like immediately, then reconcile with the server.
    pub async fn toggle_like(&self, post_id: Uuid) {
        if !self.require_session("You must be logged in to like posts") {
            return;
        }

        {
            let mut state = lock(&self.state);
            if state.like_in_flight(post_id) || state.post(post_id).is_none() {
                return;
            }
            apply(&mut state, FeedAction::LikeRequested(post_id));
        }

        match self.api.toggle_like(post_id).await {
            Ok(outcome) => self.dispatch(FeedAction::LikeConfirmed { post_id, outcome }),
            Err(e) => {
                warn!(%post_id, error = %e, "like toggle failed, rolling back");
                self.dispatch(FeedAction::LikeFailed {
                    post_id,
                    message: e.banner(),
                });
            }
        }
    }

    /// Expand or collapse a thread; every expand fetches it afresh.
    pub async fn toggle_comments(&self, post_id: Uuid) {
        let expanded = {
            let mut state = lock(&self.state);
            apply(&mut state, FeedAction::CommentsToggled(post_id));
            state.is_expanded(post_id)
        };
        if !expanded {
            return;
        }

        match self.api.list_comments(post_id).await {
            Ok(comments) => self.dispatch(FeedAction::CommentsLoaded { post_id, comments }),
            Err(e) => {
                warn!(%post_id, error = %e, "failed to load comments");
                self.dispatch(FeedAction::BannerRaised(e.banner()));
            }
        }
    }

    pub fn edit_comment(&self, post_id: Uuid, text: &str) {
        self.dispatch(FeedAction::CommentDraftEdited {
            post_id,
            text: text.to_string(),
        });
    }

    /// Send the draft comment; it appears once the server confirms.
    pub async fn submit_comment(&self, post_id: Uuid) {
        if !self.require_session("You must be logged in to comment") {
            return;
        }

        let content = {
            let mut state = lock(&self.state);
            if state.comment_in_flight(post_id) {
                return;
            }
            apply(&mut state, FeedAction::CommentSubmitted(post_id));
            if !state.comment_in_flight(post_id) {
                return;
            }
            state.comment_draft(post_id).trim().to_string()
        };

        match self.api.add_comment(post_id, &content).await {
            Ok(comment) => self.dispatch(FeedAction::CommentConfirmed { post_id, comment }),
            Err(e) => {
                warn!(%post_id, error = %e, "comment failed");
                self.dispatch(FeedAction::CommentFailed {
                    post_id,
                    message: e.banner(),
                });
            }
        }
    }

    pub async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) {
        match self.api.delete_comment(comment_id).await {
            Ok(()) => self.dispatch(FeedAction::CommentRemoved {
                post_id,
                comment_id,
            }),
            Err(e) => {
                warn!(%comment_id, error = %e, "comment delete failed");
                self.dispatch(FeedAction::BannerRaised(e.banner()));
            }
        }
    }

    pub fn dismiss_banner(&self) {
        self.dispatch(FeedAction::BannerDismissed);
    }
}

impl<A: FeedApi> Drop for FeedController<A> {
    fn drop(&mut self) {
        self.sessions.unsubscribe(self.subscription);
    }
}
