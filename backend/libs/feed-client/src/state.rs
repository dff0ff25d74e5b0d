//! Feed state and its pure reducer.
//!
//! Every UI mutation goes through `reduce(state, action)`, so the whole
//! interaction model is testable without rendering or network access.
use crate::media::{MediaAttachment, MediaFile, MediaKind};
use crate::models::{Comment, FeedPost, LikeOutcome, LikeState};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub const EMPTY_POST_MESSAGE: &str = "Please add some content, an image, or a video to your post.";

/// User actions that talk to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    PostCreate,
    CommentCreate,
    Like,
}

/// When a mutation becomes visible in local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Applied once the server confirms
    Confirmed,
    /// Applied immediately, rolled back on failure
    Optimistic,
}

pub const CONFIRMATION_POLICY: [(ActionKind, Confirmation); 3] = [
    (ActionKind::PostCreate, Confirmation::Confirmed),
    (ActionKind::CommentCreate, Confirmation::Confirmed),
    (ActionKind::Like, Confirmation::Optimistic),
];

pub fn confirmation(kind: ActionKind) -> Confirmation {
    CONFIRMATION_POLICY
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, c)| *c)
        .unwrap_or(Confirmation::Confirmed)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ComposerPhase {
    #[default]
    Idle,
    Composing,
    /// Upload progress in percent
    Uploading(u8),
    Submitting,
    Error(String),
}

impl ComposerPhase {
    /// A submission is in flight; further submits are ignored.
    pub fn is_busy(&self) -> bool {
        matches!(self, ComposerPhase::Uploading(_) | ComposerPhase::Submitting)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composer {
    pub phase: ComposerPhase,
    pub content: String,
    pub media: MediaAttachment,
}

impl Composer {
    pub fn has_payload(&self) -> bool {
        !self.content.trim().is_empty() || !self.media.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LikeSnapshot {
    liked: bool,
    likes_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub posts: Vec<FeedPost>,
    pub composer: Composer,
    pub expanded: HashSet<Uuid>,
    pub comment_drafts: HashMap<Uuid, String>,
    pub comments_in_flight: HashSet<Uuid>,
    likes_in_flight: HashMap<Uuid, LikeSnapshot>,
    /// Inline error banner
    pub banner: Option<String>,
}

impl FeedState {
    pub fn post(&self, post_id: Uuid) -> Option<&FeedPost> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    fn post_mut(&mut self, post_id: Uuid) -> Option<&mut FeedPost> {
        self.posts.iter_mut().find(|p| p.id == post_id)
    }

    pub fn like_in_flight(&self, post_id: Uuid) -> bool {
        self.likes_in_flight.contains_key(&post_id)
    }

    pub fn comment_in_flight(&self, post_id: Uuid) -> bool {
        self.comments_in_flight.contains(&post_id)
    }

    pub fn is_expanded(&self, post_id: Uuid) -> bool {
        self.expanded.contains(&post_id)
    }

    pub fn comment_draft(&self, post_id: Uuid) -> &str {
        self.comment_drafts
            .get(&post_id)
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedAction {
    FeedLoaded(Vec<FeedPost>),

    ComposerEdited(String),
    MediaSelected(MediaKind, MediaFile),
    MediaCleared,
    SubmitRequested,
    UploadProgress(u8),
    UploadFinished,
    PostConfirmed(FeedPost),
    PostFailed(String),

    LikeRequested(Uuid),
    LikeConfirmed { post_id: Uuid, outcome: LikeOutcome },
    LikeFailed { post_id: Uuid, message: String },

    CommentsToggled(Uuid),
    CommentsLoaded { post_id: Uuid, comments: Vec<Comment> },
    CommentDraftEdited { post_id: Uuid, text: String },
    CommentSubmitted(Uuid),
    CommentConfirmed { post_id: Uuid, comment: Comment },
    CommentFailed { post_id: Uuid, message: String },
    CommentRemoved { post_id: Uuid, comment_id: Uuid },

    /// Viewer changed; `false` means signed out
    SessionChanged(bool),

    BannerRaised(String),
    BannerDismissed,
}

pub fn reduce(mut state: FeedState, action: FeedAction) -> FeedState {
    match action {
        FeedAction::FeedLoaded(posts) => {
            // The server copy wins; threads are re-fetched on expand.
            state.posts = posts;
        }

        FeedAction::ComposerEdited(text) => {
            if !state.composer.phase.is_busy() {
                state.composer.content = text;
                state.composer.phase = ComposerPhase::Composing;
            }
        }
        FeedAction::MediaSelected(kind, file) => {
            if !state.composer.phase.is_busy() {
                match state.composer.media.select(kind, file) {
                    Ok(()) => state.composer.phase = ComposerPhase::Composing,
                    Err(e) => state.banner = Some(e.to_string()),
                }
            }
        }
        FeedAction::MediaCleared => {
            if !state.composer.phase.is_busy() {
                state.composer.media.clear();
            }
        }
        FeedAction::SubmitRequested => {
            if state.composer.phase.is_busy() {
                return state;
            }
            if !state.composer.has_payload() {
                state.banner = Some(EMPTY_POST_MESSAGE.to_string());
                return state;
            }
            state.banner = None;
            state.composer.phase = if state.composer.media.is_empty() {
                ComposerPhase::Submitting
            } else {
                ComposerPhase::Uploading(0)
            };
        }
        FeedAction::UploadProgress(percent) => {
            if let ComposerPhase::Uploading(current) = state.composer.phase {
                state.composer.phase = ComposerPhase::Uploading(current.max(percent.min(100)));
            }
        }
        FeedAction::UploadFinished => {
            if matches!(state.composer.phase, ComposerPhase::Uploading(_)) {
                state.composer.phase = ComposerPhase::Submitting;
            }
        }
        FeedAction::PostConfirmed(post) => {
            if confirmation(ActionKind::PostCreate) == Confirmation::Confirmed
                && state.post(post.id).is_none()
            {
                state.posts.insert(0, post);
            }
            state.composer = Composer::default();
            state.banner = None;
        }
        FeedAction::PostFailed(message) => {
            state.composer.phase = ComposerPhase::Error(message.clone());
            state.banner = Some(message);
        }

        FeedAction::LikeRequested(post_id) => {
            if state.like_in_flight(post_id) {
                return state;
            }
            let optimistic = confirmation(ActionKind::Like) == Confirmation::Optimistic;
            let snapshot = match state.post_mut(post_id) {
                Some(post) => {
                    let snapshot = LikeSnapshot {
                        liked: post.user_has_liked,
                        likes_count: post.likes_count,
                    };
                    if optimistic {
                        post.user_has_liked = !snapshot.liked;
                        post.likes_count = if snapshot.liked {
                            (snapshot.likes_count - 1).max(0)
                        } else {
                            snapshot.likes_count + 1
                        };
                    }
                    snapshot
                }
                None => return state,
            };
            state.likes_in_flight.insert(post_id, snapshot);
        }
        FeedAction::LikeConfirmed { post_id, outcome } => {
            // No snapshot: the request was dropped, e.g. by a sign-out.
            if state.likes_in_flight.remove(&post_id).is_none() {
                return state;
            }
            if let Some(post) = state.post_mut(post_id) {
                post.user_has_liked = outcome.state == LikeState::Liked;
                post.likes_count = outcome.likes_count.max(0);
            }
        }
        FeedAction::LikeFailed { post_id, message } => {
            let Some(snapshot) = state.likes_in_flight.remove(&post_id) else {
                return state;
            };
            if let Some(post) = state.post_mut(post_id) {
                post.user_has_liked = snapshot.liked;
                post.likes_count = snapshot.likes_count;
            }
            state.banner = Some(message);
        }

        FeedAction::CommentsToggled(post_id) => {
            if !state.expanded.remove(&post_id) {
                state.expanded.insert(post_id);
            }
        }
        FeedAction::CommentsLoaded { post_id, comments } => {
            if let Some(post) = state.post_mut(post_id) {
                post.comments = Some(comments);
            }
        }
        FeedAction::CommentDraftEdited { post_id, text } => {
            state.comment_drafts.insert(post_id, text);
        }
        FeedAction::CommentSubmitted(post_id) => {
            if !state.comment_draft(post_id).trim().is_empty() {
                state.comments_in_flight.insert(post_id);
            }
        }
        FeedAction::CommentConfirmed { post_id, comment } => {
            state.comments_in_flight.remove(&post_id);
            if confirmation(ActionKind::CommentCreate) == Confirmation::Confirmed {
                if let Some(post) = state.post_mut(post_id) {
                    post.comments.get_or_insert_with(Vec::new).push(comment);
                    post.comments_count += 1;
                }
            }
            state.comment_drafts.remove(&post_id);
        }
        FeedAction::CommentFailed { post_id, message } => {
            state.comments_in_flight.remove(&post_id);
            state.banner = Some(message);
        }
        FeedAction::CommentRemoved {
            post_id,
            comment_id,
        } => {
            if let Some(post) = state.post_mut(post_id) {
                if let Some(comments) = post.comments.as_mut() {
                    comments.retain(|c| c.id != comment_id);
                }
                post.comments_count = (post.comments_count - 1).max(0);
            }
        }

        FeedAction::SessionChanged(signed_in) => {
            if !signed_in {
                // Viewer-specific state belongs to the previous user.
                for post in state.posts.iter_mut() {
                    post.user_has_liked = false;
                }
                state.composer = Composer::default();
                state.comment_drafts.clear();
                state.comments_in_flight.clear();
                state.likes_in_flight.clear();
            }
        }

        FeedAction::BannerRaised(message) => state.banner = Some(message),
        FeedAction::BannerDismissed => state.banner = None,
    }

    state
}
