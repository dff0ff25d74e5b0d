use async_trait::async_trait;
use chrono::Utc;
use feed_client::models::{
    Comment, FeedPost, LikeOutcome, LikeState, NewPost, Profile, UploadedMedia,
};
use feed_client::{
    ClientError, ClientSession, ComposerPhase, FeedApi, FeedController, MediaFile, MediaKind,
    Result, SessionStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

fn profile(id: Uuid) -> Profile {
    Profile {
        id,
        username: format!("user_{}", &id.to_string()[..8]),
        full_name: None,
        avatar_url: None,
        cover_image_url: None,
        bio: None,
        location: None,
        website: None,
    }
}

fn feed_post(content: &str, likes: i64) -> FeedPost {
    let user_id = Uuid::new_v4();
    FeedPost {
        id: Uuid::new_v4(),
        user_id,
        content: Some(content.to_string()),
        image_url: None,
        video_url: None,
        event_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        profile: profile(user_id),
        likes_count: likes,
        user_has_liked: false,
        comments_count: 0,
        comments: None,
    }
}

fn comment(post_id: Uuid, content: &str) -> Comment {
    let author = Uuid::new_v4();
    Comment {
        id: Uuid::new_v4(),
        post_id,
        user_id: author,
        content: content.to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        profile: profile(author),
    }
}

/// In-process `FeedApi` that records calls and can fail or pause on demand.
#[derive(Default)]
struct FakeApi {
    posts: Mutex<Vec<FeedPost>>,
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<NewPost>>,
    threads: Mutex<HashMap<Uuid, Vec<Comment>>>,
    fail_likes: Mutex<bool>,
    fail_uploads: Mutex<bool>,
    like_gate: Option<Arc<Notify>>,
    upload_gate: Option<Arc<Notify>>,
}

impl FakeApi {
    fn with_posts(posts: Vec<FeedPost>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

#[async_trait]
impl FeedApi for FakeApi {
    async fn list_posts(&self, _limit: Option<i64>) -> Result<Vec<FeedPost>> {
        self.record("list_posts");
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn create_post(&self, post: &NewPost) -> Result<FeedPost> {
        self.record("create_post");
        self.created.lock().unwrap().push(post.clone());
        let mut created = feed_post(&post.content, 0);
        created.image_url = post.image_url.clone();
        created.video_url = post.video_url.clone();
        created.comments = Some(Vec::new());
        Ok(created)
    }

    async fn upload_media(&self, kind: MediaKind, file: &MediaFile) -> Result<UploadedMedia> {
        self.record("upload_media");
        if let Some(gate) = &self.upload_gate {
            gate.notified().await;
        }
        if *self.fail_uploads.lock().unwrap() {
            return Err(ClientError::Api {
                status: 400,
                message: "Invalid file type".to_string(),
            });
        }
        Ok(UploadedMedia {
            url: format!("http://cdn.test/{}/{}", kind.as_str(), file.file_name),
            path: file.file_name.clone(),
        })
    }

    async fn toggle_like(&self, post_id: Uuid) -> Result<LikeOutcome> {
        self.record("toggle_like");
        if let Some(gate) = &self.like_gate {
            gate.notified().await;
        }
        if *self.fail_likes.lock().unwrap() {
            return Err(ClientError::Api {
                status: 500,
                message: "Something went wrong. Please try again.".to_string(),
            });
        }
        let posts = self.posts.lock().unwrap();
        let current = posts.iter().find(|p| p.id == post_id).map_or(0, |p| p.likes_count);
        Ok(LikeOutcome {
            state: LikeState::Liked,
            likes_count: current + 10,
        })
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        self.record("list_comments");
        Ok(self
            .threads
            .lock()
            .unwrap()
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_comment(&self, post_id: Uuid, content: &str) -> Result<Comment> {
        self.record("add_comment");
        let added = comment(post_id, content);
        self.threads
            .lock()
            .unwrap()
            .entry(post_id)
            .or_default()
            .push(added.clone());
        Ok(added)
    }

    async fn delete_comment(&self, _comment_id: Uuid) -> Result<()> {
        self.record("delete_comment");
        Ok(())
    }
}

fn signed_in() -> Arc<SessionStore> {
    let sessions = Arc::new(SessionStore::new());
    sessions.set_session(Some(ClientSession {
        user_id: Uuid::new_v4(),
        access_token: "token".to_string(),
    }));
    sessions
}

fn image(len: usize) -> MediaFile {
    MediaFile {
        file_name: "ride.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![1; len],
    }
}

#[tokio::test]
async fn post_with_image_uploads_first_and_appears_after_confirmation() {
    let existing = feed_post("older", 0);
    let api = Arc::new(FakeApi::with_posts(vec![existing.clone()]));
    let controller = FeedController::new(api.clone(), signed_in());
    controller.load_feed().await;

    controller.edit_composer("  Sunset ride  ");
    controller.select_media(MediaKind::Image, image(16));
    controller.submit_post().await;

    assert_eq!(api.calls(), vec!["list_posts", "upload_media", "create_post"]);
    let sent = api.created.lock().unwrap()[0].clone();
    assert_eq!(sent.content, "Sunset ride");
    assert_eq!(sent.image_url.as_deref(), Some("http://cdn.test/image/ride.png"));
    assert_eq!(sent.video_url, None);

    let state = controller.state();
    assert_eq!(state.posts.len(), 2);
    assert_eq!(state.posts[0].content.as_deref(), Some("Sunset ride"));
    assert_eq!(state.posts[1].id, existing.id);
    assert_eq!(state.composer.phase, ComposerPhase::Idle);
    assert!(state.composer.media.is_empty());
}

#[tokio::test]
async fn upload_progress_advances_then_holds_until_done() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeApi {
        upload_gate: Some(gate.clone()),
        ..FakeApi::default()
    });
    let controller =
        FeedController::new(api.clone(), signed_in()).with_upload_tick(Duration::from_millis(5));

    controller.select_media(MediaKind::Image, image(16));
    futures::join!(controller.submit_post(), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        match controller.state().composer.phase {
            ComposerPhase::Uploading(percent) => assert!(percent > 0 && percent <= 90),
            other => panic!("expected upload in progress, got {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(controller.state().composer.phase, ComposerPhase::Uploading(90));
        gate.notify_one();
    });

    assert_eq!(api.calls(), vec!["upload_media", "create_post"]);
    assert_eq!(controller.state().composer.phase, ComposerPhase::Idle);
}

#[tokio::test]
async fn failed_upload_keeps_composer_and_skips_create() {
    let api = Arc::new(FakeApi::default());
    *api.fail_uploads.lock().unwrap() = true;
    let controller = FeedController::new(api.clone(), signed_in());

    controller.select_media(MediaKind::Image, image(16));
    controller.submit_post().await;

    assert_eq!(api.count("create_post"), 0);
    let state = controller.state();
    assert!(matches!(state.composer.phase, ComposerPhase::Error(_)));
    assert_eq!(state.banner.as_deref(), Some("Invalid file type"));
    assert!(state.composer.media.image().is_some());
    assert!(state.posts.is_empty());
}

#[tokio::test]
async fn oversize_video_never_reaches_the_server() {
    let api = Arc::new(FakeApi::default());
    let controller = FeedController::new(api.clone(), signed_in());

    controller.select_media(
        MediaKind::Video,
        MediaFile {
            file_name: "long.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            bytes: vec![0; 50 * 1024 * 1024 + 1],
        },
    );
    controller.submit_post().await;

    assert!(api.calls().is_empty());
    assert!(controller.state().banner.is_some());
}

#[tokio::test]
async fn anonymous_actions_raise_banner_without_calls() {
    let post = feed_post("hi", 1);
    let api = Arc::new(FakeApi::with_posts(vec![post.clone()]));
    let controller = FeedController::new(api.clone(), Arc::new(SessionStore::new()));
    controller.load_feed().await;

    controller.edit_composer("hello");
    controller.submit_post().await;
    assert_eq!(
        controller.state().banner.as_deref(),
        Some("You must be logged in to create a post")
    );

    controller.toggle_like(post.id).await;
    assert_eq!(controller.state().posts[0].likes_count, 1);
    assert_eq!(api.calls(), vec!["list_posts"]);
}

#[tokio::test]
async fn like_flips_before_the_server_answers() {
    let post = feed_post("hi", 4);
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeApi {
        like_gate: Some(gate.clone()),
        ..FakeApi::with_posts(vec![post.clone()])
    });
    let controller = FeedController::new(api.clone(), signed_in());
    controller.load_feed().await;

    futures::join!(controller.toggle_like(post.id), async {
        let state = controller.state();
        assert!(state.posts[0].user_has_liked);
        assert_eq!(state.posts[0].likes_count, 5);
        assert!(state.like_in_flight(post.id));

        // A second tap while the first is pending is ignored.
        controller.toggle_like(post.id).await;
        gate.notify_one();
    });

    assert_eq!(api.count("toggle_like"), 1);
    let state = controller.state();
    assert_eq!(state.posts[0].likes_count, 14);
    assert!(!state.like_in_flight(post.id));
}

#[tokio::test]
async fn failed_like_rolls_back() {
    let post = feed_post("hi", 2);
    let api = Arc::new(FakeApi::with_posts(vec![post.clone()]));
    *api.fail_likes.lock().unwrap() = true;
    let controller = FeedController::new(api.clone(), signed_in());
    controller.load_feed().await;

    controller.toggle_like(post.id).await;

    let state = controller.state();
    assert!(!state.posts[0].user_has_liked);
    assert_eq!(state.posts[0].likes_count, 2);
    assert_eq!(
        state.banner.as_deref(),
        Some("Something went wrong. Please try again.")
    );
}

#[tokio::test]
async fn every_expand_refetches_the_thread() {
    let post = feed_post("hi", 0);
    let api = Arc::new(FakeApi::with_posts(vec![post.clone()]));
    let controller = FeedController::new(api.clone(), signed_in());
    controller.load_feed().await;

    controller.toggle_comments(post.id).await;
    assert_eq!(controller.state().posts[0].comments, Some(Vec::new()));

    // Someone else comments while the thread is open.
    api.threads
        .lock()
        .unwrap()
        .insert(post.id, vec![comment(post.id, "from elsewhere")]);

    controller.toggle_comments(post.id).await;
    assert!(!controller.state().is_expanded(post.id));
    controller.toggle_comments(post.id).await;

    assert_eq!(api.count("list_comments"), 2);
    let state = controller.state();
    let thread = state.posts[0].comments.as_ref().unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].content, "from elsewhere");
}

#[tokio::test]
async fn confirmed_comment_is_appended_and_removable() {
    let post = feed_post("hi", 0);
    let api = Arc::new(FakeApi::with_posts(vec![post.clone()]));
    api.threads
        .lock()
        .unwrap()
        .insert(post.id, vec![comment(post.id, "existing")]);
    let controller = FeedController::new(api.clone(), signed_in());
    controller.load_feed().await;
    controller.toggle_comments(post.id).await;

    controller.edit_comment(post.id, "  great ride  ");
    controller.submit_comment(post.id).await;

    let state = controller.state();
    let thread = state.posts[0].comments.as_ref().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[1].content, "great ride");
    assert_eq!(state.posts[0].comments_count, 1);
    assert_eq!(state.comment_draft(post.id), "");

    let removed = thread[1].id;
    controller.delete_comment(post.id, removed).await;
    let state = controller.state();
    assert_eq!(state.posts[0].comments.as_ref().unwrap().len(), 1);
    assert_eq!(state.posts[0].comments_count, 0);
}

#[tokio::test]
async fn blank_comment_is_not_sent() {
    let post = feed_post("hi", 0);
    let api = Arc::new(FakeApi::with_posts(vec![post.clone()]));
    let controller = FeedController::new(api.clone(), signed_in());
    controller.load_feed().await;

    controller.edit_comment(post.id, "   ");
    controller.submit_comment(post.id).await;

    assert_eq!(api.count("add_comment"), 0);
}

#[tokio::test]
async fn sign_out_resets_viewer_state_and_drop_unsubscribes() {
    let mut post = feed_post("hi", 1);
    post.user_has_liked = true;
    let sessions = signed_in();
    let api = Arc::new(FakeApi::with_posts(vec![post]));

    {
        let controller = FeedController::new(api.clone(), sessions.clone());
        controller.load_feed().await;
        assert_eq!(sessions.listener_count(), 1);

        sessions.set_session(None);
        assert!(!controller.state().posts[0].user_has_liked);
    }

    assert_eq!(sessions.listener_count(), 0);
}
