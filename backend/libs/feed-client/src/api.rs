//! HTTP access to the social feed service.
use crate::error::{ClientError, Result};
use crate::media::{MediaFile, MediaKind};
use crate::models::{Comment, FeedPost, LikeOutcome, NewPost, UploadedMedia};
use crate::session::SessionStore;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Operations the feed controller needs from the server
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn list_posts(&self, limit: Option<i64>) -> Result<Vec<FeedPost>>;

    async fn create_post(&self, post: &NewPost) -> Result<FeedPost>;

    async fn upload_media(&self, kind: MediaKind, file: &MediaFile) -> Result<UploadedMedia>;

    async fn toggle_like(&self, post_id: Uuid) -> Result<LikeOutcome>;

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    async fn add_comment(&self, post_id: Uuid, content: &str) -> Result<Comment>;

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()>;
}

/// `FeedApi` over reqwest, authenticated with the current session's token
pub struct HttpFeedApi {
    client: Client,
    base_url: String,
    sessions: Arc<SessionStore>,
}

impl HttpFeedApi {
    pub fn new(base_url: &str, sessions: Arc<SessionStore>) -> Self {
        Self::with_client(Client::new(), base_url, sessions)
    }

    pub fn with_client(client: Client, base_url: &str, sessions: Arc<SessionStore>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            sessions,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.sessions.current() {
            Some(session) => request.bearer_auth(session.access_token),
            None => request,
        }
    }

    /// Send and unwrap the `{success, ...}` envelope.
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if status.is_success() && body["success"].as_bool() != Some(false) {
            return Ok(body);
        }

        let message = body["error"]
            .as_str()
            .unwrap_or("Something went wrong. Please try again.")
            .to_string();
        warn!(status = status.as_u16(), %message, "feed request failed");

        if status == StatusCode::UNAUTHORIZED {
            Err(ClientError::Unauthenticated(message))
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn field<T: DeserializeOwned>(body: &mut Value, name: &str) -> Result<T> {
    let value = body
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| ClientError::Decode(format!("missing `{}`", name)))?;
    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn list_posts(&self, limit: Option<i64>) -> Result<Vec<FeedPost>> {
        let mut request = self.client.get(self.url("/posts"));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let mut body = self.send(request).await?;
        field(&mut body, "posts")
    }

    async fn create_post(&self, post: &NewPost) -> Result<FeedPost> {
        let mut form = Form::new().text("content", post.content.clone());
        if let Some(url) = &post.image_url {
            form = form.text("imageUrl", url.clone());
        }
        if let Some(url) = &post.video_url {
            form = form.text("videoUrl", url.clone());
        }
        if let Some(event_id) = post.event_id {
            form = form.text("eventId", event_id.to_string());
        }

        let mut body = self
            .send(self.client.post(self.url("/posts")).multipart(form))
            .await?;
        field(&mut body, "post")
    }

    async fn upload_media(&self, kind: MediaKind, file: &MediaFile) -> Result<UploadedMedia> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .text("fileType", kind.as_str())
            .part("file", part);

        debug!(kind = kind.as_str(), size = file.bytes.len(), "uploading media");
        let body = self
            .send(self.client.post(self.url("/upload")).multipart(form))
            .await?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn toggle_like(&self, post_id: Uuid) -> Result<LikeOutcome> {
        let body = self
            .send(self.client.post(self.url(&format!("/posts/{}/like", post_id))))
            .await?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let request = self
            .client
            .get(self.url("/comments"))
            .query(&[("postId", post_id.to_string())]);
        let mut body = self.send(request).await?;
        field(&mut body, "comments")
    }

    async fn add_comment(&self, post_id: Uuid, content: &str) -> Result<Comment> {
        let request = self.client.post(self.url("/comments")).json(&serde_json::json!({
            "postId": post_id,
            "content": content,
        }));
        let mut body = self.send(request).await?;
        field(&mut body, "comment")
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        let request = self
            .client
            .delete(self.url("/comments"))
            .query(&[("commentId", comment_id.to_string())]);
        self.send(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let api = HttpFeedApi::new("http://localhost:8080/", Arc::new(SessionStore::new()));
        assert_eq!(api.url("/posts"), "http://localhost:8080/posts");
    }

    #[test]
    fn missing_field_is_a_decode_error() {
        let mut body = serde_json::json!({ "success": true });
        let err = field::<Vec<FeedPost>>(&mut body, "posts").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn like_envelope_decodes() {
        let body = serde_json::json!({
            "success": true,
            "state": "unliked",
            "likes_count": 2,
        });
        let outcome: LikeOutcome = serde_json::from_value(body).unwrap();
        assert_eq!(outcome.likes_count, 2);
        assert_eq!(outcome.state, crate::models::LikeState::Unliked);
    }
}
