/// Post handlers - feed reads, post creation and like toggling
use super::form::{read_form, MAX_FORM_BYTES};
use super::AppState;
use crate::domain::models::PostDraft;
use crate::error::ServiceResult;
use crate::middleware::CurrentSession;
use crate::services::posts::parse_event_id;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

/// GET /posts?limit=
pub async fn list_posts(
    state: web::Data<AppState>,
    session: CurrentSession,
    query: web::Query<FeedQuery>,
) -> HttpResponse {
    let posts = state
        .posts
        .list_recent_posts(query.limit, session.user_id())
        .await;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "posts": posts,
    }))
}

/// GET /posts/{post_id}
pub async fn get_post(
    state: web::Data<AppState>,
    session: CurrentSession,
    post_id: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let post = state
        .posts
        .get_post(post_id.into_inner(), session.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "post": post,
    })))
}

/// POST /posts (multipart: content, imageUrl, videoUrl, eventId)
pub async fn create_post(
    state: web::Data<AppState>,
    session: CurrentSession,
    payload: Multipart,
) -> ServiceResult<HttpResponse> {
    let form = read_form(payload, MAX_FORM_BYTES).await?;

    let draft = PostDraft {
        content: form.text("content").map(str::to_string),
        image_url: form.text("imageUrl").map(str::to_string),
        video_url: form.text("videoUrl").map(str::to_string),
        event_id: parse_event_id(form.text("eventId"))?,
    };

    let post = state.posts.create_post(session.session(), draft).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "post": post,
    })))
}

/// POST /posts/{post_id}/like
pub async fn toggle_like(
    state: web::Data<AppState>,
    session: CurrentSession,
    post_id: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let toggle = state
        .likes
        .toggle_like(session.session(), post_id.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "state": toggle.state,
        "likes_count": toggle.likes_count,
    })))
}
