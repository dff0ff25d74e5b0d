/// Comment handlers - thread listing, creation and deletion
use super::{parse_id, AppState};
use crate::error::{ServiceError, ServiceResult};
use crate::middleware::CurrentSession;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    pub post_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentQuery {
    pub comment_id: Option<String>,
}

/// GET /comments?postId=
pub async fn list_comments(
    state: web::Data<AppState>,
    query: web::Query<CommentsQuery>,
) -> ServiceResult<HttpResponse> {
    let post_id = query
        .post_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::Validation("Post ID is required".to_string()))?;
    let post_id = parse_id(post_id, "Post ID")?;

    let comments = state.comments.list_comments(post_id).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "comments": comments,
    })))
}

/// POST /comments {postId, content}
pub async fn create_comment(
    state: web::Data<AppState>,
    session: CurrentSession,
    body: web::Json<CreateCommentRequest>,
) -> ServiceResult<HttpResponse> {
    let body = body.into_inner();
    let (post_id, content) = match (body.post_id, body.content) {
        (Some(post_id), Some(content)) if !post_id.is_empty() && !content.is_empty() => {
            (post_id, content)
        }
        _ => {
            return Err(ServiceError::Validation(
                "Post ID and content are required".to_string(),
            ))
        }
    };
    let post_id = parse_id(&post_id, "Post ID")?;

    let comment = state
        .comments
        .add_comment(session.session(), post_id, &content)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "comment": comment,
    })))
}

/// DELETE /comments?commentId=
pub async fn delete_comment(
    state: web::Data<AppState>,
    session: CurrentSession,
    query: web::Query<DeleteCommentQuery>,
) -> ServiceResult<HttpResponse> {
    let comment_id = query
        .comment_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::Validation("Comment ID is required".to_string()))?;
    let comment_id = parse_id(comment_id, "Comment ID")?;

    state
        .comments
        .delete_comment(session.session(), comment_id)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}
