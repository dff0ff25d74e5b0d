/// Profile handlers
use super::AppState;
use crate::error::ServiceResult;
use crate::middleware::{require_session, CurrentSession};
use actix_web::{web, HttpResponse};
use uuid::Uuid;

/// GET /profiles/me - creates the caller's profile on first access
pub async fn my_profile(
    state: web::Data<AppState>,
    session: CurrentSession,
) -> ServiceResult<HttpResponse> {
    let session = require_session(session.session(), "You must be logged in to view your profile")?;
    let profile = state.profiles.resolve_profile(&session.identity()).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "profile": profile,
    })))
}

/// GET /profiles/{user_id}
pub async fn get_profile(state: web::Data<AppState>, user_id: web::Path<Uuid>) -> HttpResponse {
    let profile = state.profiles.view_profile(user_id.into_inner()).await;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "profile": profile,
    }))
}
