/// Upload handlers - post media and profile images
use super::form::{read_form, MAX_FORM_BYTES};
use super::AppState;
use crate::error::ServiceResult;
use crate::middleware::CurrentSession;
use crate::services::MediaKind;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

/// POST /upload (multipart: file, fileType = image | video)
pub async fn upload_media(
    state: web::Data<AppState>,
    session: CurrentSession,
    payload: Multipart,
) -> ServiceResult<HttpResponse> {
    let form = read_form(payload, MAX_FORM_BYTES).await?;
    let kind = MediaKind::for_post(form.text("fileType"))?;

    let stored = state.media.upload(session.session(), kind, form.file).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "url": stored.url,
        "path": stored.path,
    })))
}

/// POST /upload/profile (multipart: file, fileType = avatar | cover)
pub async fn upload_profile_image(
    state: web::Data<AppState>,
    session: CurrentSession,
    payload: Multipart,
) -> ServiceResult<HttpResponse> {
    let form = read_form(payload, MAX_FORM_BYTES).await?;
    let kind = MediaKind::for_profile(form.text("fileType"))?;

    let (stored, profile) = state
        .media
        .upload_profile_image(session.session(), kind, form.file)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "url": stored.url,
        "path": stored.path,
        "profile": profile,
    })))
}
