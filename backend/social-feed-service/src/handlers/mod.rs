/// HTTP handlers for social-feed-service
///
/// - Posts: feed reads, post creation, like toggling
/// - Comments: thread listing, creation, owner-gated deletion
/// - Uploads: post media and profile images
/// - Profiles: own profile (lazily created) and public lookups
use crate::config::FeedConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::serve_metrics;
use crate::repository::Stores;
use crate::services::{
    CommentService, FeedComposer, LikeService, MediaService, PostService, ProfileResolver,
};
use crate::storage::ObjectStorage;
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub mod comments;
pub mod form;
pub mod posts;
pub mod profiles;
pub mod uploads;

/// Services shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub likes: LikeService,
    pub comments: CommentService,
    pub profiles: ProfileResolver,
    pub media: MediaService,
    stores: Stores,
}

impl AppState {
    pub fn new(stores: Stores, storage: Arc<dyn ObjectStorage>, paging: FeedConfig) -> Self {
        let profiles = ProfileResolver::new(stores.profiles.clone());
        let composer = FeedComposer::new(
            profiles.clone(),
            stores.likes.clone(),
            stores.comments.clone(),
        );
        let comments = CommentService::new(stores.comments.clone(), profiles.clone());

        Self {
            posts: PostService::new(
                stores.posts.clone(),
                profiles.clone(),
                composer,
                comments.clone(),
                paging,
            ),
            likes: LikeService::new(stores.likes.clone()),
            comments,
            media: MediaService::new(storage, profiles.clone()),
            profiles,
            stores,
        }
    }
}

/// Parse an id taken from a query string or body.
pub(crate) fn parse_id(raw: &str, label: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::Validation(format!("Invalid {}", label)))
}

async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "social-feed-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let start = Instant::now();
    let probe = state.stores.posts.recent_posts(1).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match probe {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "ready": true,
            "store": "healthy",
            "latency_ms": latency_ms,
        })),
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "ready": false,
                "store": "unhealthy",
                "latency_ms": latency_ms,
            }))
        }
    }
}

/// Extractor rejections answer with the same `{success:false, error}` body
/// as every other failure.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "rejected request body");
        ServiceError::Validation("Invalid request body".to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "rejected query string");
        ServiceError::Validation("Invalid query parameters".to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "rejected path parameter");
        ServiceError::Validation("Invalid ID".to_string()).into()
    }));
}

/// Register every route. `AppState` must be added as app data by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);
    cfg.route("/health", web::get().to(liveness))
        .route("/ready", web::get().to(readiness))
        .route("/metrics", web::get().to(serve_metrics))
        .service(
            web::resource("/comments")
                .route(web::get().to(comments::list_comments))
                .route(web::post().to(comments::create_comment))
                .route(web::delete().to(comments::delete_comment)),
        )
        .service(
            web::scope("/posts")
                .service(
                    web::resource("")
                        .route(web::get().to(posts::list_posts))
                        .route(web::post().to(posts::create_post)),
                )
                .service(web::resource("/{post_id}").route(web::get().to(posts::get_post)))
                .service(
                    web::resource("/{post_id}/like").route(web::post().to(posts::toggle_like)),
                ),
        )
        .service(
            web::scope("/upload")
                .service(web::resource("").route(web::post().to(uploads::upload_media)))
                .service(
                    web::resource("/profile").route(web::post().to(uploads::upload_profile_image)),
                ),
        )
        .service(
            web::scope("/profiles")
                .service(web::resource("/me").route(web::get().to(profiles::my_profile)))
                .service(web::resource("/{user_id}").route(web::get().to(profiles::get_profile))),
        );
}
