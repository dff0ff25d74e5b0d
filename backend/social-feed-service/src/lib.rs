//! Social feed service: posts, likes, comments and media uploads.
//!
//! Profiles are created lazily on first authenticated access, counts are
//! computed at read time and feed pages are composed with batched lookups.
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod repository;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use handlers::{configure, AppState};
