/// HTTP middleware for social-feed-service
pub mod session;

pub use session::{
    require_session, Claims, CurrentSession, Session, SessionMiddleware, SessionVerifier,
    UserMetadata,
};
