/// Business logic layer for social-feed-service
pub mod comments;
pub mod feed;
pub mod likes;
pub mod media;
pub mod posts;
pub mod profiles;

pub use comments::CommentService;
pub use feed::FeedComposer;
pub use likes::LikeService;
pub use media::{FileUpload, MediaKind, MediaService, StoredMedia};
pub use posts::PostService;
pub use profiles::ProfileResolver;
