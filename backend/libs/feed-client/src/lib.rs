//! Client-side controller for the social feed.
//!
//! `FeedController` turns user actions into server calls through a
//! [`FeedApi`] and folds the results into [`FeedState`] via the pure
//! [`reduce`] function. Rendering is left to the embedding UI.

pub mod api;
pub mod controller;
pub mod error;
pub mod media;
pub mod models;
pub mod session;
pub mod state;

pub use api::{FeedApi, HttpFeedApi};
pub use controller::FeedController;
pub use error::{ClientError, Result};
pub use media::{MediaAttachment, MediaFile, MediaKind};
pub use session::{ClientSession, SessionStore, SubscriptionId};
pub use state::{reduce, ComposerPhase, FeedAction, FeedState};
