//! Shared fixtures: in-memory backends, sessions and signed tokens.
#![allow(dead_code)]

use jsonwebtoken::{encode, EncodingKey, Header};
use social_feed_service::config::FeedConfig;
use social_feed_service::middleware::{Claims, Session, SessionVerifier, UserMetadata};
use social_feed_service::repository::{MemoryStore, Stores};
use social_feed_service::storage::MemoryObjectStorage;
use social_feed_service::AppState;
use std::sync::Arc;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret";
pub const AUDIENCE: &str = "authenticated";
pub const CDN: &str = "http://cdn.test";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryObjectStorage>,
    pub state: AppState,
    pub verifier: Arc<SessionVerifier>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(MemoryObjectStorage::new(CDN));
    let state = AppState::new(
        Stores::memory(store.clone()),
        storage.clone(),
        FeedConfig::default(),
    );

    Harness {
        store,
        storage,
        state,
        verifier: Arc::new(SessionVerifier::new(SECRET, AUDIENCE)),
    }
}

pub fn session(user_id: Uuid, full_name: &str) -> Session {
    Session {
        user_id,
        access_token: token(user_id, full_name),
        email: None,
        full_name: Some(full_name.to_string()),
        avatar_url: None,
    }
}

pub fn token(user_id: Uuid, full_name: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        aud: Some(AUDIENCE.to_string()),
        email: Some(format!("{}@example.com", user_id.simple())),
        user_metadata: UserMetadata {
            full_name: Some(full_name.to_string()),
            avatar_url: None,
        },
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token encodes")
}

pub fn bearer(user_id: Uuid, full_name: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(user_id, full_name)))
}

pub const BOUNDARY: &str = "----scootr-test-boundary";

/// Hand-built multipart body: text fields plus an optional `file` part.
pub fn multipart(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
