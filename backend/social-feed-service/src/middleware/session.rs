use crate::domain::models::Identity;
use crate::error::ServiceError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

/// Profile hints the auth provider embeds in its tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Verified session stored in request extensions.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub access_token: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Session {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Validates HS256 access tokens issued by the auth provider.
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Session, ServiceError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::warn!("session token rejected: {}", e);
            ServiceError::Unauthorized(
                "Authentication error. Please try logging in again.".to_string(),
            )
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            ServiceError::Unauthorized("Invalid token: malformed user id".to_string())
        })?;

        Ok(Session {
            user_id,
            access_token: token.to_string(),
            email: data.claims.email,
            full_name: data.claims.user_metadata.full_name,
            avatar_url: data.claims.user_metadata.avatar_url,
        })
    }
}

/// Actix middleware that attaches a [`Session`] when a bearer token is sent.
///
/// Requests without an `Authorization` header pass through anonymously;
/// a header carrying a bad token is rejected with 401.
pub struct SessionMiddleware {
    verifier: Arc<SessionVerifier>,
}

impl SessionMiddleware {
    pub fn new(verifier: Arc<SessionVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    verifier: Arc<SessionVerifier>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verifier = self.verifier.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .map(|h| h.to_str().unwrap_or_default().to_string());

            if let Some(header) = header {
                let token = header.strip_prefix("Bearer ").ok_or_else(|| {
                    ServiceError::Unauthorized("Invalid Authorization scheme".to_string())
                })?;
                let session = verifier.verify(token.trim())?;
                tracing::debug!(user_id = %session.user_id, "session attached");
                req.extensions_mut().insert(session);
            }

            service.call(req).await
        })
    }
}

/// Nullable session getter for handlers.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn session(&self) -> Option<&Session> {
        self.0.as_ref()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|s| s.user_id)
    }
}

impl FromRequest for CurrentSession {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(CurrentSession(req.extensions().get::<Session>().cloned())))
    }
}

/// Require a session or fail with an auth error carrying `message`.
pub fn require_session<'a>(
    session: Option<&'a Session>,
    message: &str,
) -> Result<&'a Session, ServiceError> {
    session.ok_or_else(|| ServiceError::Unauthorized(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, sub: &str, aud: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
            aud: Some(aud.to_string()),
            email: Some("rider@example.com".to_string()),
            user_metadata: UserMetadata {
                full_name: Some("Road Runner".to_string()),
                avatar_url: None,
            },
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_session_with_metadata() {
        let verifier = SessionVerifier::new("secret", "authenticated");
        let user_id = Uuid::new_v4();

        let session = verifier
            .verify(&token("secret", &user_id.to_string(), "authenticated", 3600))
            .unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.full_name.as_deref(), Some("Road Runner"));
        assert_eq!(session.identity().user_id, user_id);
    }

    #[test]
    fn wrong_secret_expired_or_wrong_audience_is_unauthorized() {
        let verifier = SessionVerifier::new("secret", "authenticated");
        let sub = Uuid::new_v4().to_string();

        for bad in [
            token("other", &sub, "authenticated", 3600),
            token("secret", &sub, "authenticated", -3600),
            token("secret", &sub, "anon", 3600),
            token("secret", "not-a-uuid", "authenticated", 3600),
        ] {
            assert!(matches!(
                verifier.verify(&bad),
                Err(ServiceError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn require_session_reports_auth_error() {
        let err = require_session(None, "You must be logged in to comment").unwrap_err();
        assert_eq!(err.to_string(), "You must be logged in to comment");
    }
}
