/// Profile resolution - lazy creation and batched lookups
use crate::domain::models::{Identity, NewProfile, Profile, ProfileImageKind};
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::repository::ProfileStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const NEW_USER_NAME: &str = "New User";
const DISPLAY_FALLBACK_NAME: &str = "User";

/// Deterministic handle from the first 8 hex characters of the id.
pub fn fallback_handle(user_id: Uuid) -> String {
    let simple = user_id.simple().to_string();
    format!("user_{}", &simple[..8])
}

fn long_handle(user_id: Uuid) -> String {
    format!("user_{}", user_id.simple())
}

/// Minimal profile used when the store cannot be reached.
pub fn stand_in_profile(user_id: Uuid) -> Profile {
    let now = Utc::now();
    Profile {
        id: user_id,
        username: fallback_handle(user_id),
        full_name: None,
        avatar_url: None,
        cover_image_url: None,
        bio: None,
        location: None,
        website: None,
        created_at: now,
        updated_at: now,
    }
}

/// Display-only profile for owners whose row is missing. Never persisted.
pub fn display_profile(user_id: Uuid) -> Profile {
    Profile {
        full_name: Some(DISPLAY_FALLBACK_NAME.to_string()),
        ..stand_in_profile(user_id)
    }
}

#[derive(Clone)]
pub struct ProfileResolver {
    store: Arc<dyn ProfileStore>,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Fetch the caller's profile, creating a default one on first access.
    ///
    /// Never fails: a concurrent insert is resolved by re-reading, and an
    /// unreachable store yields a stand-in profile.
    pub async fn resolve_profile(&self, identity: &Identity) -> Profile {
        let user_id = identity.user_id;

        match self.store.find_profile(user_id).await {
            Ok(Some(profile)) => return profile,
            Ok(None) => {}
            Err(e) => {
                warn!(%user_id, error = %e, "profile lookup failed, using stand-in");
                return stand_in_profile(user_id);
            }
        }

        info!(%user_id, "no profile found, creating default");
        let mut draft = NewProfile {
            id: user_id,
            username: fallback_handle(user_id),
            full_name: Some(
                identity
                    .full_name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| NEW_USER_NAME.to_string()),
            ),
            avatar_url: identity.avatar_url.clone(),
        };

        // Second attempt only runs when the short handle belongs to someone else.
        for attempt in 0..2 {
            match self.store.insert_profile(&draft).await {
                Ok(profile) => return profile,
                Err(StoreError::UniqueViolation(constraint)) => {
                    match self.store.find_profile(user_id).await {
                        Ok(Some(profile)) => return profile,
                        Ok(None) if attempt == 0 => {
                            warn!(%user_id, %constraint, "handle taken, retrying with long handle");
                            draft.username = long_handle(user_id);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(%user_id, error = %e, "profile re-read failed");
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!(%user_id, error = %e, "profile insert failed, using stand-in");
                    break;
                }
            }
        }

        stand_in_profile(user_id)
    }

    /// Resolve many owners in one batched lookup.
    ///
    /// Missing owners (and every owner, if the store fails) get a
    /// display-only default.
    pub async fn resolve_many(&self, user_ids: &[Uuid]) -> HashMap<Uuid, Profile> {
        if user_ids.is_empty() {
            return HashMap::new();
        }

        let mut profiles: HashMap<Uuid, Profile> = match self.store.find_profiles(user_ids).await {
            Ok(found) => found.into_iter().map(|p| (p.id, p)).collect(),
            Err(e) => {
                warn!(error = %e, count = user_ids.len(), "batched profile lookup failed");
                HashMap::new()
            }
        };

        for id in user_ids {
            profiles.entry(*id).or_insert_with(|| display_profile(*id));
        }

        profiles
    }

    /// Read-only lookup for public profile pages.
    pub async fn view_profile(&self, user_id: Uuid) -> Profile {
        self.resolve_many(&[user_id])
            .await
            .remove(&user_id)
            .unwrap_or_else(|| display_profile(user_id))
    }

    /// Point the caller's avatar or cover at a freshly uploaded image.
    pub async fn update_profile_image(
        &self,
        identity: &Identity,
        kind: ProfileImageKind,
        url: &str,
    ) -> ServiceResult<Profile> {
        self.resolve_profile(identity).await;

        self.store
            .update_profile_image(identity.user_id, kind, url)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Profile not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;

    fn identity(full_name: Option<&str>) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            full_name: full_name.map(str::to_string),
            avatar_url: None,
        }
    }

    #[test]
    fn handle_uses_id_prefix() {
        let id = Uuid::parse_str("1234abcd-0000-0000-0000-000000000000").unwrap();
        assert_eq!(fallback_handle(id), "user_1234abcd");
    }

    #[tokio::test]
    async fn creates_default_profile_on_first_access() {
        let store = Arc::new(MemoryStore::new());
        let resolver = ProfileResolver::new(store.clone());
        let who = identity(Some("Vespa Fan"));

        let profile = resolver.resolve_profile(&who).await;

        assert_eq!(profile.id, who.user_id);
        assert_eq!(profile.full_name.as_deref(), Some("Vespa Fan"));
        assert_eq!(profile.username, fallback_handle(who.user_id));
        assert_eq!(store.profile_rows(), 1);

        let again = resolver.resolve_profile(&who).await;
        assert_eq!(again, profile);
        assert_eq!(store.profile_rows(), 1);
    }

    #[tokio::test]
    async fn missing_metadata_defaults_display_name() {
        let store = Arc::new(MemoryStore::new());
        let resolver = ProfileResolver::new(store);

        let profile = resolver.resolve_profile(&identity(None)).await;
        assert_eq!(profile.full_name.as_deref(), Some("New User"));
    }

    #[tokio::test]
    async fn concurrent_first_access_creates_one_row() {
        let store = Arc::new(MemoryStore::new());
        let resolver = ProfileResolver::new(store.clone());
        let who = identity(Some("Racer"));

        let (a, b) = tokio::join!(resolver.resolve_profile(&who), resolver.resolve_profile(&who));

        assert_eq!(store.profile_rows(), 1);
        assert_eq!(a, b);
        assert!(store.call_count("insert_profile") >= 1);
    }

    #[tokio::test]
    async fn handle_collision_falls_back_to_long_handle() {
        let store = Arc::new(MemoryStore::new());
        let resolver = ProfileResolver::new(store.clone());
        let first = Uuid::parse_str("abcdef01-1111-1111-1111-111111111111").unwrap();
        let second = Uuid::parse_str("abcdef01-2222-2222-2222-222222222222").unwrap();

        resolver
            .resolve_profile(&Identity {
                user_id: first,
                ..Default::default()
            })
            .await;
        let profile = resolver
            .resolve_profile(&Identity {
                user_id: second,
                ..Default::default()
            })
            .await;

        assert_eq!(profile.username, format!("user_{}", second.simple()));
        assert_eq!(store.profile_rows(), 2);
    }

    #[tokio::test]
    async fn unreachable_store_yields_stand_in() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let resolver = ProfileResolver::new(store.clone());
        let who = identity(Some("Ghost"));

        let profile = resolver.resolve_profile(&who).await;

        assert_eq!(profile.id, who.user_id);
        assert_eq!(profile.username, fallback_handle(who.user_id));
        assert_eq!(profile.full_name, None);
    }

    #[tokio::test]
    async fn resolve_many_is_one_lookup_with_defaults() {
        let store = Arc::new(MemoryStore::new());
        let resolver = ProfileResolver::new(store.clone());
        let known = identity(Some("Known"));
        resolver.resolve_profile(&known).await;
        store.reset_calls();

        let stranger = Uuid::new_v4();
        let profiles = resolver.resolve_many(&[known.user_id, stranger]).await;

        assert_eq!(store.call_count("find_profiles"), 1);
        assert_eq!(store.total_calls(), 1);
        assert_eq!(profiles[&known.user_id].full_name.as_deref(), Some("Known"));
        assert_eq!(profiles[&stranger].full_name.as_deref(), Some("User"));
        assert_eq!(store.profile_rows(), 1);
    }
}
