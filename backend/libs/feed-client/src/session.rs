//! Session state shared by the controller and the API client.
//!
//! Created once at the application root and handed out as
//! `Arc<SessionStore>`. Listeners are registered and removed explicitly.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Signed-in user as known to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    pub user_id: Uuid,
    pub access_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(Option<&ClientSession>) + Send + Sync>;

#[derive(Default)]
pub struct SessionStore {
    current: Mutex<Option<ClientSession>>,
    listeners: Mutex<BTreeMap<SubscriptionId, Listener>>,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ClientSession> {
        lock(&self.current).clone()
    }

    /// Replace the session and notify every listener, in subscription order.
    pub fn set_session(&self, session: Option<ClientSession>) {
        *lock(&self.current) = session.clone();

        // Listeners run without the lock held so they may (un)subscribe.
        let listeners: Vec<Listener> = lock(&self.listeners).values().cloned().collect();
        tracing::debug!(
            signed_in = session.is_some(),
            listeners = listeners.len(),
            "session changed"
        );
        for listener in listeners {
            listener(session.as_ref());
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(Option<&ClientSession>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.listeners).insert(id, Arc::new(listener));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.listeners).remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn signed_in() -> ClientSession {
        ClientSession {
            user_id: Uuid::new_v4(),
            access_token: "token".to_string(),
        }
    }

    #[test]
    fn listeners_see_every_change_until_unsubscribed() {
        let store = SessionStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let id = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set_session(Some(signed_in()));
        store.set_session(None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_session(Some(signed_in()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn listener_receives_new_value() {
        let store = Arc::new(SessionStore::new());
        let session = signed_in();
        let expected = session.user_id;
        let observed = Arc::new(Mutex::new(None));
        let sink = observed.clone();
        store.subscribe(move |s| {
            *sink.lock().unwrap() = s.map(|s| s.user_id);
        });

        store.set_session(Some(session));

        assert_eq!(*observed.lock().unwrap(), Some(expected));
        assert_eq!(store.current().map(|s| s.user_id), Some(expected));
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let store = Arc::new(SessionStore::new());
        let handle = store.clone();
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let own_id = slot.clone();
        let id = store.subscribe(move |_| {
            if let Some(id) = *own_id.lock().unwrap() {
                handle.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        store.set_session(None);
        assert_eq!(store.listener_count(), 0);
    }
}
