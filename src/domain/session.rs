//! Call session registry
//!
//! Correlates a call identifier with the caller resolved when the call started.
//! Entries expire after a fixed age and the table never grows past its capacity.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
    time::{Duration, Instant},
};

use serde::Serialize;
use tracing::{error, info};

use crate::{
    directory::{UserDirectory, UserRecord},
    domain::phone::find_user_by_phone,
};

pub const DEFAULT_CALL_ID: &str = "default";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallSession {
    pub user: UserRecord,
    pub caller_number: String,
}

#[derive(Debug)]
struct SessionEntry {
    session: CallSession,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct SessionStore {
    entries: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Stores `session` under `call_id`, replacing any previous entry.
    pub fn insert(&self, call_id: &str, session: CallSession) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        entries.retain(|_, entry| now.duration_since(entry.stored_at) < self.ttl);

        if !entries.contains_key(call_id) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            call_id.to_string(),
            SessionEntry {
                session,
                stored_at: now,
            },
        );
    }

    pub fn get(&self, call_id: &str) -> Option<CallSession> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(call_id)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.session.clone())
    }

    pub fn remove(&self, call_id: &str) -> Option<CallSession> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(call_id).map(|entry| entry.session)
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves the called number and remembers the caller for `call_id`.
///
/// Best effort: an unresolved number or an unreachable directory leaves the
/// store untouched. Returns the session when one was stored.
pub async fn register_call_context(
    store: &SessionStore,
    directory: &dyn UserDirectory,
    to_number: Option<&str>,
    call_id: Option<&str>,
) -> Option<CallSession> {
    let call_id = call_id.unwrap_or(DEFAULT_CALL_ID);
    let to_number = to_number.filter(|number| !number.is_empty())?;

    let user = match find_user_by_phone(directory, to_number).await {
        Ok(Some(user)) => user,
        Ok(None) => return None,
        Err(err) => {
            error!(error = %err, call_id = %call_id, "user lookup failed during call registration");
            return None;
        }
    };

    let session = CallSession {
        user,
        caller_number: to_number.to_string(),
    };
    store.insert(call_id, session.clone());
    info!(
        call_id = %call_id,
        user = %session.user.full_name,
        caller_number = %session.caller_number,
        "call session stored"
    );
    Some(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;

    fn session(name: &str) -> CallSession {
        CallSession {
            user: UserRecord {
                full_name: name.to_string(),
                phone: "+919876543210".to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                role: "support_agent".to_string(),
            },
            caller_number: "+91 98765 43210".to_string(),
        }
    }

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new(vec![session("Asha").user])
    }

    #[test]
    fn insert_overwrites_existing_entry() {
        let store = SessionStore::new(Duration::from_secs(60), 8);
        store.insert("call-1", session("Asha"));
        store.insert("call-1", session("Ravi"));

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("call-1").map(|found| found.user.full_name),
            Some("Ravi".to_string())
        );
    }

    #[test]
    fn expired_entries_are_invisible_and_purged() {
        let store = SessionStore::new(Duration::ZERO, 8);
        store.insert("call-1", session("Asha"));

        assert!(store.get("call-1").is_none());
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn full_store_evicts_oldest_entry() {
        let store = SessionStore::new(Duration::from_secs(60), 2);
        store.insert("call-1", session("Asha"));
        std::thread::sleep(Duration::from_millis(2));
        store.insert("call-2", session("Ravi"));
        std::thread::sleep(Duration::from_millis(2));
        store.insert("call-3", session("Meera"));

        assert_eq!(store.len(), 2);
        assert!(store.get("call-1").is_none());
        assert!(store.get("call-2").is_some());
        assert!(store.get("call-3").is_some());
    }

    #[test]
    fn overwriting_at_capacity_keeps_other_entries() {
        let store = SessionStore::new(Duration::from_secs(60), 2);
        store.insert("call-1", session("Asha"));
        store.insert("call-2", session("Ravi"));
        store.insert("call-2", session("Meera"));

        assert_eq!(store.len(), 2);
        assert!(store.get("call-1").is_some());
    }

    #[test]
    fn remove_returns_stored_session() {
        let store = SessionStore::new(Duration::from_secs(60), 8);
        store.insert("call-1", session("Asha"));

        assert_eq!(store.remove("call-1"), Some(session("Asha")));
        assert_eq!(store.remove("call-1"), None);
    }

    #[tokio::test]
    async fn registration_defaults_call_id() {
        let store = SessionStore::new(Duration::from_secs(60), 8);
        let stored =
            register_call_context(&store, &directory(), Some("98765-43210"), None).await;

        assert!(stored.is_some());
        let found = store.get(DEFAULT_CALL_ID).expect("default session stored");
        assert_eq!(found.user.full_name, "Asha");
        assert_eq!(found.caller_number, "98765-43210");
    }

    #[tokio::test]
    async fn unresolved_caller_stores_nothing() {
        let store = SessionStore::new(Duration::from_secs(60), 8);
        let stored =
            register_call_context(&store, &directory(), Some("+1 555 0100"), Some("call-9"))
                .await;

        assert!(stored.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_number_stores_nothing() {
        let store = SessionStore::new(Duration::from_secs(60), 8);
        let stored = register_call_context(&store, &directory(), None, Some("call-9")).await;

        assert!(stored.is_none());
        assert!(store.is_empty());
    }
}
