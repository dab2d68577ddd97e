//! Process-wide map of live sessions.

use std::sync::Arc;

use dashmap::DashMap;

use super::{Session, SessionId};

/// Shared handle store for session ledgers, keyed by [`SessionId`].
///
/// Sessions live until explicitly removed; there is no expiry and no
/// durability across restarts.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session, creating its ledger on first interaction.
    pub fn get_or_create(&self, id: &SessionId) -> Arc<Session> {
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Session::with_id(id.clone())))
            .clone()
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| Arc::clone(&s))
    }

    /// Drop a session's ledger entirely (session end).
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_ledger() {
        let registry = SessionRegistry::new();
        let id = SessionId::from("browser-tab-1");

        let a = registry.get_or_create(&id);
        let b = registry.get_or_create(&id);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_ends_session() {
        let registry = SessionRegistry::new();
        let id = SessionId::from("ephemeral");

        registry.get_or_create(&id);
        assert!(registry.remove(&id).is_some());
        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());
    }
}
