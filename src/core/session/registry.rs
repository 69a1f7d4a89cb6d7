use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use super::{CallContext, CallSession, SessionHandle};

/// Live calls keyed by provider call id.
///
/// Constructed once at startup and handed to every transport handler through
/// the application state. Tests build their own isolated instances.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Return the session for `call_id`, creating it if absent.
    ///
    /// The boolean is `true` only for the caller that actually inserted the
    /// session. A duplicate start gets the existing session and `false`; the
    /// passed context is then discarded.
    pub fn get_or_create(&self, call_id: &str, context: CallContext) -> (SessionHandle, bool) {
        match self.sessions.entry(call_id.to_string()) {
            Entry::Occupied(entry) => {
                debug!(call_id = %call_id, "Session already exists, reusing");
                (Arc::clone(entry.get()), false)
            }
            Entry::Vacant(entry) => {
                let session = Arc::new(CallSession::new(call_id, context));
                entry.insert(Arc::clone(&session));
                info!(call_id = %call_id, "Call session created");
                (session, true)
            }
        }
    }

    /// Like [`SessionRegistry::get_or_create`], also counting a live
    /// connection on the session. Pair every call with
    /// [`SessionRegistry::release`].
    pub fn attach(&self, call_id: &str, context: CallContext) -> (SessionHandle, bool) {
        // attach while the entry guard holds the shard lock, so a concurrent
        // release cannot evict between lookup and attach
        match self.sessions.entry(call_id.to_string()) {
            Entry::Occupied(entry) => {
                let session = Arc::clone(entry.get());
                session.attach();
                debug!(call_id = %call_id, "Attaching to existing session");
                (session, false)
            }
            Entry::Vacant(entry) => {
                let session = Arc::new(CallSession::new(call_id, context));
                session.attach();
                entry.insert(Arc::clone(&session));
                info!(call_id = %call_id, "Call session created");
                (session, true)
            }
        }
    }

    /// Detach one connection from `session`.
    ///
    /// The session is evicted only when this was its last connection and it
    /// is still the registered instance. Returns true if it was evicted.
    pub fn release(&self, session: &SessionHandle) -> bool {
        let removed = self
            .sessions
            .remove_if(session.call_id(), |_, current| {
                Arc::ptr_eq(current, session) && session.detach() == 0
            })
            .is_some();
        if removed {
            session.mark_evicted();
            info!(call_id = %session.call_id(), "Call session removed");
        } else {
            debug!(
                call_id = %session.call_id(),
                remaining = session.connection_count(),
                "Connection detached from session"
            );
        }
        removed
    }

    pub fn get(&self, call_id: &str) -> Option<SessionHandle> {
        self.sessions.get(call_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.sessions.contains_key(call_id)
    }

    /// Evict a call. Removing an unknown id is a no-op.
    pub fn remove(&self, call_id: &str) -> Option<SessionHandle> {
        let removed = self.sessions.remove(call_id).map(|(_, session)| session);
        if let Some(session) = &removed {
            session.mark_evicted();
            info!(call_id = %call_id, "Call session removed");
        }
        removed
    }

    /// Evict `session` only if it is still the registered instance for its id.
    ///
    /// Used by delayed cleanups that must not remove a newer call reusing the id.
    pub fn remove_session(&self, session: &SessionHandle) -> bool {
        let removed = self
            .sessions
            .remove_if(session.call_id(), |_, current| Arc::ptr_eq(current, session))
            .is_some();
        if removed {
            session.mark_evicted();
            info!(call_id = %session.call_id(), "Call session removed");
        }
        removed
    }

    /// Evict every session older than `max_age`, returning how many went.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        let mut expired = Vec::new();
        self.sessions.retain(|call_id, session| {
            if session.age() >= max_age {
                session.mark_evicted();
                expired.push(call_id.clone());
                false
            } else {
                true
            }
        });

        for call_id in &expired {
            info!(call_id = %call_id, "Expired call session evicted");
        }
        expired.len()
    }

    pub fn call_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
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

    fn context(brand: &str) -> CallContext {
        CallContext {
            business_name: "Acme".to_string(),
            product_category: "Widgets".to_string(),
            brand_name: brand.to_string(),
        }
    }

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = SessionRegistry::new();

        let (first, created) = registry.get_or_create("CA123", context("Acme Co"));
        assert!(created);
        let (second, created_again) = registry.get_or_create("CA123", context("Other"));
        assert!(!created_again);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.context().brand_name, "Acme Co");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        let (session, _) = registry.get_or_create("CA1", context("Acme Co"));

        assert!(registry.remove("CA1").is_some());
        assert!(session.is_evicted());
        assert!(registry.remove("CA1").is_none());
        assert!(registry.get("CA1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_session_spares_newer_call() {
        let registry = SessionRegistry::new();
        let (old, _) = registry.get_or_create("CA1", context("Acme Co"));
        registry.remove("CA1");
        let (newer, _) = registry.get_or_create("CA1", context("Acme Co"));

        assert!(!registry.remove_session(&old));
        assert!(registry.contains("CA1"));
        assert!(!newer.is_evicted());

        assert!(registry.remove_session(&newer));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_waits_for_last_connection() {
        let registry = SessionRegistry::new();
        let (first, created) = registry.attach("CA1", context("Acme Co"));
        assert!(created);
        let (second, created_again) = registry.attach("CA1", context("Other"));
        assert!(!created_again);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.connection_count(), 2);

        // the duplicate leaves first; the call stays live
        assert!(!registry.release(&second));
        assert!(registry.contains("CA1"));
        assert!(!first.is_evicted());

        assert!(registry.release(&first));
        assert!(first.is_evicted());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_after_removal_is_a_no_op() {
        let registry = SessionRegistry::new();
        let (session, _) = registry.attach("CA1", context("Acme Co"));
        assert!(registry.remove_session(&session));
        assert!(!registry.release(&session));

        let (newer, _) = registry.attach("CA1", context("Acme Co"));
        assert!(!registry.release(&session));
        assert!(registry.contains("CA1"));
        assert!(!newer.is_evicted());
    }

    #[test]
    fn test_sweep_expired() {
        let registry = SessionRegistry::new();
        let (session, _) = registry.get_or_create("CA1", context("Acme Co"));
        registry.get_or_create("CA2", context("Acme Co"));

        assert_eq!(registry.sweep_expired(Duration::from_secs(3600)), 0);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.sweep_expired(Duration::ZERO), 2);
        assert!(registry.is_empty());
        assert!(session.is_evicted());
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_yields_one_session() {
        let registry = Arc::new(SessionRegistry::new());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get_or_create("CA9", context("Acme Co")) })
            })
            .collect();

        let mut created = 0;
        let mut handles = Vec::new();
        for task in tasks {
            let (handle, was_created) = task.await.unwrap();
            if was_created {
                created += 1;
            }
            handles.push(handle);
        }

        assert_eq!(created, 1);
        assert_eq!(registry.len(), 1);
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
