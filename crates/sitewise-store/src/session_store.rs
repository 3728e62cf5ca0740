//! Session Context Store: per-conversation state with a retention window.

use async_trait::async_trait;
use chrono::Utc;
use mini_moka::sync::Cache;
use sitewise_core::config::CacheConfig;
use sitewise_core::error::{Result, SitewiseError};
use sitewise_core::models::{PendingDuplicateCheck, SessionContext};
use std::sync::Arc;

use crate::ports::{ObjectStore, SessionBackend};

/// Session backend persisting `sessions/{id}.json` documents in an object store
pub struct ObjectSessionBackend {
    objects: Arc<dyn ObjectStore>,
}

impl ObjectSessionBackend {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    fn key(session_id: &str) -> String {
        format!("sessions/{}.json", session_id)
    }
}

#[async_trait]
impl SessionBackend for ObjectSessionBackend {
    async fn load(&self, session_id: &str) -> Result<Option<SessionContext>> {
        let Some(bytes) = self.objects.get(&Self::key(session_id)).await? else {
            return Ok(None);
        };

        let session: SessionContext = serde_json::from_slice(&bytes)?;
        if session.is_expired(Utc::now()) {
            tracing::debug!(session_id, "Session expired");
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn save(&self, session: &SessionContext) -> Result<()> {
        let body = serde_json::to_vec(session)?;
        self.objects.put(&Self::key(&session.session_id), body).await
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.objects.delete(&Self::key(session_id)).await
    }
}

/// Lazily-created, TTL-bearing session contexts with a read cache
pub struct SessionContextStore {
    backend: Arc<dyn SessionBackend>,
    cache: Cache<String, SessionContext>,
    ttl: chrono::Duration,
}

impl SessionContextStore {
    /// Sessions are retained for `session_ttl`; reads are cached for
    /// `project_ttl`, holding at most `max_entries` sessions.
    pub fn new(backend: Arc<dyn SessionBackend>, cache: CacheConfig) -> Result<Self> {
        let ttl = chrono::Duration::from_std(cache.session_ttl).map_err(|e| SitewiseError::ConfigInvalid {
            key: "session_ttl_secs".to_string(),
            reason: e.to_string(),
        })?;
        let sessions = Cache::builder()
            .max_capacity(cache.max_entries)
            .time_to_live(cache.project_ttl)
            .build();
        Ok(Self { backend, cache: sessions, ttl })
    }

    /// Current context for `session_id`, created on first access
    pub async fn get(&self, session_id: &str) -> Result<SessionContext> {
        if let Some(session) = self.cache.get(&session_id.to_string()) {
            if !session.is_expired(Utc::now()) {
                return Ok(session);
            }
        }

        let session = match self.backend.load(session_id).await? {
            Some(session) => session,
            None => {
                tracing::debug!(session_id, "Creating session context");
                let session = SessionContext::new(session_id, self.ttl);
                self.backend.save(&session).await?;
                session
            }
        };

        self.cache.insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    /// Apply `change` to the session and persist it with a refreshed expiry
    pub async fn update<F>(&self, session_id: &str, change: F) -> Result<SessionContext>
    where
        F: FnOnce(&mut SessionContext),
    {
        let mut session = self.get(session_id).await?;
        change(&mut session);
        session.touch(self.ttl);

        self.backend.save(&session).await?;
        self.cache.insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    pub async fn set_active_project(&self, session_id: &str, name: &str) -> Result<SessionContext> {
        self.update(session_id, |s| s.set_active_project(name)).await
    }

    pub async fn add_to_history(&self, session_id: &str, name: &str) -> Result<SessionContext> {
        self.update(session_id, |s| s.add_to_history(name)).await
    }

    pub async fn clear_active_project(&self, session_id: &str) -> Result<SessionContext> {
        self.update(session_id, SessionContext::clear_active_project).await
    }

    /// Clear the active project only if it currently points at `name`
    pub async fn clear_active_if(&self, session_id: &str, name: &str) -> Result<SessionContext> {
        self.update(session_id, |s| {
            if s.active_project.as_deref() == Some(name) {
                s.clear_active_project();
            }
        })
        .await
    }

    pub async fn rename_project(&self, session_id: &str, old: &str, new: &str) -> Result<SessionContext> {
        self.update(session_id, |s| s.rename_project(old, new)).await
    }

    pub async fn forget_project(&self, session_id: &str, name: &str) -> Result<SessionContext> {
        self.update(session_id, |s| s.forget_project(name)).await
    }

    pub async fn set_pending_duplicate(
        &self,
        session_id: &str,
        pending: PendingDuplicateCheck,
    ) -> Result<SessionContext> {
        self.update(session_id, |s| s.pending_duplicate = Some(pending)).await
    }

    /// Remove and return the suspended duplicate prompt, if any
    pub async fn take_pending_duplicate(&self, session_id: &str) -> Result<Option<PendingDuplicateCheck>> {
        let mut taken = None;
        self.update(session_id, |s| taken = s.pending_duplicate.take()).await?;
        Ok(taken)
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        self.cache.invalidate(&session_id.to_string());
        self.backend.delete(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryObjectStore, MemorySessionBackend};
    use sitewise_core::models::Coordinates;

    fn store() -> SessionContextStore {
        SessionContextStore::new(Arc::new(MemorySessionBackend::new()), CacheConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_lazy_creation() {
        let store = store();
        let session = store.get("s-1").await.unwrap();

        assert_eq!(session.session_id, "s-1");
        assert!(session.active_project.is_none());
        assert!(session.project_history.is_empty());
    }

    #[tokio::test]
    async fn test_active_project_and_history() {
        let store = store();
        store.set_active_project("s-1", "alpha").await.unwrap();
        store.set_active_project("s-1", "beta").await.unwrap();
        let session = store.add_to_history("s-1", "alpha").await.unwrap();

        assert_eq!(session.active_project.as_deref(), Some("beta"));
        assert_eq!(session.project_history, vec!["alpha", "beta"]);

        let session = store.clear_active_if("s-1", "alpha").await.unwrap();
        assert_eq!(session.active_project.as_deref(), Some("beta"));

        let session = store.rename_project("s-1", "beta", "gamma").await.unwrap();
        assert_eq!(session.active_project.as_deref(), Some("gamma"));

        let session = store.forget_project("s-1", "gamma").await.unwrap();
        assert!(session.active_project.is_none());
        assert_eq!(session.project_history, vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_pending_duplicate_is_taken_once() {
        let store = store();
        store
            .set_pending_duplicate(
                "s-1",
                PendingDuplicateCheck {
                    query: "analyze terrain at 32.45, -99.73".to_string(),
                    coordinates: Coordinates::new(32.45, -99.73),
                    candidates: Vec::new(),
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        assert!(store.take_pending_duplicate("s-1").await.unwrap().is_some());
        assert!(store.take_pending_duplicate("s-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_object_backend_round_trip_and_expiry() {
        let objects = Arc::new(MemoryObjectStore::new());
        let backend = ObjectSessionBackend::new(objects.clone());

        let mut session = SessionContext::new("s-2", chrono::Duration::hours(1));
        session.set_active_project("alpha");
        backend.save(&session).await.unwrap();
        assert_eq!(backend.load("s-2").await.unwrap(), Some(session));
        assert!(objects.get("sessions/s-2.json").await.unwrap().is_some());

        let expired = SessionContext::new("s-3", chrono::Duration::seconds(-5));
        backend.save(&expired).await.unwrap();
        assert!(backend.load("s-3").await.unwrap().is_none());
    }
}
