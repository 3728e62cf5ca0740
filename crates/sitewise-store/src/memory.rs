//! In-memory storage implementations for development and testing.

use async_trait::async_trait;
use chrono::Utc;
use sitewise_core::error::Result;
use sitewise_core::models::SessionContext;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::ports::{ObjectStore, SessionBackend};

/// In-memory implementation of ObjectStore
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    /// Create a new in-memory object store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.get(key).cloned())
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.keys().filter(|key| key.starts_with(prefix)).cloned().collect())
    }
}

/// In-memory implementation of SessionBackend
#[derive(Debug, Clone, Default)]
pub struct MemorySessionBackend {
    sessions: Arc<RwLock<HashMap<String, SessionContext>>>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn load(&self, session_id: &str) -> Result<Option<SessionContext>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions.get(session_id).filter(|s| !s.is_expired(Utc::now())).cloned())
    }

    async fn save(&self, session: &SessionContext) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_object_store_crud() {
        let store = MemoryObjectStore::new();

        store.put("projects/a/project.json", b"{}".to_vec()).await.unwrap();
        store.put("projects/b/project.json", b"{}".to_vec()).await.unwrap();
        store.put("sessions/s1.json", b"{}".to_vec()).await.unwrap();

        assert_eq!(store.get("projects/a/project.json").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.list("projects/").await.unwrap().len(), 2);

        store.delete("projects/a/project.json").await.unwrap();
        store.delete("projects/missing/project.json").await.unwrap();
        assert_eq!(store.get("projects/a/project.json").await.unwrap(), None);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_session_backend_hides_expired_sessions() {
        let backend = MemorySessionBackend::new();

        let live = SessionContext::new("live", Duration::hours(1));
        let expired = SessionContext::new("expired", Duration::seconds(-1));
        backend.save(&live).await.unwrap();
        backend.save(&expired).await.unwrap();

        assert!(backend.load("live").await.unwrap().is_some());
        assert!(backend.load("expired").await.unwrap().is_none());
    }
}
