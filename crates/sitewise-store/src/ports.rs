use async_trait::async_trait;
use sitewise_core::error::Result;
use sitewise_core::models::SessionContext;

/// Port for key-addressed document storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object, `None` if the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Create or replace an object
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()>;

    /// Remove an object; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, in lexicographic order
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Port for TTL-bearing per-session documents
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Load a session, `None` if absent or expired
    async fn load(&self, session_id: &str) -> Result<Option<SessionContext>>;

    /// Store a session (its `expires_at` carries the TTL)
    async fn save(&self, session: &SessionContext) -> Result<()>;

    async fn delete(&self, session_id: &str) -> Result<()>;
}
