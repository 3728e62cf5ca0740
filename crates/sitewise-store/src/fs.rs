//! Filesystem object store: one file per key under a root directory

use async_trait::async_trait;
use sitewise_core::error::{Result, SitewiseError};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::ports::ObjectStore;

#[derive(Debug, Clone)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(SitewiseError::storage_permanent(
                "resolve_key",
                format!("invalid object key '{}'", key),
            ));
        }
        Ok(self.root.join(relative))
    }

    async fn collect_keys(&self, dir: PathBuf, keys: &mut Vec<String>) -> Result<()> {
        let mut pending = vec![dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error("list", e)),
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error("list", e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_error("list", e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    let key: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    keys.push(key.join("/"));
                }
            }
        }

        Ok(())
    }
}

fn io_error(operation: &str, err: std::io::Error) -> SitewiseError {
    let transient = matches!(
        err.kind(),
        ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
    );
    SitewiseError::Storage { operation: operation.to_string(), reason: err.to_string(), transient }
}

#[async_trait]
impl ObjectStore for FileObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("get", e)),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| io_error("put", e))?;
        }

        // Write-then-rename so readers never observe a partial document
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, body).await.map_err(|e| io_error("put", e))?;
        fs::rename(&tmp, &path).await.map_err(|e| io_error("put", e))?;

        tracing::debug!(key, "Stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error("delete", e)),
        }

        // Drop the now-empty per-object directory; a non-empty one stays
        if let Some(parent) = path.parent() {
            if parent != self.root {
                let _ = fs::remove_dir(parent).await;
            }
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        self.collect_keys(self.root.clone(), &mut keys).await?;

        keys.retain(|key| key.starts_with(prefix) && !key.ends_with(".tmp"));
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_list_delete() {
        let dir = TempDir::new().unwrap();
        let store = FileObjectStore::new(dir.path());

        store.put("projects/alpha/project.json", b"{\"a\":1}".to_vec()).await.unwrap();
        store.put("projects/beta/project.json", b"{}".to_vec()).await.unwrap();
        store.put("sessions/s1.json", b"{}".to_vec()).await.unwrap();

        let bytes = store.get("projects/alpha/project.json").await.unwrap().unwrap();
        assert_eq!(bytes, b"{\"a\":1}");

        let keys = store.list("projects/").await.unwrap();
        assert_eq!(keys, vec!["projects/alpha/project.json", "projects/beta/project.json"]);

        store.delete("projects/alpha/project.json").await.unwrap();
        assert!(store.get("projects/alpha/project.json").await.unwrap().is_none());
        assert!(!dir.path().join("projects/alpha").exists());

        // Idempotent
        store.delete("projects/alpha/project.json").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_on_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileObjectStore::new(dir.path().join("not-created"));
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileObjectStore::new(dir.path());

        let err = store.get("../outside.json").await.unwrap_err();
        assert_eq!(err.code(), "S3_ERROR");
        assert!(!err.is_retryable());
    }
}
