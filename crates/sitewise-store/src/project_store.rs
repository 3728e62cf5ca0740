//! Project Store: persisted project records addressed by name.
//!
//! Each record lives at `projects/{name}/project.json`. Reads go through a
//! bounded per-record cache and a name-list cache, both invalidated on every
//! write made through this store. Transient backend faults are retried with
//! the configured backoff policy; once retries are exhausted a read falls
//! back to a cached copy that is still within its TTL.
//!
//! Writes are last-writer-wins: concurrent merge-saves of the same record
//! each read, merge and put without coordination.

use mini_moka::sync::Cache;
use sitewise_core::config::CacheConfig;
use sitewise_core::error::Result;
use sitewise_core::models::{ProjectRecord, ProjectUpdate};
use sitewise_core::retry::{retry_transient, RetryPolicy};
use std::sync::Arc;

use crate::ports::ObjectStore;

const PROJECT_PREFIX: &str = "projects/";
const PROJECT_FILE: &str = "project.json";

/// Storage key for a project name
pub fn project_key(name: &str) -> String {
    format!("{}{}/{}", PROJECT_PREFIX, name, PROJECT_FILE)
}

fn name_from_key(key: &str) -> Option<&str> {
    let name = key.strip_prefix(PROJECT_PREFIX)?.strip_suffix(PROJECT_FILE)?.strip_suffix('/')?;
    (!name.is_empty() && !name.contains('/')).then_some(name)
}

pub struct ProjectStore {
    backend: Arc<dyn ObjectStore>,
    records: Cache<String, ProjectRecord>,
    names: Cache<(), Vec<String>>,
    retry: RetryPolicy,
}

impl ProjectStore {
    pub fn new(backend: Arc<dyn ObjectStore>, cache: CacheConfig, retry: RetryPolicy) -> Self {
        Self {
            backend,
            records: Cache::builder()
                .max_capacity(cache.max_entries)
                .time_to_live(cache.project_ttl)
                .build(),
            names: Cache::builder().max_capacity(1).time_to_live(cache.list_ttl).build(),
            retry,
        }
    }

    /// Load a record by name, serving a fresh cached copy when available
    pub async fn load(&self, name: &str) -> Result<Option<ProjectRecord>> {
        if let Some(record) = self.records.get(&name.to_string()) {
            return Ok(Some(record));
        }
        self.load_uncached(name).await
    }

    async fn load_uncached(&self, name: &str) -> Result<Option<ProjectRecord>> {
        let key = project_key(name);
        let backend = self.backend.clone();

        let fetched = retry_transient(&self.retry, "load_project", move || {
            let backend = backend.clone();
            let key = key.clone();
            async move { backend.get(&key).await }
        })
        .await;

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(e) if e.is_retryable() => match self.records.get(&name.to_string()) {
                Some(cached) => {
                    tracing::warn!(project = name, error = %e, "Storage unavailable, serving cached project");
                    return Ok(Some(cached));
                }
                None => {
                    tracing::error!(project = name, error = %e, "Failed to load project");
                    return Err(e);
                }
            },
            Err(e) => {
                tracing::error!(project = name, error = %e, "Failed to load project");
                return Err(e);
            }
        };

        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let record: ProjectRecord = serde_json::from_slice(&bytes)?;
        self.records.insert(name.to_string(), record.clone());
        Ok(Some(record))
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.load(name).await?.is_some())
    }

    /// Merge-save `update` into the stored record, creating it when absent
    pub async fn save(&self, name: &str, update: ProjectUpdate) -> Result<ProjectRecord> {
        let mut record = match self.load_uncached(name).await? {
            Some(record) => record,
            None => {
                tracing::info!(project = name, "Creating project record");
                ProjectRecord::new(name)
            }
        };

        record.apply(update);
        self.put_record(&record).await?;
        Ok(record)
    }

    /// Replace the stored record wholesale (keyed by `record.project_name`)
    pub async fn put_record(&self, record: &ProjectRecord) -> Result<()> {
        let key = project_key(&record.project_name);
        let body = serde_json::to_vec_pretty(record)?;
        let backend = self.backend.clone();

        retry_transient(&self.retry, "save_project", move || {
            let backend = backend.clone();
            let key = key.clone();
            let body = body.clone();
            async move { backend.put(&key, body).await }
        })
        .await?;

        self.records.insert(record.project_name.clone(), record.clone());
        self.names.invalidate_all();
        tracing::debug!(project = %record.project_name, status = %record.status, "Saved project");
        Ok(())
    }

    /// Delete a record; returns whether it existed
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let existed = self.load_uncached(name).await?.is_some();
        let key = project_key(name);
        let backend = self.backend.clone();

        retry_transient(&self.retry, "delete_project", move || {
            let backend = backend.clone();
            let key = key.clone();
            async move { backend.delete(&key).await }
        })
        .await?;

        self.invalidate(name);
        Ok(existed)
    }

    /// All stored project names, sorted
    pub async fn list_names(&self) -> Result<Vec<String>> {
        if let Some(names) = self.names.get(&()) {
            return Ok(names);
        }

        let backend = self.backend.clone();
        let keys = retry_transient(&self.retry, "list_projects", move || {
            let backend = backend.clone();
            async move { backend.list(PROJECT_PREFIX).await }
        })
        .await?;

        let mut names: Vec<String> =
            keys.iter().filter_map(|key| name_from_key(key)).map(str::to_string).collect();
        names.sort();
        names.dedup();

        self.names.insert((), names.clone());
        Ok(names)
    }

    /// Every readable record; unreadable documents are skipped with a warning
    pub async fn list(&self) -> Result<Vec<ProjectRecord>> {
        let mut records = Vec::new();
        for name in self.list_names().await? {
            match self.load(&name).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => tracing::warn!(project = %name, error = %e, "Skipping unreadable project"),
            }
        }
        Ok(records)
    }

    /// Drop cached state for one project and the name list
    pub fn invalidate(&self, name: &str) {
        self.records.invalidate(&name.to_string());
        self.names.invalidate_all();
    }

    pub fn invalidate_all(&self) {
        self.records.invalidate_all();
        self.names.invalidate_all();
    }
}
