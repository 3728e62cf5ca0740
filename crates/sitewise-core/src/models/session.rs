use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Coordinates, DuplicateMatch};

/// Maximum number of distinct project names kept in the recency history
pub const MAX_PROJECT_HISTORY: usize = 10;

/// Per-conversation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_project: Option<String>,

    /// Most-recent-first, distinct, bounded by [`MAX_PROJECT_HISTORY`]
    #[serde(default)]
    pub project_history: Vec<String>,

    pub last_updated: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Duplicate prompt awaiting a numbered reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_duplicate: Option<PendingDuplicateCheck>,
}

/// A query suspended while the user chooses between existing nearby projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDuplicateCheck {
    pub query: String,
    pub coordinates: Coordinates,
    pub candidates: Vec<DuplicateMatch>,
    pub created_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            active_project: None,
            project_history: Vec::new(),
            last_updated: now,
            expires_at: now + ttl,
            pending_duplicate: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Refresh the update timestamp and push the expiry out by `ttl`
    pub fn touch(&mut self, ttl: Duration) {
        self.last_updated = Utc::now();
        self.expires_at = self.last_updated + ttl;
    }

    pub fn set_active_project(&mut self, name: &str) {
        self.active_project = Some(name.to_string());
        self.add_to_history(name);
    }

    /// Move `name` to the front of the history
    pub fn add_to_history(&mut self, name: &str) {
        self.project_history.retain(|existing| existing != name);
        self.project_history.insert(0, name.to_string());
        self.project_history.truncate(MAX_PROJECT_HISTORY);
    }

    pub fn clear_active_project(&mut self) {
        self.active_project = None;
    }

    pub fn most_recent_project(&self) -> Option<&str> {
        self.project_history.first().map(String::as_str)
    }

    pub fn rename_project(&mut self, old: &str, new: &str) {
        if self.active_project.as_deref() == Some(old) {
            self.active_project = Some(new.to_string());
        }
        for entry in &mut self.project_history {
            if entry == old {
                *entry = new.to_string();
            }
        }
        let mut seen = std::collections::HashSet::new();
        self.project_history.retain(|entry| seen.insert(entry.clone()));
    }

    /// Drop every reference to a deleted project
    pub fn forget_project(&mut self, name: &str) {
        if self.active_project.as_deref() == Some(name) {
            self.active_project = None;
        }
        self.project_history.retain(|entry| entry != name);
    }
}
