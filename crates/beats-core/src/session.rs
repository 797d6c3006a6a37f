//! Persistent session token (the client's equivalent of the login cookie).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: Option<StoredSession>,
}

impl SessionStore {
    /// Read the token file.  A missing or unreadable file means no session.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = Self::read(&path);
        Self { path, current }
    }

    fn read(path: &Path) -> Option<StoredSession> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str::<StoredSession>(&content).ok()
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|s| s.issued_at)
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Store a fresh token.  The in-memory session is updated even when
    /// writing the file fails.
    pub fn set(&mut self, token: String) -> anyhow::Result<()> {
        self.current = Some(StoredSession {
            token,
            issued_at: Utc::now(),
        });
        self.save()
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.current = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        let Some(session) = &self.current else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_means_no_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::load(dir.path().join("session.json"));
        assert!(!store.is_active());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_set_persists_across_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let mut store = SessionStore::load(&path);
        store.set("abc123".to_string()).unwrap();

        let reloaded = SessionStore::load(&path);
        assert_eq!(reloaded.token(), Some("abc123"));
        assert_eq!(reloaded.issued_at(), store.issued_at());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let mut store = SessionStore::load(&path);
        store.set("abc123".to_string()).unwrap();
        store.clear().unwrap();
        assert!(!path.exists());
        assert!(!SessionStore::load(&path).is_active());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(!SessionStore::load(&path).is_active());
    }
}
