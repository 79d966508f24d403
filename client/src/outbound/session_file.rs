//! JSON file persistence for the provider session.
//!
//! The file is written to a sibling temporary path and renamed into place
//! so a crash never leaves a half-written session behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::ports::{SessionPersistence, SessionPersistenceError, StoredSession};

/// Session stored as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// Persistence backed by `path`; parent directories are created on save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, error: &std::io::Error) -> SessionPersistenceError {
        SessionPersistenceError::io(format!(
            "failed to {action} {}: {error}",
            self.path.display()
        ))
    }
}

impl SessionPersistence for SessionFile {
    fn load(&self) -> Result<Option<StoredSession>, SessionPersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(self.io_error("read", &error)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|error| SessionPersistenceError::corrupt(error.to_string()))
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionPersistenceError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| self.io_error("create parent of", &error))?;
        }
        let json = serde_json::to_vec_pretty(session)
            .map_err(|error| SessionPersistenceError::io(error.to_string()))?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|error| self.io_error("write", &error))?;
        fs::rename(&staging, &self.path).map_err(|error| self.io_error("replace", &error))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionPersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.io_error("remove", &error)),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for file-backed persistence.
    use super::*;
    use crate::domain::{UserId, UserIdentity};
    use chrono::{TimeZone, Utc};

    fn session() -> StoredSession {
        StoredSession::new(
            "access",
            "refresh",
            Utc.with_ymd_and_hms(2025, 1, 5, 15, 30, 0)
                .single()
                .expect("time"),
            UserIdentity::new(
                UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("uuid"),
                "ada@example.edu",
                Some("Ada".to_owned()),
            ),
        )
    }

    #[test]
    fn saved_sessions_load_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = SessionFile::new(dir.path().join("nested").join("session.json"));

        assert_eq!(file.load().expect("empty load"), None);
        file.save(&session()).expect("save");
        assert_eq!(file.load().expect("load"), Some(session()));
    }

    #[test]
    fn clearing_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = SessionFile::new(dir.path().join("session.json"));
        file.save(&session()).expect("save");

        file.clear().expect("first clear");
        file.clear().expect("second clear");
        assert_eq!(file.load().expect("load"), None);
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, b"{not json").expect("seed");

        let error = SessionFile::new(path).load().expect_err("corrupt");
        assert!(matches!(error, SessionPersistenceError::Corrupt { .. }));
    }
}
