//! Persisted client session: the bearer token and a cached user profile.
//!
//! This is the dashboard's counterpart of browser local storage. Validity of the
//! token is never checked here; see `ApiClient::validate_session`.

use crate::error::SessionError;
use crate::models::user::User;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The two persisted entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, rename = "auth_token")]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<(), SessionError>;
    fn user(&self) -> Option<User>;
    fn set_user(&self, user: &User) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;

    /// A token is present. Says nothing about whether the backend accepts it.
    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

/// In-process session; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: RwLock<Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    fn set_token(&self, token: &str) -> Result<(), SessionError> {
        self.inner.write().token = Some(token.to_string());
        Ok(())
    }

    fn user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    fn set_user(&self, user: &User) -> Result<(), SessionError> {
        self.inner.write().user = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.inner.write() = Session::default();
        Ok(())
    }
}

/// Session cached in memory and written through to a JSON file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    inner: RwLock<Session>,
}

impl FileSessionStore {
    /// Opens the session file. A missing file is an empty session; an
    /// unreadable or corrupt one is logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = match Self::read(&path) {
            Ok(Some(session)) => {
                debug!(path = %path.display(), "Loaded cached session");
                session
            }
            Ok(None) => Session::default(),
            Err(e) => {
                warn!(path = %path.display(), "Ignoring unreadable session file: {}", e);
                Session::default()
            }
        };

        Self {
            path,
            inner: RwLock::new(session),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Option<Session>, SessionError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        if session.token.is_none() && session.user.is_none() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Write to a sibling file first so a crash never leaves half a session.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(session)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Memory only changes once the file agrees with it.
    fn update(&self, apply: impl FnOnce(&mut Session)) -> Result<(), SessionError> {
        let mut guard = self.inner.write();
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    fn set_token(&self, token: &str) -> Result<(), SessionError> {
        self.update(|s| s.token = Some(token.to_string()))
    }

    fn user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    fn set_user(&self, user: &User) -> Result<(), SessionError> {
        self.update(|s| s.user = Some(user.clone()))
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.update(|s| *s = Session::default())
    }
}
