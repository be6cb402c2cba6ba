use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// File name used by the durable backend. A single fixed key holds the
/// current bearer token; absence means unauthenticated.
pub const TOKEN_FILE_NAME: &str = "storefront_token.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub value: String,
    pub obtained_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            obtained_at: Utc::now(),
        }
    }
}

/// Shared token storage. Single writer (the session manager), multiple
/// readers (the request layer). The token is an opaque string here; no shape
/// validation happens at this level. All operations are safe to call before
/// the session manager has initialized.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<StoredToken>;
    fn set(&self, token: StoredToken);
    fn clear(&self);
}

/// In-process store, the default for tests and for hosts that handle
/// durability themselves.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<RwLock<Option<StoredToken>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<StoredToken> {
        let guard = self.inner.read().expect("rwlock poisoned");
        guard.clone()
    }

    fn set(&self, token: StoredToken) {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        *guard = Some(token);
    }

    fn clear(&self) {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        *guard = None;
    }
}

/// Durable store backed by a single JSON file, surviving process restarts.
/// I/O failures degrade to "no token" on read and a warning on write; the
/// request layer treats a missing token as unauthenticated either way.
#[derive(Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the token under `dir` using the fixed application key.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_FILE_NAME),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<StoredToken> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to read token file");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "token file is corrupt, ignoring it");
                None
            }
        }
    }

    fn set(&self, token: StoredToken) {
        let payload = match serde_json::to_string(&token) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "failed to serialize token");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, payload) {
            warn!(path = %self.path.display(), %err, "failed to persist token");
        } else {
            debug!(path = %self.path.display(), "token persisted");
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "token cleared"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), %err, "failed to clear token"),
        }
    }
}
