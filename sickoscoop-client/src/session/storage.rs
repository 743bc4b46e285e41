//! Key/value storage that survives restarts, holding the session token and
//! the cached user record.
//!
//! Storage is optional equipment: every failure is logged and treated as an
//! absent value, never surfaced to callers of [`SessionPersistence`].

use serde_json::Value;
use sickoscoop_common::model::{auth::AuthToken, user::User};
use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use thiserror::Error;
use tracing::{debug, warn};

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_DATA_KEY: &str = "userData";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage content is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage is unavailable")]
    Unavailable,
}

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// A JSON object of string values in a single file, rewritten atomically
/// through a sibling temporary file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let Value::Object(object) = serde_json::from_str(&content)? else {
            return Err(StorageError::Unavailable);
        };

        Ok(object
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(value) => Some((key, value)),
                _ => None,
            })
            .collect())
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(entries)?;

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        f(&mut entries);
        self.save(&entries)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

/// Typed access to the persisted session on top of a [`SessionStorage`].
#[derive(Clone)]
pub struct SessionPersistence {
    storage: Arc<dyn SessionStorage>,
}

impl SessionPersistence {
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn token(&self) -> Option<AuthToken> {
        self.read(AUTH_TOKEN_KEY)
            .map(AuthToken::new)
            .filter(|token| !token.is_empty())
    }

    /// Loads token and user; a user record that no longer parses wipes both.
    #[must_use]
    pub fn load(&self) -> Option<(AuthToken, User)> {
        let token = self.token()?;
        let user_data = self.read(USER_DATA_KEY)?;

        match serde_json::from_str(&user_data) {
            Ok(user) => Some((token, user)),
            Err(err) => {
                warn!(error = %err, "Stored user data is corrupt, discarding session");
                self.clear();
                None
            }
        }
    }

    pub fn save(&self, token: &AuthToken, user: &User) {
        self.write(AUTH_TOKEN_KEY, token.as_str());
        self.save_user(user);
    }

    pub fn save_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(json) => self.write(USER_DATA_KEY, &json),
            Err(err) => warn!(error = %err, "Could not serialize user for storage"),
        }
    }

    pub fn clear(&self) {
        for key in [AUTH_TOKEN_KEY, USER_DATA_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!(error = %err, key, "Could not remove stored value");
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap_or_else(|err| {
            warn!(error = %err, key, "Could not read stored value");
            None
        })
    }

    fn write(&self, key: &str, value: &str) {
        match self.storage.set(key, value) {
            Ok(()) => debug!(key, "Stored value"),
            Err(err) => warn!(error = %err, key, "Could not store value"),
        }
    }
}
