/// Persisted session storage
///
/// Tokens, user and organization live under three fixed keys. Only the full
/// triple counts as a restorable session; a partial set reads as absent.
use super::{AuthTokens, Organization, User};
use crate::error::ClientResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

pub const TOKEN_STORAGE_KEY: &str = "medInventory_tokens";
pub const USER_STORAGE_KEY: &str = "medInventory_user";
pub const ORGANIZATION_STORAGE_KEY: &str = "medInventory_organization";

const ALL_KEYS: [&str; 3] = [TOKEN_STORAGE_KEY, USER_STORAGE_KEY, ORGANIZATION_STORAGE_KEY];

/// Key-value store for session data
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: &str) -> ClientResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    async fn remove(&self, key: &str) -> ClientResult<()>;
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    directory: PathBuf,
}

impl FileSessionStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", key))
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        tokio::fs::create_dir_all(&self.directory).await?;

        // Write then rename so a crash never leaves a half-written entry
        let target = self.path_for(key);
        let tmp = self.directory.join(format!(".{}.tmp", key));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> ClientResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage, used by tests and embedders without a disk
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> ClientResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// The persisted triple
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub tokens: AuthTokens,
    pub user: User,
    pub organization: Organization,
}

impl PersistedSession {
    /// Read the triple; missing, partial or unreadable data yields `None`
    pub async fn load(storage: &dyn SessionStorage) -> Option<Self> {
        let tokens = read_entry::<AuthTokens>(storage, TOKEN_STORAGE_KEY).await?;
        let user = read_entry::<User>(storage, USER_STORAGE_KEY).await?;
        let organization = read_entry::<Organization>(storage, ORGANIZATION_STORAGE_KEY).await?;

        Some(Self {
            tokens,
            user,
            organization,
        })
    }

    pub async fn save(&self, storage: &dyn SessionStorage) -> ClientResult<()> {
        storage
            .set(TOKEN_STORAGE_KEY, &serde_json::to_string(&self.tokens)?)
            .await?;
        storage
            .set(USER_STORAGE_KEY, &serde_json::to_string(&self.user)?)
            .await?;
        storage
            .set(
                ORGANIZATION_STORAGE_KEY,
                &serde_json::to_string(&self.organization)?,
            )
            .await?;
        Ok(())
    }

    /// Remove all three keys; keeps going past individual failures
    pub async fn clear(storage: &dyn SessionStorage) -> ClientResult<()> {
        let mut first_error = None;
        for key in ALL_KEYS {
            if let Err(e) = storage.remove(key).await {
                error!("Failed to clear {} from session storage: {}", key, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn read_entry<T: DeserializeOwned>(storage: &dyn SessionStorage, key: &str) -> Option<T> {
    let raw = match storage.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            error!("Failed to read {} from session storage: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable {} in session storage: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fixtures::{organization, tokens, user};

    fn session() -> PersistedSession {
        PersistedSession {
            tokens: tokens("access-1", "refresh-1"),
            user: user(),
            organization: organization(),
        }
    }

    #[tokio::test]
    async fn test_memory_round_trip_and_clear() {
        let storage = MemorySessionStorage::new();
        assert!(PersistedSession::load(&storage).await.is_none());

        session().save(&storage).await.unwrap();
        assert_eq!(PersistedSession::load(&storage).await, Some(session()));

        PersistedSession::clear(&storage).await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_partial_set_is_absent() {
        let storage = MemorySessionStorage::new();
        session().save(&storage).await.unwrap();
        storage.remove(ORGANIZATION_STORAGE_KEY).await.unwrap();

        assert!(PersistedSession::load(&storage).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_absent() {
        let storage = MemorySessionStorage::new();
        session().save(&storage).await.unwrap();
        storage.set(USER_STORAGE_KEY, "{not json").await.unwrap();

        assert!(PersistedSession::load(&storage).await.is_none());
    }

    #[tokio::test]
    async fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("session"));

        assert!(PersistedSession::load(&storage).await.is_none());
        session().save(&storage).await.unwrap();
        assert!(storage.directory().join("medInventory_tokens.json").exists());

        let reopened = FileSessionStorage::new(dir.path().join("session"));
        assert_eq!(PersistedSession::load(&reopened).await, Some(session()));

        PersistedSession::clear(&reopened).await.unwrap();
        assert!(PersistedSession::load(&storage).await.is_none());
        // Clearing twice is fine
        PersistedSession::clear(&reopened).await.unwrap();
    }
}
