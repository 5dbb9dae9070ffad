//! Session Storage
//!
//! Key-value persistence for the session, the client's equivalent of
//! browser local storage. Only two keys are ever written:
//! [`ACCESS_TOKEN_KEY`] and [`USER_ID_KEY`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

use super::error::{SessionError, SessionResult};

/// Storage key for the bearer token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the logged-in user's id
pub const USER_ID_KEY: &str = "user_id";

/// Backing store for persisted session values
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read a value, `None` when the key is absent
    async fn get(&self, key: &str) -> SessionResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> SessionResult<()>;

    /// Remove a value; removing an absent key is not an error
    async fn remove(&self, key: &str) -> SessionResult<()>;
}

/// In-memory storage, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> SessionResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// JSON file storage
///
/// The whole map is rewritten on every change. Writes go to a sibling
/// temporary file which is then renamed over the original.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> SessionResult<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(map)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn remove(&self, key: &str) -> SessionResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map).await
    }
}
