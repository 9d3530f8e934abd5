//! Local key/collection store used when the database cannot take a record
//! for one of the non-critical public flows.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};

pub const DEMO_REQUESTS: &str = "demo_requests";
pub const CONTACT_MESSAGES: &str = "contact_messages";

type Collections = BTreeMap<String, Vec<Value>>;

#[derive(Clone)]
pub struct FallbackStore {
    path: Option<PathBuf>,
    inner: Arc<Mutex<Option<Collections>>>,
}

impl FallbackStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            inner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    async fn load(&self) -> AppResult<Collections> {
        let Some(path) = &self.path else {
            return Ok(Collections::new());
        };
        match tokio::fs::read(path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Collections::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::Internal(format!("Fallback store {} is corrupt: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Collections::new()),
            Err(e) => Err(AppError::Internal(format!("Reading fallback store: {e}"))),
        }
    }

    async fn persist(&self, data: &Collections) -> AppResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Internal(format!("Creating fallback dir: {e}")))?;
        }
        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|e| AppError::Internal(format!("Encoding fallback store: {e}")))?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Writing fallback store: {e}")))
    }

    pub async fn push<T: Serialize>(&self, collection: &str, item: &T) -> AppResult<()> {
        let value = serde_json::to_value(item)
            .map_err(|e| AppError::Internal(format!("Encoding fallback record: {e}")))?;

        let mut guard = self.inner.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        // Memory only takes the record once it is on disk.
        let mut next = guard.as_ref().cloned().unwrap_or_default();
        next.entry(collection.to_string()).or_default().push(value);
        self.persist(&next).await?;
        *guard = Some(next);

        tracing::info!(collection, "record saved to fallback store");
        Ok(())
    }

    /// Entries that fail to decode as `T` are skipped.
    pub async fn list<T: DeserializeOwned>(&self, collection: &str) -> AppResult<Vec<T>> {
        let mut guard = self.inner.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let items = guard
            .as_ref()
            .and_then(|d| d.get(collection))
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    fn note(text: &str) -> Note {
        Note { text: text.into() }
    }

    #[tokio::test]
    async fn push_then_list_in_memory() {
        let store = FallbackStore::in_memory();
        store.push(CONTACT_MESSAGES, &note("hello")).await.unwrap();
        store.push(CONTACT_MESSAGES, &note("again")).await.unwrap();

        let notes: Vec<Note> = store.list(CONTACT_MESSAGES).await.unwrap();
        assert_eq!(notes, vec![note("hello"), note("again")]);
        assert!(store.list::<Note>(DEMO_REQUESTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let path = std::env::temp_dir()
            .join(format!("nil-fallback-{}", uuid::Uuid::new_v4()))
            .join("store.json");

        let store = FallbackStore::new(Some(path.clone()));
        store.push(DEMO_REQUESTS, &note("persisted")).await.unwrap();

        let reopened = FallbackStore::new(Some(path.clone()));
        let notes: Vec<Note> = reopened.list(DEMO_REQUESTS).await.unwrap();
        assert_eq!(notes, vec![note("persisted")]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn failed_write_leaves_nothing_behind() {
        let root = std::env::temp_dir().join(format!("nil-fallback-{}", uuid::Uuid::new_v4()));
        let dir = root.join("store");
        let store = FallbackStore::new(Some(dir.join("store.json")));
        store.push(CONTACT_MESSAGES, &note("kept")).await.unwrap();

        // A plain file where the store directory was makes every write fail.
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"").unwrap();

        assert!(store.push(CONTACT_MESSAGES, &note("lost")).await.is_err());
        let notes: Vec<Note> = store.list(CONTACT_MESSAGES).await.unwrap();
        assert_eq!(notes, vec![note("kept")]);

        let _ = std::fs::remove_dir_all(&root);
    }
}
