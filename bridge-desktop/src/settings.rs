//! Settings storage in a JSON file.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// JSON-file-backed settings store.
///
/// The file holds one flat object of string values. It is read on first
/// access and rewritten (through a temporary file and a rename) on every
/// change. A missing file is an empty store.
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<Option<BTreeMap<String, String>>>,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: Mutex::new(None),
        }
    }

    /// `<config dir>/playback-core/settings.json`, if the platform has a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("playback-core").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                warn!(path = ?self.path, error = %e, "Settings file is corrupt");
                BridgeError::Storage(format!("corrupt settings file: {e}"))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec_pretty(values)
            .map_err(|e| BridgeError::Storage(format!("failed to encode settings: {e}")))?;

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, raw).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    /// Apply `change` to the cached values and write them out.
    ///
    /// The cache only takes the new values once the write succeeded.
    async fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut guard = self.values.lock().await;
        let mut values = match guard.as_ref() {
            Some(values) => values.clone(),
            None => self.load().await?,
        };
        change(&mut values);
        self.persist(&values).await?;
        *guard = Some(values);
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
        .await?;
        debug!(key, "Stored setting");
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut guard = self.values.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard.as_ref().and_then(|values| values.get(key).cloned()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.update(|values| {
            values.remove(key);
        })
        .await
    }
}

impl std::fmt::Debug for JsonSettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSettingsStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("bridge-desktop-{}", uuid::Uuid::new_v4()))
            .join("settings.json")
    }

    #[tokio::test]
    async fn test_roundtrip_through_file() {
        let path = scratch_path();
        let store = JsonSettingsStore::new(&path);

        assert_eq!(store.get_string("favorites").await.unwrap(), None);
        store.set_string("favorites", r#"["1","2"]"#).await.unwrap();
        assert!(store.has_key("favorites").await.unwrap());

        // A fresh store sees what the first one wrote.
        let reopened = JsonSettingsStore::new(&path);
        assert_eq!(
            reopened.get_string("favorites").await.unwrap().as_deref(),
            Some(r#"["1","2"]"#)
        );

        reopened.delete("favorites").await.unwrap();
        assert_eq!(reopened.get_string("favorites").await.unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let path = scratch_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{broken").unwrap();

        let store = JsonSettingsStore::new(&path);
        assert!(matches!(
            store.get_string("anything").await,
            Err(BridgeError::Storage(_))
        ));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
