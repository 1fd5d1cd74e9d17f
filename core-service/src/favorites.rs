//! # Favorites
//!
//! Per-user set of favorite track ids.
//!
//! Ids keep the order in which they were added; toggling an id that is
//! already present removes it. [`InMemoryFavorites`] lives as long as the
//! session, [`SettingsFavoritesStore`] persists the list as a JSON array
//! under a single key of the host [`SettingsStore`].

use crate::error::Result;
use async_trait::async_trait;
use bridge_traits::SettingsStore;
use core_playback::Track;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Settings key used by [`SettingsFavoritesStore`] unless overridden.
pub const DEFAULT_FAVORITES_KEY: &str = "favorites.track_ids";

#[async_trait]
pub trait FavoritesStore: Send + Sync {
    async fn is_favorite(&self, track_id: &str) -> Result<bool>;

    /// Flip membership of `track` and return the membership afterwards.
    async fn toggle_favorite(&self, track: &Track) -> Result<bool>;

    /// Favorite ids, oldest first.
    async fn favorite_ids(&self) -> Result<Vec<String>>;
}

/// Flip `id` in `ids`. Returns `true` when it was added.
fn toggle_id(ids: &mut Vec<String>, id: &str) -> bool {
    match ids.iter().position(|existing| existing == id) {
        Some(index) => {
            ids.remove(index);
            false
        }
        None => {
            ids.push(id.to_string());
            true
        }
    }
}

/// Favorites kept in memory for the lifetime of the store.
#[derive(Debug, Default)]
pub struct InMemoryFavorites {
    ids: Mutex<Vec<String>>,
}

impl InMemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FavoritesStore for InMemoryFavorites {
    async fn is_favorite(&self, track_id: &str) -> Result<bool> {
        Ok(self.ids.lock().iter().any(|id| id == track_id))
    }

    async fn toggle_favorite(&self, track: &Track) -> Result<bool> {
        Ok(toggle_id(&mut self.ids.lock(), track.id()))
    }

    async fn favorite_ids(&self) -> Result<Vec<String>> {
        Ok(self.ids.lock().clone())
    }
}

/// Favorites persisted through the host settings store.
///
/// The list is read lazily on first use and cached. Writes go through
/// before the cache is updated, so a failed write leaves both the store and
/// the cache untouched.
pub struct SettingsFavoritesStore {
    settings: Arc<dyn SettingsStore>,
    key: String,
    cache: tokio::sync::Mutex<Option<Vec<String>>>,
}

impl SettingsFavoritesStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self::with_key(settings, DEFAULT_FAVORITES_KEY)
    }

    pub fn with_key(settings: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            settings,
            key: key.into(),
            cache: tokio::sync::Mutex::new(None),
        }
    }

    async fn read(&self) -> Result<Vec<String>> {
        match self.settings.get_string(&self.key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn cached(&self) -> Result<Vec<String>> {
        let mut cache = self.cache.lock().await;
        if let Some(ids) = cache.as_ref() {
            return Ok(ids.clone());
        }
        let ids = self.read().await?;
        *cache = Some(ids.clone());
        Ok(ids)
    }
}

#[async_trait]
impl FavoritesStore for SettingsFavoritesStore {
    async fn is_favorite(&self, track_id: &str) -> Result<bool> {
        Ok(self.cached().await?.iter().any(|id| id == track_id))
    }

    async fn toggle_favorite(&self, track: &Track) -> Result<bool> {
        // Held for the whole read-modify-write so concurrent toggles serialize.
        let mut cache = self.cache.lock().await;
        let mut ids = match cache.as_ref() {
            Some(ids) => ids.clone(),
            None => self.read().await?,
        };

        let favorite = toggle_id(&mut ids, track.id());
        let raw = serde_json::to_string(&ids)?;
        self.settings.set_string(&self.key, &raw).await?;

        debug!(track_id = %track.id(), favorite, count = ids.len(), "Favorites persisted");
        *cache = Some(ids);
        Ok(favorite)
    }

    async fn favorite_ids(&self) -> Result<Vec<String>> {
        self.cached().await
    }
}

impl std::fmt::Debug for SettingsFavoritesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsFavoritesStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track::new(id, id, "Artist", format!("https://cdn.test/{id}.mp3"))
    }

    #[test]
    fn test_toggle_id_preserves_order() {
        let mut ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(!toggle_id(&mut ids, "b"));
        assert_eq!(ids, ["a", "c"]);
        assert!(toggle_id(&mut ids, "b"));
        assert_eq!(ids, ["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_in_memory_toggle_twice_removes() {
        let favorites = InMemoryFavorites::new();
        let t = track("42");

        assert!(!favorites.is_favorite("42").await.unwrap());
        assert!(favorites.toggle_favorite(&t).await.unwrap());
        assert!(favorites.is_favorite("42").await.unwrap());
        assert!(!favorites.toggle_favorite(&t).await.unwrap());
        assert!(favorites.favorite_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_lists_in_insertion_order() {
        let favorites = InMemoryFavorites::new();
        for id in ["3", "1", "2"] {
            favorites.toggle_favorite(&track(id)).await.unwrap();
        }
        assert_eq!(favorites.favorite_ids().await.unwrap(), ["3", "1", "2"]);
    }
}
