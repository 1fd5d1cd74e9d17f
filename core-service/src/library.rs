//! # Playlist Library
//!
//! User-curated playlists, separate from the session's active queue.
//!
//! A [`UserPlaylist`] keeps its tracks in the order they were added and
//! remembers the artwork of the most recently added track that had one, so
//! hosts can show a cover without scanning the list. [`InMemoryLibrary`]
//! lives as long as the session; [`SettingsPlaylistLibrary`] persists every
//! playlist as one JSON document under a single [`SettingsStore`] key.

use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use bridge_traits::SettingsStore;
use chrono::{DateTime, Utc};
use core_playback::{Playlist, Track};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Settings key used by [`SettingsPlaylistLibrary`] unless overridden.
pub const DEFAULT_LIBRARY_KEY: &str = "library.playlists";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
    pub created_at: DateTime<Utc>,
    /// Artwork of the latest added track that carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_artwork: Option<String>,
}

impl UserPlaylist {
    fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            tracks: Vec::new(),
            created_at: Utc::now(),
            latest_artwork: None,
        }
    }

    /// The tracks as a queue for [`crate::PlaybackSession::set_playlist`].
    pub fn to_queue(&self) -> Playlist {
        Playlist::new(self.tracks.clone())
    }
}

#[async_trait]
pub trait PlaylistLibrary: Send + Sync {
    /// Every playlist, oldest first.
    async fn playlists(&self) -> Result<Vec<UserPlaylist>>;

    /// Create an empty playlist. Blank names are rejected.
    async fn create_playlist(&self, name: &str) -> Result<UserPlaylist>;

    /// Returns `false` when no playlist had that id.
    async fn delete_playlist(&self, playlist_id: &str) -> Result<bool>;

    /// Append `track`; a track may appear more than once.
    async fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> Result<UserPlaylist>;

    /// Drop every occurrence of `track_id`.
    async fn remove_from_playlist(&self, playlist_id: &str, track_id: &str)
        -> Result<UserPlaylist>;

    /// Tracks of a playlist; empty for an unknown id.
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>>;
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn find_mut<'a>(playlists: &'a mut [UserPlaylist], id: &str) -> Result<&'a mut UserPlaylist> {
    playlists
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| ServiceError::PlaylistNotFound(id.to_string()))
}

fn push_track(playlist: &mut UserPlaylist, track: &Track) {
    playlist.tracks.push(track.clone());
    if let Some(artwork) = track.artwork() {
        playlist.latest_artwork = Some(artwork.to_string());
    }
}

fn tracks_of(playlists: &[UserPlaylist], id: &str) -> Vec<Track> {
    playlists
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.tracks.clone())
        .unwrap_or_default()
}

/// Playlists kept in memory for the lifetime of the library.
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    playlists: Mutex<Vec<UserPlaylist>>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaylistLibrary for InMemoryLibrary {
    async fn playlists(&self) -> Result<Vec<UserPlaylist>> {
        Ok(self.playlists.lock().clone())
    }

    async fn create_playlist(&self, name: &str) -> Result<UserPlaylist> {
        let playlist = UserPlaylist::new(validate_name(name)?);
        self.playlists.lock().push(playlist.clone());
        Ok(playlist)
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<bool> {
        let mut playlists = self.playlists.lock();
        let before = playlists.len();
        playlists.retain(|p| p.id != playlist_id);
        Ok(playlists.len() < before)
    }

    async fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> Result<UserPlaylist> {
        let mut playlists = self.playlists.lock();
        let playlist = find_mut(&mut playlists, playlist_id)?;
        push_track(playlist, track);
        Ok(playlist.clone())
    }

    async fn remove_from_playlist(
        &self,
        playlist_id: &str,
        track_id: &str,
    ) -> Result<UserPlaylist> {
        let mut playlists = self.playlists.lock();
        let playlist = find_mut(&mut playlists, playlist_id)?;
        playlist.tracks.retain(|t| t.id() != track_id);
        Ok(playlist.clone())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        Ok(tracks_of(&self.playlists.lock(), playlist_id))
    }
}

/// Playlists persisted through the host settings store.
///
/// Same caching discipline as the settings-backed favorites: lazy first
/// read, and every mutation is written before the cache changes.
pub struct SettingsPlaylistLibrary {
    settings: Arc<dyn SettingsStore>,
    key: String,
    cache: tokio::sync::Mutex<Option<Vec<UserPlaylist>>>,
}

impl SettingsPlaylistLibrary {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self::with_key(settings, DEFAULT_LIBRARY_KEY)
    }

    pub fn with_key(settings: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            settings,
            key: key.into(),
            cache: tokio::sync::Mutex::new(None),
        }
    }

    async fn read(&self) -> Result<Vec<UserPlaylist>> {
        match self.settings.get_string(&self.key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn cached(&self) -> Result<Vec<UserPlaylist>> {
        let mut cache = self.cache.lock().await;
        if let Some(playlists) = cache.as_ref() {
            return Ok(playlists.clone());
        }
        let playlists = self.read().await?;
        *cache = Some(playlists.clone());
        Ok(playlists)
    }

    /// Read-modify-write under the cache lock. `change` runs on a copy that
    /// only replaces the cache once the write succeeded.
    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<UserPlaylist>) -> Result<T> + Send,
        T: Send,
    {
        let mut cache = self.cache.lock().await;
        let mut playlists = match cache.as_ref() {
            Some(playlists) => playlists.clone(),
            None => self.read().await?,
        };

        let output = change(&mut playlists)?;
        let raw = serde_json::to_string(&playlists)?;
        self.settings.set_string(&self.key, &raw).await?;

        debug!(count = playlists.len(), "Playlist library persisted");
        *cache = Some(playlists);
        Ok(output)
    }
}

#[async_trait]
impl PlaylistLibrary for SettingsPlaylistLibrary {
    async fn playlists(&self) -> Result<Vec<UserPlaylist>> {
        self.cached().await
    }

    async fn create_playlist(&self, name: &str) -> Result<UserPlaylist> {
        let playlist = UserPlaylist::new(validate_name(name)?);
        self.mutate(move |playlists| {
            playlists.push(playlist.clone());
            Ok(playlist)
        })
        .await
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<bool> {
        if !self.cached().await?.iter().any(|p| p.id == playlist_id) {
            return Ok(false);
        }
        self.mutate(|playlists| {
            let before = playlists.len();
            playlists.retain(|p| p.id != playlist_id);
            Ok(playlists.len() < before)
        })
        .await
    }

    async fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> Result<UserPlaylist> {
        self.mutate(|playlists| {
            let playlist = find_mut(playlists, playlist_id)?;
            push_track(playlist, track);
            Ok(playlist.clone())
        })
        .await
    }

    async fn remove_from_playlist(
        &self,
        playlist_id: &str,
        track_id: &str,
    ) -> Result<UserPlaylist> {
        self.mutate(|playlists| {
            let playlist = find_mut(playlists, playlist_id)?;
            playlist.tracks.retain(|t| t.id() != track_id);
            Ok(playlist.clone())
        })
        .await
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        Ok(tracks_of(&self.cached().await?, playlist_id))
    }
}

impl std::fmt::Debug for SettingsPlaylistLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsPlaylistLibrary")
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

    #[tokio::test]
    async fn test_create_add_remove() {
        let library = InMemoryLibrary::new();
        let created = library.create_playlist("  Road trip ").await.unwrap();
        assert_eq!(created.name, "Road trip");
        assert!(created.tracks.is_empty());

        library.add_to_playlist(&created.id, &track("a")).await.unwrap();
        library.add_to_playlist(&created.id, &track("b")).await.unwrap();
        library.add_to_playlist(&created.id, &track("a")).await.unwrap();

        let updated = library.remove_from_playlist(&created.id, "a").await.unwrap();
        let ids: Vec<_> = updated.tracks.iter().map(Track::id).collect();
        assert_eq!(ids, ["b"]);
        assert_eq!(library.playlist_tracks(&created.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_latest_artwork_follows_last_track_with_cover() {
        let library = InMemoryLibrary::new();
        let id = library.create_playlist("Covers").await.unwrap().id;

        library
            .add_to_playlist(&id, &track("a").with_artwork("https://img.test/a.jpg"))
            .await
            .unwrap();
        let playlist = library.add_to_playlist(&id, &track("b")).await.unwrap();
        assert_eq!(playlist.latest_artwork.as_deref(), Some("https://img.test/a.jpg"));

        let playlist = library
            .add_to_playlist(&id, &track("c").with_artwork("https://img.test/c.jpg"))
            .await
            .unwrap();
        assert_eq!(playlist.latest_artwork.as_deref(), Some("https://img.test/c.jpg"));
    }

    #[tokio::test]
    async fn test_unknown_playlist() {
        let library = InMemoryLibrary::new();
        assert!(matches!(
            library.add_to_playlist("missing", &track("a")).await,
            Err(ServiceError::PlaylistNotFound(_))
        ));
        assert!(library.playlist_tracks("missing").await.unwrap().is_empty());
        assert!(!library.delete_playlist("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let library = InMemoryLibrary::new();
        assert!(matches!(
            library.create_playlist(" \t").await,
            Err(ServiceError::InvalidName(_))
        ));
        assert!(library.playlists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_others_in_order() {
        let library = InMemoryLibrary::new();
        let first = library.create_playlist("one").await.unwrap();
        let second = library.create_playlist("two").await.unwrap();
        let third = library.create_playlist("three").await.unwrap();

        assert!(library.delete_playlist(&second.id).await.unwrap());
        let names: Vec<_> = library
            .playlists()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["one", "three"]);
        assert_ne!(first.id, third.id);
    }
}
