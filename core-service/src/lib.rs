//! Playback session façade and bootstrap helpers.
//!
//! This crate wires a host-provided [`AudioEngine`](bridge_traits::AudioEngine)
//! (and optionally a [`SettingsStore`](bridge_traits::SettingsStore)) into a
//! [`PlaybackSession`]. Desktop apps typically enable the `desktop-shims`
//! feature, which pulls in the rodio engine from `bridge-desktop`, and call
//! [`bootstrap_desktop`].
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::PlaybackSession;
//!
//! let config = CoreConfig::builder().audio_engine(engine).build()?;
//! let session = PlaybackSession::new(config, Default::default())?;
//! session.set_playlist(tracks.clone());
//! session.play_track(tracks[0].clone()).await;
//! ```

pub mod error;
pub mod favorites;
pub mod library;
pub mod search;
pub mod session;

pub use error::{Result, ServiceError};
pub use favorites::{FavoritesStore, InMemoryFavorites, SettingsFavoritesStore};
pub use library::{InMemoryLibrary, PlaylistLibrary, SettingsPlaylistLibrary, UserPlaylist};
pub use search::{parse_catalog_response, TrackSearchClient};
pub use session::PlaybackSession;

#[cfg(feature = "catalog-search")]
pub use search::CatalogSearchClient;

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use desktop::bootstrap_desktop;

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
mod desktop {
    use super::*;
    use bridge_desktop::{JsonSettingsStore, RodioAudioEngine};
    use core_playback::PlaybackConfig;
    use core_runtime::config::CoreConfig;
    use std::sync::Arc;
    use tracing::warn;

    /// Session on the default audio output, with favorites and playlists
    /// persisted to the user's config directory when one can be resolved.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bootstrap_desktop(playback: PlaybackConfig) -> Result<PlaybackSession> {
        let engine = RodioAudioEngine::new()
            .map_err(|err| ServiceError::InitializationFailed(err.to_string()))?;
        let mut builder = CoreConfig::builder().audio_engine(Arc::new(engine));

        match JsonSettingsStore::default_path() {
            Some(path) => {
                builder = builder
                    .settings_store(Arc::new(JsonSettingsStore::new(path)))
                    .persist_favorites(true)
                    .persist_playlists(true);
            }
            None => warn!("No config directory; favorites and playlists will not be persisted"),
        }

        PlaybackSession::new(builder.build()?, playback)
    }
}
