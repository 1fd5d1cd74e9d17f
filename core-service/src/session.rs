//! # Playback Session
//!
//! The façade hosts talk to. A [`PlaybackSession`] owns:
//!
//! - the [`PlaybackController`] state machine
//! - a pump task forwarding the engine's status events to the controller
//! - a command gate serializing transport commands in call order
//! - the favorites store, the user's playlist library and an optional
//!   catalogue search client
//!
//! Loads hold the gate only while claiming their generation, so a newer load
//! supersedes an older one instead of queueing behind its `open`.

use crate::error::{Result, ServiceError};
use crate::favorites::{FavoritesStore, InMemoryFavorites, SettingsFavoritesStore};
use crate::library::{InMemoryLibrary, PlaylistLibrary, SettingsPlaylistLibrary, UserPlaylist};
use crate::search::{normalize_query, TrackSearchClient};
use bridge_traits::EngineEventReceiver;
use core_playback::{
    PlaybackConfig, PlaybackController, PlaybackState, Playlist, SnapshotReceiver, Track,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{
    CoreEvent, EventBus, EventStream, FavoritesEvent, LibraryEvent, PlaylistEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex as CommandGate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub struct PlaybackSession {
    controller: Arc<PlaybackController>,
    gate: CommandGate<()>,
    favorites: Arc<dyn FavoritesStore>,
    library: Arc<dyn PlaylistLibrary>,
    search: Option<Arc<dyn TrackSearchClient>>,
    shutdown: CancellationToken,
    runtime: Handle,
}

impl PlaybackSession {
    /// Build a session and start its engine-event pump.
    ///
    /// Must be called from within a tokio runtime. Favorites and user
    /// playlists are persisted through the configured `SettingsStore` when
    /// their feature flag is on and kept in memory otherwise.
    pub fn new(core: CoreConfig, playback: PlaybackConfig) -> Result<Self> {
        core.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| ServiceError::InitializationFailed(format!("no tokio runtime: {e}")))?;

        let events = EventBus::new(core.event_buffer_size);
        let controller = Arc::new(PlaybackController::new(
            Arc::clone(&core.audio_engine),
            playback,
            events,
        )?);

        let favorites: Arc<dyn FavoritesStore> =
            match (&core.settings_store, core.features.persist_favorites) {
                (Some(store), true) => Arc::new(SettingsFavoritesStore::new(Arc::clone(store))),
                _ => Arc::new(InMemoryFavorites::new()),
            };
        let library: Arc<dyn PlaylistLibrary> =
            match (&core.settings_store, core.features.persist_playlists) {
                (Some(store), true) => Arc::new(SettingsPlaylistLibrary::new(Arc::clone(store))),
                _ => Arc::new(InMemoryLibrary::new()),
            };

        let shutdown = CancellationToken::new();
        runtime.spawn(run_pump(
            Arc::clone(&controller),
            core.audio_engine.subscribe(),
            shutdown.clone(),
        ));

        info!(
            persist_favorites = core.features.persist_favorites,
            persist_playlists = core.features.persist_playlists,
            "Playback session started"
        );

        Ok(Self {
            controller,
            gate: CommandGate::new(()),
            favorites,
            library,
            search: None,
            shutdown,
            runtime,
        })
    }

    pub fn with_search_client(mut self, client: Arc<dyn TrackSearchClient>) -> Self {
        self.search = Some(client);
        self
    }

    /// Replace the favorites store picked from the configuration.
    pub fn with_favorites_store(mut self, store: Arc<dyn FavoritesStore>) -> Self {
        self.favorites = store;
        self
    }

    pub fn with_playlist_library(mut self, library: Arc<dyn PlaylistLibrary>) -> Self {
        self.library = library;
        self
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.controller.snapshot()
    }

    /// Snapshots published from now on. Lagging receivers get
    /// `RecvError::Lagged(n)` with the number of skipped snapshots.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.controller.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        self.controller.events()
    }

    /// Domain events filtered down to one family, e.g. playback only.
    pub fn event_stream(&self) -> EventStream {
        self.controller.events().stream()
    }

    pub fn is_disposed(&self) -> bool {
        self.controller.is_disposed()
    }

    // ------------------------------------------------------------------
    // Playlist
    // ------------------------------------------------------------------

    pub fn playlist(&self) -> Playlist {
        self.controller.playlist()
    }

    /// Replace the playlist. The current track keeps playing.
    pub fn set_playlist(&self, tracks: impl Into<Playlist>) {
        self.replace_playlist(tracks.into(), None);
    }

    /// `(index, len)` of the current track within the playlist.
    pub fn queue_position(&self) -> Option<(usize, usize)> {
        self.controller.queue_position()
    }

    fn replace_playlist(&self, playlist: Playlist, query: Option<String>) {
        if self.controller.is_disposed() {
            return;
        }
        let track_count = playlist.len();
        self.controller.set_playlist(playlist);
        self.emit(CoreEvent::Playlist(PlaylistEvent::Replaced {
            track_count,
            query,
        }));
    }

    /// Search the catalogue and make the results the new playlist.
    ///
    /// Returns the number of tracks loaded. Blank queries are rejected
    /// without reaching the search client.
    #[instrument(skip(self))]
    pub async fn search_into_playlist(&self, query: &str) -> Result<usize> {
        self.ensure_live()?;
        let query = normalize_query(query)?;
        let tracks = self.search_client()?.search(query).await?;
        let count = tracks.len();
        debug!(count, "Search results received");
        self.replace_playlist(Playlist::new(tracks), Some(query.to_string()));
        Ok(count)
    }

    /// Make an artist's top tracks the new playlist.
    ///
    /// The `Replaced` event carries `artist:{id}` as its query.
    #[instrument(skip(self))]
    pub async fn artist_top_tracks_into_playlist(&self, artist_id: &str) -> Result<usize> {
        self.ensure_live()?;
        let artist_id = normalize_query(artist_id)?;
        let tracks = self.search_client()?.artist_top_tracks(artist_id).await?;
        let count = tracks.len();
        debug!(count, "Artist top tracks received");
        self.replace_playlist(Playlist::new(tracks), Some(format!("artist:{artist_id}")));
        Ok(count)
    }

    fn search_client(&self) -> Result<&Arc<dyn TrackSearchClient>> {
        self.search
            .as_ref()
            .ok_or_else(|| ServiceError::CapabilityMissing {
                capability: "TrackSearchClient".to_string(),
                message: "Attach a search client with PlaybackSession::with_search_client"
                    .to_string(),
            })
    }

    // ------------------------------------------------------------------
    // Loading and navigation
    // ------------------------------------------------------------------

    /// Load `track`, superseding any load still in flight.
    pub async fn load_track(&self, track: Track) {
        let autoplay = self.controller.config().autoplay_on_load;
        self.load(track, autoplay).await;
    }

    /// Load `track` and start it as soon as it is ready.
    pub async fn play_track(&self, track: Track) {
        self.load(track, true).await;
    }

    async fn load(&self, track: Track, autoplay: bool) {
        let ticket = {
            let _gate = self.gate.lock().await;
            self.controller.begin_load(track, autoplay)
        };
        if let Some(ticket) = ticket {
            self.controller.complete_load(ticket).await;
        }
    }

    /// Move to the next playlist track, playing it if playback was active.
    pub async fn next(&self) {
        let ticket = {
            let _gate = self.gate.lock().await;
            self.controller.begin_next()
        };
        if let Some(ticket) = ticket {
            self.controller.complete_load(ticket).await;
        }
    }

    pub async fn previous(&self) {
        let ticket = {
            let _gate = self.gate.lock().await;
            self.controller.begin_previous()
        };
        if let Some(ticket) = ticket {
            self.controller.complete_load(ticket).await;
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    pub async fn play(&self) {
        let _gate = self.gate.lock().await;
        self.controller.play().await;
    }

    pub async fn pause(&self) {
        let _gate = self.gate.lock().await;
        self.controller.pause().await;
    }

    pub async fn toggle_play_pause(&self) {
        let _gate = self.gate.lock().await;
        self.controller.toggle_play_pause().await;
    }

    pub async fn stop(&self) {
        let _gate = self.gate.lock().await;
        self.controller.stop().await;
    }

    pub async fn seek(&self, position: Duration) {
        let _gate = self.gate.lock().await;
        self.controller.seek(position).await;
    }

    pub async fn set_volume(&self, volume: f32) {
        let _gate = self.gate.lock().await;
        self.controller.set_volume(volume).await;
    }

    // ------------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------------

    pub async fn is_favorite(&self, track_id: &str) -> Result<bool> {
        self.favorites.is_favorite(track_id).await
    }

    /// Flip the favorite flag of `track`; returns the new membership.
    pub async fn toggle_favorite(&self, track: &Track) -> Result<bool> {
        self.ensure_live()?;
        let favorite = self.favorites.toggle_favorite(track).await?;
        self.emit(CoreEvent::Favorites(FavoritesEvent::Toggled {
            track_id: track.id().to_string(),
            favorite,
        }));
        Ok(favorite)
    }

    pub async fn favorite_ids(&self) -> Result<Vec<String>> {
        self.favorites.favorite_ids().await
    }

    // ------------------------------------------------------------------
    // Playlist library
    // ------------------------------------------------------------------

    pub async fn playlists(&self) -> Result<Vec<UserPlaylist>> {
        self.library.playlists().await
    }

    pub async fn create_playlist(&self, name: &str) -> Result<UserPlaylist> {
        self.ensure_live()?;
        let playlist = self.library.create_playlist(name).await?;
        self.emit(CoreEvent::Library(LibraryEvent::Created {
            playlist_id: playlist.id.clone(),
            name: playlist.name.clone(),
        }));
        Ok(playlist)
    }

    /// Returns `false` when no playlist had that id.
    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<bool> {
        self.ensure_live()?;
        let deleted = self.library.delete_playlist(playlist_id).await?;
        if deleted {
            self.emit(CoreEvent::Library(LibraryEvent::Deleted {
                playlist_id: playlist_id.to_string(),
            }));
        }
        Ok(deleted)
    }

    pub async fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> Result<UserPlaylist> {
        self.ensure_live()?;
        let playlist = self.library.add_to_playlist(playlist_id, track).await?;
        self.emit(CoreEvent::Library(LibraryEvent::TrackAdded {
            playlist_id: playlist_id.to_string(),
            track_id: track.id().to_string(),
        }));
        Ok(playlist)
    }

    pub async fn remove_from_playlist(
        &self,
        playlist_id: &str,
        track_id: &str,
    ) -> Result<UserPlaylist> {
        self.ensure_live()?;
        let playlist = self.library.remove_from_playlist(playlist_id, track_id).await?;
        self.emit(CoreEvent::Library(LibraryEvent::TrackRemoved {
            playlist_id: playlist_id.to_string(),
            track_id: track_id.to_string(),
        }));
        Ok(playlist)
    }

    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        self.library.playlist_tracks(playlist_id).await
    }

    /// Make a saved playlist the active queue; returns its length.
    pub async fn queue_user_playlist(&self, playlist_id: &str) -> Result<usize> {
        self.ensure_live()?;
        let tracks = self.library.playlist_tracks(playlist_id).await?;
        let count = tracks.len();
        self.replace_playlist(Playlist::new(tracks), None);
        Ok(count)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.controller.is_disposed() {
            return Err(ServiceError::Disposed);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Stop the pump, close the live handle and end every subscription.
    ///
    /// Later commands are ignored. Idempotent.
    pub async fn dispose(&self) {
        self.shutdown.cancel();
        self.controller.dispose().await;
    }

    fn emit(&self, event: CoreEvent) {
        self.controller.events().emit(event);
    }
}

impl Drop for PlaybackSession {
    /// Without an explicit [`PlaybackSession::dispose`], the controller is
    /// disposed on the session's runtime so the live handle is closed.
    fn drop(&mut self) {
        self.shutdown.cancel();
        if self.controller.is_disposed() {
            return;
        }
        debug!("Session dropped without dispose; disposing in background");
        let controller = Arc::clone(&self.controller);
        self.runtime.spawn(async move { controller.dispose().await });
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("controller", &self.controller)
            .field("search", &self.search.is_some())
            .field("pump_cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}

/// Forward engine status events to the controller until cancelled.
///
/// Auto-advance loads run on their own task so statuses keep draining while
/// the next track opens.
async fn run_pump(
    controller: Arc<PlaybackController>,
    mut receiver: EngineEventReceiver,
    shutdown: CancellationToken,
) {
    debug!("Engine event pump started");
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = receiver.recv() => match received {
                Ok(status) => match controller.apply_engine_status(status) {
                    Some(work) if work.is_load() => {
                        let controller = Arc::clone(&controller);
                        tokio::spawn(async move { work.run(&controller).await });
                    }
                    Some(work) => work.run(&controller).await,
                    None => {}
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Engine event pump lagged; stale statuses dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("Engine event channel closed");
                    break;
                }
            },
        }
    }
    debug!("Engine event pump stopped");
}
