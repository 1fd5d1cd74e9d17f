//! # Playback State Machine
//!
//! [`PlaybackController`] owns the session's [`PlaybackState`], the single
//! live engine handle and the playlist. It applies transport commands,
//! reconciles engine status events and drives auto-advance.
//!
//! ## State transitions
//!
//! ```text
//!            load_track                open ok              play
//!   Idle ─────────────────> Loading ─────────────> Ready ─────────> Playing
//!     ^                        │ open fails                         │   ^
//!     │ stop (from any)        v                          pause     v   │ play
//!     └──────────────────── Error                              Paused ──┘
//!
//!   Playing/Paused --is_buffering--> Buffering --!is_buffering--> Playing/Paused
//!   any playing state --finished--> Loading(next) | Stopped
//! ```
//!
//! ## Concurrency
//!
//! State sits behind a `parking_lot::Mutex` that is never held across an
//! `.await`. Every async result is re-validated after the await against the
//! `disposed` flag, the load generation and the live handle, so results that
//! lost a race are discarded instead of applied.

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, PlaybackFault, Result};
use crate::loader::{HandleSlot, LoadCoordinator, LoadTicket};
use crate::model::{PlaybackState, PlaybackStatus, Playlist, Track};
use crate::navigator;
use bridge_traits::{AudioEngine, BridgeError, EngineHandle, EngineStatus, OpenOptions};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, trace, warn};

/// Receiving end of the snapshot channel.
pub type SnapshotReceiver = broadcast::Receiver<PlaybackState>;

type Navigate = for<'a> fn(Option<&Track>, &'a Playlist) -> Option<&'a Track>;

/// How a completed `open` was applied.
enum LoadOutcome {
    Ready {
        handle: EngineHandle,
        autoplay: bool,
        volume: Option<f32>,
    },
    /// A newer load or a stop won the race; the fresh handle must be closed.
    Superseded(EngineHandle),
    Settled,
}

/// Work left to do once the state lock is released.
enum FollowUp {
    Release(EngineHandle),
    Load(LoadTicket),
    Volume(EngineHandle, f32),
}

/// Engine work produced by [`PlaybackController::apply_engine_status`].
#[must_use = "run the follow-up or handles leak and auto-advance stalls"]
pub struct StatusFollowUp(FollowUp);

impl StatusFollowUp {
    /// True when the work opens the next track, which may involve a fetch.
    pub fn is_load(&self) -> bool {
        matches!(self.0, FollowUp::Load(_))
    }

    pub async fn run(self, controller: &PlaybackController) {
        controller.run_follow_up(self.0).await;
    }
}

impl std::fmt::Debug for StatusFollowUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.0 {
            FollowUp::Release(_) => "release",
            FollowUp::Load(_) => "load",
            FollowUp::Volume(..) => "volume",
        };
        f.debug_tuple("StatusFollowUp").field(&kind).finish()
    }
}

struct Inner {
    state: PlaybackState,
    slot: HandleSlot,
    playlist: Playlist,
    /// Whether the user wants audio running once the engine can deliver it.
    play_intent: bool,
    /// Volume changed while buffering and still has to reach the engine.
    volume_dirty: bool,
    /// False while neither the track nor the engine has reported a length.
    duration_known: bool,
    disposed: bool,
    snapshots: Option<broadcast::Sender<PlaybackState>>,
    published: PlaybackState,
}

impl Inner {
    /// Publish the current state if it differs from the last published one.
    fn commit(&mut self) {
        debug_assert!(
            !self.state.status.requires_handle() || self.slot.live().is_some(),
            "{} without a live handle",
            self.state.status
        );
        if self.state == self.published {
            return;
        }
        self.published = self.state.clone();
        if let Some(sender) = &self.snapshots {
            // No receivers is fine: observers come and go.
            let _ = sender.send(self.state.clone());
        }
    }

    fn wants_playback(&self) -> bool {
        match self.state.status {
            PlaybackStatus::Playing => true,
            PlaybackStatus::Loading | PlaybackStatus::Buffering => self.play_intent,
            _ => false,
        }
    }

    fn report(&mut self, err: &PlaybackError) {
        debug!(error = %err, "Command rejected");
        self.state.last_error = Some(PlaybackFault::from(err));
        self.commit();
    }
}

/// The playback state machine.
///
/// Transport commands never return errors: failures land in
/// [`PlaybackState::last_error`] and, when unrecoverable, in
/// [`PlaybackStatus::Error`].
pub struct PlaybackController {
    engine: Arc<dyn AudioEngine>,
    loader: LoadCoordinator,
    config: PlaybackConfig,
    events: EventBus,
    inner: Mutex<Inner>,
}

impl PlaybackController {
    /// Creates a controller in `Idle` with the configured initial volume.
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        config: PlaybackConfig,
        events: EventBus,
    ) -> Result<Self> {
        config.validate()?;

        let state = PlaybackState::new(config.initial_volume);
        let (snapshots, _) = broadcast::channel(config.snapshot_buffer);

        Ok(Self {
            loader: LoadCoordinator::new(Arc::clone(&engine)),
            engine,
            events,
            inner: Mutex::new(Inner {
                published: state.clone(),
                state,
                slot: HandleSlot::default(),
                playlist: Playlist::empty(),
                play_intent: false,
                volume_dirty: false,
                duration_known: false,
                disposed: false,
                snapshots: Some(snapshots),
            }),
            config,
        })
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Current state snapshot.
    pub fn snapshot(&self) -> PlaybackState {
        self.inner.lock().state.clone()
    }

    /// Subscribe to state snapshots published after this call.
    ///
    /// After [`PlaybackController::dispose`] the returned receiver is already
    /// closed.
    pub fn subscribe(&self) -> SnapshotReceiver {
        let inner = self.inner.lock();
        match &inner.snapshots {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(1);
                drop(sender);
                receiver
            }
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    pub fn playlist(&self) -> Playlist {
        self.inner.lock().playlist.clone()
    }

    /// Replace the playlist wholesale. Playback of the current track continues.
    pub fn set_playlist(&self, playlist: Playlist) {
        let mut inner = self.inner.lock();
        if inner.disposed {
            return;
        }
        debug!(tracks = playlist.len(), "Playlist replaced");
        inner.playlist = playlist;
    }

    /// Position of the current track in the playlist, as `(index, len)`.
    pub fn queue_position(&self) -> Option<(usize, usize)> {
        let inner = self.inner.lock();
        let current = inner.state.current_track.as_ref()?;
        navigator::position_of(current, &inner.playlist)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load `track`, superseding any in-flight load.
    ///
    /// Starts playback afterwards only if `autoplay_on_load` is configured.
    pub async fn load_track(&self, track: Track) {
        if let Some(ticket) = self.begin_load(track, self.config.autoplay_on_load) {
            self.complete_load(ticket).await;
        }
    }

    /// Load `track` and start playing it once it is ready.
    pub async fn play_track(&self, track: Track) {
        if let Some(ticket) = self.begin_load(track, true) {
            self.complete_load(ticket).await;
        }
    }

    /// Synchronous half of a load: claim a generation and enter `Loading`.
    ///
    /// Returns `None` once disposed. The ticket carries the previously live
    /// handle, which only [`PlaybackController::complete_load`] closes: a
    /// ticket dropped without completing leaves that handle open in the
    /// engine.
    #[must_use = "pass the ticket to `complete_load` or the previous handle stays open"]
    pub fn begin_load(&self, track: Track, autoplay: bool) -> Option<LoadTicket> {
        let mut inner = self.inner.lock();
        if inner.disposed {
            return None;
        }
        Some(self.begin_load_locked(&mut inner, track, autoplay))
    }

    fn begin_load_locked(&self, inner: &mut Inner, track: Track, autoplay: bool) -> LoadTicket {
        let ticket = inner.slot.begin(track.clone());

        debug!(
            track_id = %track.id(),
            generation = ticket.generation(),
            autoplay,
            "Loading track"
        );

        inner.state.status = PlaybackStatus::Loading;
        inner.state.duration = track.duration();
        inner.duration_known = !track.duration().is_zero();
        inner.state.position = Duration::ZERO;
        inner.state.last_error = None;
        inner.state.load_generation = ticket.generation();
        inner.state.current_track = Some(track);
        inner.play_intent = autoplay;
        inner.volume_dirty = false;
        inner.commit();

        self.emit(PlaybackEvent::TrackLoading {
            track_id: ticket.track().id().to_string(),
            generation: ticket.generation(),
        });

        ticket
    }

    /// Asynchronous half of a load: open the media and apply the outcome if
    /// the ticket is still current.
    #[instrument(
        skip_all,
        fields(track_id = %ticket.track().id(), generation = ticket.generation())
    )]
    pub async fn complete_load(&self, mut ticket: LoadTicket) {
        let opened_volume = self.inner.lock().state.volume;
        let result = self
            .loader
            .open(
                &mut ticket,
                OpenOptions {
                    initial_volume: opened_volume,
                },
            )
            .await;

        let outcome = {
            let mut inner = self.inner.lock();
            let current = !inner.disposed && inner.slot.is_current(&ticket);

            match result {
                Ok(media) if current => {
                    inner.slot.install(&ticket, media.handle);

                    let duration = media
                        .duration
                        .filter(|d| !d.is_zero())
                        .unwrap_or_else(|| ticket.track().duration());
                    inner.state.status = PlaybackStatus::Ready;
                    inner.state.duration = duration;
                    inner.duration_known = !duration.is_zero();
                    inner.state.position = Duration::ZERO;
                    inner.state.last_error = None;
                    inner.commit();

                    debug!(handle = %media.handle, ?duration, "Track ready");
                    self.emit(PlaybackEvent::TrackReady {
                        track_id: ticket.track().id().to_string(),
                        duration_ms: duration.as_millis() as u64,
                    });

                    let volume = inner.state.volume;
                    LoadOutcome::Ready {
                        handle: media.handle,
                        autoplay: inner.play_intent,
                        volume: (volume != opened_volume).then_some(volume),
                    }
                }
                Ok(media) => LoadOutcome::Superseded(media.handle),
                Err(source) if current => {
                    let err = PlaybackError::LoadFailed {
                        track_id: ticket.track().id().to_string(),
                        source,
                    };
                    warn!(error = %err, "Track failed to load");

                    let fault = PlaybackFault::from(&err);
                    inner.state.status = PlaybackStatus::Error;
                    inner.state.position = Duration::ZERO;
                    inner.state.last_error = Some(fault.clone());
                    inner.play_intent = false;
                    inner.commit();

                    self.emit(PlaybackEvent::Error {
                        track_id: Some(ticket.track().id().to_string()),
                        kind: fault.kind.to_string(),
                        message: fault.message,
                        recoverable: fault.kind.is_recoverable(),
                    });
                    LoadOutcome::Settled
                }
                Err(source) => {
                    debug!(error = %source, "Ignoring failure of superseded load");
                    LoadOutcome::Settled
                }
            }
        };

        match outcome {
            LoadOutcome::Ready {
                handle,
                autoplay,
                volume,
            } => {
                if let Some(volume) = volume {
                    self.push_volume(handle, volume).await;
                }
                if autoplay {
                    self.start(handle, false).await;
                }
            }
            LoadOutcome::Superseded(handle) => {
                debug!(%handle, "Load superseded, closing fresh handle");
                self.loader.release(handle).await;
            }
            LoadOutcome::Settled => {}
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start or resume playback.
    ///
    /// During `Loading` this only records the intent. From `Stopped` the
    /// track restarts from the beginning.
    pub async fn play(&self) {
        let action = {
            let mut inner = self.inner.lock();
            if inner.disposed {
                return;
            }

            match inner.state.status {
                PlaybackStatus::Playing => None,
                PlaybackStatus::Loading => {
                    inner.play_intent = true;
                    None
                }
                PlaybackStatus::Ready
                | PlaybackStatus::Paused
                | PlaybackStatus::Stopped
                | PlaybackStatus::Buffering => match inner.slot.live() {
                    Some(handle) => {
                        inner.play_intent = true;
                        Some((handle, inner.state.status == PlaybackStatus::Stopped))
                    }
                    None => {
                        inner.report(&PlaybackError::NoTrackLoaded);
                        None
                    }
                },
                PlaybackStatus::Idle | PlaybackStatus::Error => {
                    inner.report(&PlaybackError::NoTrackLoaded);
                    None
                }
            }
        };

        if let Some((handle, rewind)) = action {
            self.start(handle, rewind).await;
        }
    }

    async fn start(&self, handle: EngineHandle, rewind: bool) {
        if rewind {
            if let Err(source) = self.engine.seek(handle, Duration::ZERO).await {
                self.command_failed("seek", handle, source).await;
                return;
            }
        }

        if let Err(source) = self.engine.play(handle).await {
            self.command_failed("play", handle, source).await;
            return;
        }

        let cancelled = {
            let mut inner = self.inner.lock();
            if inner.disposed || !inner.slot.is_live(handle) {
                return;
            }

            if !inner.play_intent {
                // Paused while the play call was in flight.
                true
            } else {
                if matches!(
                    inner.state.status,
                    PlaybackStatus::Ready | PlaybackStatus::Paused | PlaybackStatus::Stopped
                ) {
                    if rewind {
                        inner.state.position = Duration::ZERO;
                    }
                    inner.state.status = PlaybackStatus::Playing;
                    inner.state.last_error = None;
                    inner.commit();

                    debug!(%handle, "Playback started");
                    if let Some(track) = &inner.state.current_track {
                        self.emit(PlaybackEvent::Started {
                            track_id: track.id().to_string(),
                        });
                    }
                }
                false
            }
        };

        if cancelled {
            if let Err(source) = self.engine.pause(handle).await {
                self.command_failed("pause", handle, source).await;
            }
        }
    }

    /// Pause playback. During `Loading` this only clears the play intent.
    pub async fn pause(&self) {
        let handle = {
            let mut inner = self.inner.lock();
            if inner.disposed {
                return;
            }

            match inner.state.status {
                PlaybackStatus::Playing | PlaybackStatus::Buffering => inner.slot.live(),
                PlaybackStatus::Loading | PlaybackStatus::Ready => {
                    inner.play_intent = false;
                    None
                }
                _ => None,
            }
        };

        let Some(handle) = handle else {
            return;
        };

        if let Err(source) = self.engine.pause(handle).await {
            self.command_failed("pause", handle, source).await;
            return;
        }

        let mut inner = self.inner.lock();
        if inner.disposed || !inner.slot.is_live(handle) {
            return;
        }
        inner.play_intent = false;
        if inner.state.status == PlaybackStatus::Playing {
            inner.state.status = PlaybackStatus::Paused;
            inner.state.last_error = None;
            inner.commit();

            debug!(%handle, "Playback paused");
            if let Some(track) = &inner.state.current_track {
                self.emit(PlaybackEvent::Paused {
                    track_id: track.id().to_string(),
                    position_ms: inner.state.position.as_millis() as u64,
                });
            }
        }
    }

    /// Pause when playing (or about to), play otherwise.
    pub async fn toggle_play_pause(&self) {
        let playing = self.inner.lock().wants_playback();
        if playing {
            self.pause().await;
        } else {
            self.play().await;
        }
    }

    /// Stop playback and release the engine handle.
    ///
    /// Invalidates in-flight loads. State reaches `Idle` before the close is
    /// awaited.
    pub async fn stop(&self) {
        let handle = {
            let mut inner = self.inner.lock();
            if inner.disposed || inner.state.status == PlaybackStatus::Idle {
                return;
            }

            let handle = inner.slot.invalidate();
            let stopped = inner.state.current_track.take();

            inner.state.status = PlaybackStatus::Idle;
            inner.state.position = Duration::ZERO;
            inner.state.duration = Duration::ZERO;
            inner.state.last_error = None;
            inner.state.load_generation = inner.slot.generation();
            inner.play_intent = false;
            inner.volume_dirty = false;
            inner.duration_known = false;
            inner.commit();

            debug!(generation = inner.slot.generation(), "Playback stopped");
            self.emit(PlaybackEvent::Stopped {
                track_id: stopped.map(|t| t.id().to_string()),
            });
            handle
        };

        if let Some(handle) = handle {
            self.loader.release(handle).await;
        }
    }

    /// Seek within the current track, clamped to `[0, duration]`.
    ///
    /// Ignored unless `Ready`, `Playing` or `Paused`.
    pub async fn seek(&self, position: Duration) {
        let (handle, target) = {
            let mut inner = self.inner.lock();
            if inner.disposed || !inner.state.status.is_seekable() {
                return;
            }
            let Some(handle) = inner.slot.live() else {
                return;
            };

            let target = position.min(inner.state.duration);
            inner.state.position = target;
            inner.commit();
            (handle, target)
        };

        if let Err(source) = self.engine.seek(handle, target).await {
            self.command_failed("seek", handle, source).await;
        }
    }

    /// Set the session volume, clamped to `0.0..=1.0`. NaN is ignored.
    ///
    /// The value persists across loads. While buffering it is applied to the
    /// engine once buffering ends.
    pub async fn set_volume(&self, volume: f32) {
        if volume.is_nan() {
            debug!("Ignoring NaN volume");
            return;
        }
        let volume = volume.clamp(0.0, 1.0);

        let handle = {
            let mut inner = self.inner.lock();
            if inner.disposed {
                return;
            }
            inner.state.volume = volume;
            inner.commit();

            if inner.state.status.is_seekable() {
                inner.slot.live()
            } else {
                if inner.state.status == PlaybackStatus::Buffering {
                    inner.volume_dirty = true;
                }
                None
            }
        };

        if let Some(handle) = handle {
            self.push_volume(handle, volume).await;
        }
    }

    async fn push_volume(&self, handle: EngineHandle, volume: f32) {
        if let Err(source) = self.engine.set_volume(handle, volume).await {
            self.command_failed("set_volume", handle, source).await;
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Load the next playlist track, keeping play intent. No-op for playlists
    /// shorter than two tracks.
    pub async fn next(&self) {
        if let Some(ticket) = self.begin_next() {
            self.complete_load(ticket).await;
        }
    }

    pub async fn previous(&self) {
        if let Some(ticket) = self.begin_previous() {
            self.complete_load(ticket).await;
        }
    }

    /// Claim a load of the next track; see [`PlaybackController::begin_load`]
    /// for the ticket contract.
    #[must_use = "pass the ticket to `complete_load` or the previous handle stays open"]
    pub fn begin_next(&self) -> Option<LoadTicket> {
        self.begin_step(navigator::next)
    }

    #[must_use = "pass the ticket to `complete_load` or the previous handle stays open"]
    pub fn begin_previous(&self) -> Option<LoadTicket> {
        self.begin_step(navigator::previous)
    }

    fn begin_step(&self, navigate: Navigate) -> Option<LoadTicket> {
        let mut inner = self.inner.lock();
        if inner.disposed {
            return None;
        }

        let target = navigate(inner.state.current_track.as_ref(), &inner.playlist)?.clone();
        let autoplay = inner.wants_playback();
        Some(self.begin_load_locked(&mut inner, target, autoplay))
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    /// Apply one engine status event and run whatever engine work it
    /// leaves behind.
    ///
    /// Events addressing anything but the live handle are dropped.
    pub async fn handle_engine_status(&self, status: EngineStatus) {
        if let Some(work) = self.apply_engine_status(status) {
            work.run(self).await;
        }
    }

    /// Apply one engine status event to the state without awaiting.
    ///
    /// The returned work (closing a failed handle, pushing a deferred
    /// volume, opening the auto-advanced track) must be run afterwards.
    #[must_use = "run the follow-up or handles leak and auto-advance stalls"]
    pub fn apply_engine_status(&self, status: EngineStatus) -> Option<StatusFollowUp> {
        let mut inner = self.inner.lock();
        if inner.disposed {
            return None;
        }
        if !inner.slot.is_live(status.handle) {
            trace!(handle = %status.handle, "Dropping status event for stale handle");
            return None;
        }

        let follow_up = if let Some(message) = &status.error {
            self.fail_engine_locked(&mut inner, PlaybackError::Engine(message.clone()))
                .map(FollowUp::Release)
        } else if status.finished {
            self.on_finished_locked(&mut inner)
        } else {
            Self::reconcile_locked(&mut inner, &status)
        };
        follow_up.map(StatusFollowUp)
    }

    async fn run_follow_up(&self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Release(handle) => self.loader.release(handle).await,
            FollowUp::Load(ticket) => self.complete_load(ticket).await,
            FollowUp::Volume(handle, volume) => self.push_volume(handle, volume).await,
        }
    }

    fn reconcile_locked(inner: &mut Inner, status: &EngineStatus) -> Option<FollowUp> {
        if let Some(duration) = status.duration.filter(|d| !d.is_zero()) {
            inner.state.duration = duration;
            inner.duration_known = true;
        }
        if !inner.duration_known {
            // Length unknown: stretch it to the furthest position heard.
            inner.state.duration = inner.state.duration.max(status.position);
        }
        inner.state.position = status.position.min(inner.state.duration);

        let mut follow_up = None;
        match inner.state.status {
            PlaybackStatus::Playing | PlaybackStatus::Paused if status.is_buffering => {
                debug!(handle = %status.handle, "Buffering");
                inner.state.status = PlaybackStatus::Buffering;
            }
            PlaybackStatus::Buffering if !status.is_buffering => {
                inner.state.status = if inner.play_intent {
                    PlaybackStatus::Playing
                } else {
                    PlaybackStatus::Paused
                };
                debug!(status = %inner.state.status, "Buffering finished");

                if inner.volume_dirty {
                    inner.volume_dirty = false;
                    follow_up = Some(FollowUp::Volume(status.handle, inner.state.volume));
                }
            }
            _ => {}
        }

        inner.commit();
        follow_up
    }

    fn on_finished_locked(&self, inner: &mut Inner) -> Option<FollowUp> {
        if matches!(
            inner.state.status,
            PlaybackStatus::Idle
                | PlaybackStatus::Loading
                | PlaybackStatus::Stopped
                | PlaybackStatus::Error
        ) {
            return None;
        }
        let finished = inner.state.current_track.clone()?;
        let was_playing = inner.play_intent || inner.state.status == PlaybackStatus::Playing;

        inner.state.position = inner.state.duration;
        self.emit(PlaybackEvent::Completed {
            track_id: finished.id().to_string(),
        });

        let upcoming = if self.config.auto_advance {
            navigator::next(Some(&finished), &inner.playlist).cloned()
        } else {
            None
        };

        match upcoming {
            Some(track) => {
                info!(from = %finished.id(), to = %track.id(), "Auto-advancing");
                self.emit(PlaybackEvent::AutoAdvanced {
                    from_track_id: finished.id().to_string(),
                    to_track_id: track.id().to_string(),
                });
                Some(FollowUp::Load(self.begin_load_locked(
                    inner,
                    track,
                    was_playing,
                )))
            }
            None => {
                debug!(track_id = %finished.id(), "Reached end of playlist");
                inner.state.status = PlaybackStatus::Stopped;
                inner.play_intent = false;
                inner.commit();
                None
            }
        }
    }

    /// Move to `Error` and detach the live handle, which the caller closes.
    fn fail_engine_locked(&self, inner: &mut Inner, err: PlaybackError) -> Option<EngineHandle> {
        error!(error = %err, "Engine failure");

        let fault = PlaybackFault::from(&err);
        let handle = inner.slot.detach();
        inner.state.status = PlaybackStatus::Error;
        inner.state.last_error = Some(fault.clone());
        inner.play_intent = false;
        inner.volume_dirty = false;
        inner.commit();

        self.emit(PlaybackEvent::Error {
            track_id: inner.state.current_track_id().map(str::to_string),
            kind: fault.kind.to_string(),
            message: fault.message,
            recoverable: fault.kind.is_recoverable(),
        });
        handle
    }

    /// Classify an engine rejection for `handle`.
    ///
    /// Stale handles are ignored, transient rejections are logged and
    /// swallowed, anything else fails the session.
    async fn command_failed(&self, operation: &'static str, handle: EngineHandle, source: BridgeError) {
        let err = PlaybackError::Command { operation, source };

        let release = {
            let mut inner = self.inner.lock();
            if inner.disposed || !inner.slot.is_live(handle) {
                trace!(%handle, error = %err, "Ignoring failure for stale handle");
                return;
            }
            if err.is_transient() {
                warn!(operation, error = %err, "Transient engine rejection ignored");
                return;
            }
            self.fail_engine_locked(&mut inner, err)
        };

        if let Some(handle) = release {
            self.loader.release(handle).await;
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Tear the controller down.
    ///
    /// Publishes a final `Idle` snapshot, ends every snapshot subscription
    /// and closes the live handle. Later commands and late async results are
    /// ignored. Idempotent.
    pub async fn dispose(&self) {
        let handle = {
            let mut inner = self.inner.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;

            let handle = inner.slot.invalidate();
            let mut reset = PlaybackState::new(inner.state.volume);
            reset.load_generation = inner.slot.generation();
            inner.state = reset;
            inner.play_intent = false;
            inner.volume_dirty = false;
            inner.duration_known = false;
            inner.commit();
            inner.snapshots = None;
            handle
        };

        info!("Playback controller disposed");
        if let Some(handle) = handle {
            self.loader.release(handle).await;
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        self.events.emit(CoreEvent::Playback(event));
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PlaybackController")
            .field("status", &inner.state.status)
            .field("generation", &inner.slot.generation())
            .field("live_handle", &inner.slot.live())
            .field("disposed", &inner.disposed)
            .finish()
    }
}
