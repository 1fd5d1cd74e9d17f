//! Playback domain model: tracks, playlists and the published state snapshot.

use crate::error::PlaybackFault;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// A playable track.
///
/// Immutable once built. `duration` is the catalogue's expectation and is only
/// used until the engine reports the authoritative value.
///
/// Serialized with `duration` as whole seconds, matching catalogue payloads:
///
/// ```
/// use core_playback::Track;
///
/// let json = r#"{"id":"3135556","title":"Harder, Better, Faster, Stronger",
///     "artist":"Daft Punk","url":"https://cdn.example/preview.mp3","duration":224}"#;
/// let track: Track = serde_json::from_str(json).unwrap();
/// assert_eq!(track.duration().as_secs(), 224);
/// assert!(track.artwork().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    id: String,
    title: String,
    artist: String,
    url: String,
    #[serde(
        default,
        serialize_with = "serialize_secs",
        deserialize_with = "deserialize_secs"
    )]
    duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artwork: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            url: url.into(),
            duration: Duration::ZERO,
            artwork: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    /// Opaque media locator, resolved by the audio engine.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn artwork(&self) -> Option<&str> {
        self.artwork.as_deref()
    }

    /// Identity used for navigation: two tracks are "the same" when ids match.
    pub fn same_as(&self, other: &Track) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_secs())
}

fn deserialize_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// Ordered, immutable track list. Cloning is cheap.
///
/// Insertion order is play order. Duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    tracks: Arc<[Track]>,
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: tracks.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Index of the first track sharing `track`'s id.
    pub fn index_of(&self, track: &Track) -> Option<usize> {
        self.tracks.iter().position(|t| t.same_as(track))
    }
}

impl Deref for Playlist {
    type Target = [Track];

    fn deref(&self) -> &[Track] {
        &self.tracks
    }
}

impl From<Vec<Track>> for Playlist {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

impl FromIterator<Track> for Playlist {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self {
            tracks: iter.into_iter().collect(),
        }
    }
}

/// Lifecycle status of the playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Buffering,
    /// Reached the end of the last track (or auto-advance is off).
    Stopped,
    Error,
}

impl PlaybackStatus {
    /// Statuses in which the engine accepts seek and volume commands.
    pub fn is_seekable(&self) -> bool {
        matches!(
            self,
            PlaybackStatus::Ready | PlaybackStatus::Playing | PlaybackStatus::Paused
        )
    }

    /// Statuses that require a live engine handle.
    pub fn requires_handle(&self) -> bool {
        matches!(
            self,
            PlaybackStatus::Ready
                | PlaybackStatus::Playing
                | PlaybackStatus::Paused
                | PlaybackStatus::Buffering
                | PlaybackStatus::Stopped
        )
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Immutable snapshot published to observers on every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub current_track: Option<Track>,
    pub position: Duration,
    pub duration: Duration,
    /// Session volume, `0.0..=1.0`. Survives track loads.
    pub volume: f32,
    /// Last surfaced failure; cleared by the next successful transition.
    pub last_error: Option<PlaybackFault>,
    /// Generation of the most recent load request.
    pub load_generation: u64,
}

impl PlaybackState {
    pub fn new(volume: f32) -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current_track: None,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            volume,
            last_error: None,
            load_generation: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(Track::id)
    }

    /// Fraction of the track played, `0.0..=1.0`. Zero while duration is unknown.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (self.position.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(1.0)
    }
}
