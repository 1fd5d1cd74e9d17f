//! # Event Bus System
//!
//! Domain events published by the playback core over `tokio::sync::broadcast`.
//!
//! Snapshots of `PlaybackState` describe *where* the player is; the events in
//! this module describe *what happened* (a track finished, the playlist was
//! replaced, a favorite was toggled). Hosts use them for analytics, toasts and
//! lock-screen integrations without diffing snapshots themselves.
//!
//! ```text
//! ┌──────────────────┐  emit   ┌──────────┐  subscribe  ┌────────────┐
//! │PlaybackController├────────>│          ├────────────>│ UI / host  │
//! └──────────────────┘         │ EventBus │             └────────────┘
//! ┌──────────────────┐  emit   │          │  subscribe  ┌────────────┐
//! │ PlaybackSession  ├────────>│          ├────────────>│ EventStream│
//! └──────────────────┘         └──────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Started {
//!     track_id: "t1".to_string(),
//! }));
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback started");
//! # }
//! ```
//!
//! A subscriber that falls behind gets `RecvError::Lagged(n)` once and then
//! continues with the oldest event still buffered.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Playlist(PlaylistEvent),
    Favorites(FavoritesEvent),
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Playlist(e) => e.description(),
            CoreEvent::Favorites(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error {
                recoverable: false, ..
            }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::TrackReady { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. })
            | CoreEvent::Playback(PlaybackEvent::AutoAdvanced { .. })
            | CoreEvent::Playlist(PlaylistEvent::Replaced { .. })
            | CoreEvent::Library(LibraryEvent::Created { .. })
            | CoreEvent::Library(LibraryEvent::Deleted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Transport and load lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A load request was accepted and the engine is opening the media.
    TrackLoading {
        track_id: String,
        /// Load generation assigned to the request.
        generation: u64,
    },
    /// The engine opened the media and it is ready to play.
    TrackReady {
        track_id: String,
        /// Effective duration (milliseconds).
        duration_ms: u64,
    },
    Started {
        track_id: String,
    },
    Paused {
        track_id: String,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    /// Playback was stopped and the engine handle released.
    Stopped {
        /// Track that was loaded when stop was requested, if any.
        track_id: Option<String>,
    },
    /// Track reached its end naturally.
    Completed {
        track_id: String,
    },
    /// A finished track was followed by the next playlist entry.
    AutoAdvanced {
        from_track_id: String,
        to_track_id: String,
    },
    Error {
        track_id: Option<String>,
        /// Fault classification (`LoadFailure`, `EngineFailure`, ...).
        kind: String,
        message: String,
        /// Whether retrying the command may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::TrackLoading { .. } => "Track loading",
            PlaybackEvent::TrackReady { .. } => "Track ready",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::AutoAdvanced { .. } => "Advanced to next track",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Playlist & Favorites Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaylistEvent {
    /// The active playlist was replaced wholesale.
    Replaced {
        track_count: usize,
        /// Search query that produced the playlist, when it came from search.
        query: Option<String>,
    },
}

impl PlaylistEvent {
    fn description(&self) -> &str {
        match self {
            PlaylistEvent::Replaced { .. } => "Playlist replaced",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FavoritesEvent {
    Toggled {
        track_id: String,
        /// Membership after the toggle.
        favorite: bool,
    },
}

impl FavoritesEvent {
    fn description(&self) -> &str {
        match self {
            FavoritesEvent::Toggled { favorite: true, .. } => "Track added to favorites",
            FavoritesEvent::Toggled { favorite: false, .. } => "Track removed from favorites",
        }
    }
}

/// Changes to the user's saved playlists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    Created {
        playlist_id: String,
        name: String,
    },
    Deleted {
        playlist_id: String,
    },
    TrackAdded {
        playlist_id: String,
        track_id: String,
    },
    TrackRemoved {
        playlist_id: String,
        track_id: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::Created { .. } => "Playlist created",
            LibraryEvent::Deleted { .. } => "Playlist deleted",
            LibraryEvent::TrackAdded { .. } => "Track added to playlist",
            LibraryEvent::TrackRemoved { .. } => "Track removed from playlist",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Fan-out of [`CoreEvent`]s to every current subscriber.
///
/// Clones share one channel. Subscribers only see events emitted after they
/// subscribed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` events are buffered per subscriber before it starts lagging.
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Publish `event` and return how many subscribers it reached.
    ///
    /// Publishing with nobody subscribed is not an error and returns 0.
    pub fn emit(&self, event: CoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// A fresh subscription wrapped in an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus({} subscribers)", self.subscriber_count())
    }
}

// ============================================================================
// Event Stream
// ============================================================================

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Subscription that skips events not matching its predicates.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity};
///
/// let bus = EventBus::default();
/// let warnings = bus
///     .stream()
///     .filter(|e| matches!(e, CoreEvent::Playback(_)))
///     .min_severity(EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicates: Vec<Predicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicates: Vec::new(),
        }
    }

    /// Keep only events for which `predicate` holds. Filters stack.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Keep only events at or above `severity`.
    pub fn min_severity(self, severity: EventSeverity) -> Self {
        self.filter(move |event| event.severity() >= severity)
    }

    fn wants(&self, event: &CoreEvent) -> bool {
        self.predicates.iter().all(|keep| keep(event))
    }

    /// Next matching event.
    ///
    /// `RecvError::Lagged(n)` reports `n` events lost to a full buffer;
    /// `RecvError::Closed` means every bus handle was dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already queued, `None` if there is none.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.wants(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
