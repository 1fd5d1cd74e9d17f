//! Audio engine bridge trait and supporting types.
//!
//! The core playback controller never decodes audio itself. Host platforms
//! provide an [`AudioEngine`] that wraps their native decode/playback primitive
//! (AVPlayer, ExoPlayer, rodio, ...). Each successful [`AudioEngine::open`]
//! yields an opaque [`EngineHandle`]; transport calls address that handle and
//! status updates flow back asynchronously over a broadcast channel.
//!
//! Status events are tagged with the handle that produced them. Engines are
//! allowed to emit events for a handle after `close` was requested, so
//! consumers must compare the handle against the one they consider live.

use crate::{error::Result, platform::PlatformSendSync};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default interval at which engines are expected to emit status updates.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_millis(100);

/// Identifier of one loaded, playable media instance inside an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(Uuid);

impl EngineHandle {
    /// Generate a new handle identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct a handle from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options applied when a media instance is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenOptions {
    /// Volume the instance starts with (0.0 = muted, 1.0 = unity gain).
    pub initial_volume: f32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            initial_volume: 1.0,
        }
    }
}

/// Result of a successful [`AudioEngine::open`].
///
/// Engines start the instance paused at position zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedMedia {
    /// Handle addressing the new instance.
    pub handle: EngineHandle,
    /// Duration reported by the decoder, when known up front.
    pub duration: Option<Duration>,
}

impl LoadedMedia {
    pub fn new(handle: EngineHandle, duration: Option<Duration>) -> Self {
        Self { handle, duration }
    }
}

/// Snapshot of one media instance as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    /// Instance the status belongs to.
    pub handle: EngineHandle,
    /// Whether the media is loaded and addressable.
    pub loaded: bool,
    /// Current playback position.
    pub position: Duration,
    /// Total duration, if the engine knows it.
    pub duration: Option<Duration>,
    /// Whether audio is currently being rendered.
    pub is_playing: bool,
    /// Whether playback is stalled waiting for data.
    pub is_buffering: bool,
    /// Set once playback reached the end of the media.
    pub finished: bool,
    /// Unrecoverable engine fault for this instance.
    pub error: Option<String>,
}

impl EngineStatus {
    /// A loaded, idle status at position zero.
    pub fn loaded(handle: EngineHandle) -> Self {
        Self {
            handle,
            loaded: true,
            position: Duration::ZERO,
            duration: None,
            is_playing: false,
            is_buffering: false,
            finished: false,
            error: None,
        }
    }

    pub fn with_position(mut self, position: Duration) -> Self {
        self.position = position;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn playing(mut self, is_playing: bool) -> Self {
        self.is_playing = is_playing;
        self
    }

    pub fn buffering(mut self, is_buffering: bool) -> Self {
        self.is_buffering = is_buffering;
        self
    }

    pub fn finished(mut self) -> Self {
        self.finished = true;
        self.is_playing = false;
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// Receiving end of an engine's status channel.
pub type EngineEventReceiver = broadcast::Receiver<EngineStatus>;

/// Platform audio engine driven by the playback controller.
///
/// Every call may suspend while the native engine does work on its own
/// threads. Implementations must tolerate calls addressing handles that were
/// already closed and report them as [`BridgeError::InvalidHandle`].
///
/// [`BridgeError::InvalidHandle`]: crate::error::BridgeError::InvalidHandle
#[async_trait::async_trait]
pub trait AudioEngine: PlatformSendSync {
    /// Create a media instance for `url`. The instance starts paused.
    async fn open(&self, url: &str, options: OpenOptions) -> Result<LoadedMedia>;

    /// Release the instance and every native resource attached to it.
    async fn close(&self, handle: EngineHandle) -> Result<()>;

    /// Start or resume rendering.
    async fn play(&self, handle: EngineHandle) -> Result<()>;

    /// Pause rendering without releasing the instance.
    async fn pause(&self, handle: EngineHandle) -> Result<()>;

    /// Seek to an absolute position.
    async fn seek(&self, handle: EngineHandle, position: Duration) -> Result<()>;

    /// Set the instance volume, normalized to `0.0..=1.0`.
    async fn set_volume(&self, handle: EngineHandle, volume: f32) -> Result<()>;

    /// Subscribe to status events for every instance owned by this engine.
    fn subscribe(&self) -> EngineEventReceiver;
}
