//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host (iOS, Android, desktop) must
//! implement for the playback core.
//!
//! ## Traits
//!
//! - [`AudioEngine`](playback::AudioEngine) - Native decode/playback primitive
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Engine implementation | Status |
//! |----------|-----------------------|--------|
//! | Desktop  | `bridge-desktop` (`rodio-engine`) | ✅ Available |
//! | iOS      | AVPlayer adapter      | 📋 Planned |
//! | Android  | ExoPlayer adapter     | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Engines should
//! pick the variant that matches the failure class: the controller treats
//! [`BridgeError::is_transient`] failures as swallowable and everything else
//! as an engine fault.
//!
//! ## Thread Safety
//!
//! Bridges are shared as `Arc<dyn Trait>` between the session façade and its
//! background tasks, so every trait requires `Send + Sync`.

pub mod error;
pub mod logging;
pub mod platform;
pub mod playback;
pub mod storage;

pub use error::BridgeError;

pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    AudioEngine, EngineEventReceiver, EngineHandle, EngineStatus, LoadedMedia, OpenOptions,
    DEFAULT_STATUS_INTERVAL,
};
pub use storage::SettingsStore;
