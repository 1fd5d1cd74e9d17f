//! Workspace umbrella crate.
//!
//! Hosts depend on this crate and pick features instead of wiring each
//! workspace member by hand:
//!
//! - `session` (default): [`PlaybackSession`] plus the playback model types
//! - `desktop-audio`: adds the rodio-backed desktop engine

#[cfg(feature = "session")]
pub use core_playback::{
    format_clock, FaultKind, PlaybackConfig, PlaybackFault, PlaybackState, PlaybackStatus,
    Playlist, Track,
};
#[cfg(feature = "session")]
pub use core_service::{PlaybackSession, ServiceError, UserPlaylist};

#[cfg(feature = "desktop-audio")]
pub use bridge_desktop::RodioAudioEngine;
