//! # Core Playback
//!
//! Playback session controller for the media client.
//!
//! - [`PlaybackController`]: the state machine owning the one live engine handle
//! - [`loader`]: single-flight load coordination via generation counting
//! - [`navigator`]: next/previous resolution with wraparound
//! - [`model`]: `Track`, `Playlist` and the published `PlaybackState`
//!
//! Audio decoding lives behind `bridge_traits::AudioEngine`; this crate never
//! touches samples.

pub mod config;
pub mod controller;
pub mod error;
pub mod loader;
pub mod model;
pub mod navigator;
mod time_format;

pub use config::PlaybackConfig;
pub use controller::{PlaybackController, SnapshotReceiver, StatusFollowUp};
pub use error::{FaultKind, PlaybackError, PlaybackFault, Result};
pub use model::{PlaybackState, PlaybackStatus, Playlist, Track};
pub use time_format::format_clock;
