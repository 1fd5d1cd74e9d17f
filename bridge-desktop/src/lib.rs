//! # Desktop Bridge Implementations
//!
//! Bridge traits implemented for desktop platforms (macOS, Windows, Linux).
//!
//! - `RodioAudioEngine`: [`AudioEngine`](bridge_traits::AudioEngine) on the
//!   default output device using `rodio`, remote media fetched with `reqwest`
//! - [`JsonSettingsStore`]: [`SettingsStore`](bridge_traits::SettingsStore)
//!   persisted as a JSON file in the user's config directory
//! - [`MediaLocator`]: classification of track locators into local files and
//!   remote URLs
//!
//! ## Feature Flags
//!
//! - `rodio-engine`: the audio engine and its HTTP fetcher (needs an audio
//!   output device at runtime)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonSettingsStore, RodioAudioEngine};
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .audio_engine(Arc::new(RodioAudioEngine::new()?))
//!     .settings_store(Arc::new(JsonSettingsStore::new("settings.json")))
//!     .persist_favorites(true)
//!     .build()?;
//! ```

mod locator;
mod settings;

#[cfg(feature = "rodio-engine")]
mod engine;
#[cfg(feature = "rodio-engine")]
mod fetch;

pub use locator::MediaLocator;
pub use settings::JsonSettingsStore;

#[cfg(feature = "rodio-engine")]
pub use engine::RodioAudioEngine;
#[cfg(feature = "rodio-engine")]
pub use fetch::{MediaFetcher, RetryPolicy};
