//! # Core Configuration Module
//!
//! Builder-based configuration for the playback core.
//!
//! ## Overview
//!
//! [`CoreConfig`] holds the bridge implementations the core needs plus a few
//! runtime settings. The builder validates everything up front so a host
//! that forgot to inject a capability fails at startup with an actionable
//! message instead of at the first transport command.
//!
//! ## Required Dependencies
//!
//! - `AudioEngine` - the platform decode/playback primitive
//!
//! ## Optional Dependencies
//!
//! - `SettingsStore` - required only when favorites persistence is enabled
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .audio_engine(Arc::new(MyEngine::new()))
//!     .settings_store(Arc::new(MySettings::default()))
//!     .persist_favorites(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Fails: no AudioEngine was injected
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing audio engine");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioEngine, SettingsStore};
use std::sync::Arc;

/// Largest accepted channel capacity for events and snapshots.
const MAX_BUFFER_SIZE: usize = 16_384;

/// Core configuration for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Platform audio engine (required)
    pub audio_engine: Arc<dyn AudioEngine>,

    /// Key-value preferences storage (optional)
    pub settings_store: Option<Arc<dyn SettingsStore>>,

    /// Capacity of the domain event bus
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("audio_engine", &"AudioEngine { ... }")
            .field(
                "settings_store",
                &self
                    .settings_store
                    .as_ref()
                    .map(|_| "SettingsStore { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Optional functionality toggled at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Persist favorites through the injected `SettingsStore`
    pub persist_favorites: bool,
    /// Persist user playlists through the injected `SettingsStore`
    pub persist_playlists: bool,
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// Checks buffer sizes and that enabled features have the bridges they
    /// depend on.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_BUFFER_SIZE
            )));
        }

        if self.features.persist_favorites && self.settings_store.is_none() {
            return Err(Error::missing(
                "SettingsStore",
                "Favorites persistence enabled but no SettingsStore provided. \
                 Disable the feature or inject a platform settings store \
                 (UserDefaults/DataStore).",
            ));
        }

        if self.features.persist_playlists && self.settings_store.is_none() {
            return Err(Error::missing(
                "SettingsStore",
                "Playlist persistence enabled but no SettingsStore provided.",
            ));
        }

        Ok(())
    }
}

fn audio_engine_missing_error() -> Error {
    Error::missing(
        "AudioEngine",
        "An AudioEngine implementation is required for playback. \
         Desktop: enable the 'rodio-engine' feature of bridge-desktop. \
         Mobile: inject the platform-native player adapter (AVPlayer/ExoPlayer).",
    )
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    audio_engine: Option<Arc<dyn AudioEngine>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the audio engine (required).
    pub fn audio_engine(mut self, engine: Arc<dyn AudioEngine>) -> Self {
        self.audio_engine = Some(engine);
        self
    }

    /// Sets the settings store used for persistence.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the domain event bus capacity.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`].
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables favorites persistence (requires a `SettingsStore`).
    pub fn persist_favorites(mut self, enabled: bool) -> Self {
        self.features.persist_favorites = enabled;
        self
    }

    /// Enables or disables user playlist persistence (requires a `SettingsStore`).
    pub fn persist_playlists(mut self, enabled: bool) -> Self {
        self.features.persist_playlists = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig`.
    ///
    /// Returns an error if the audio engine is missing, a buffer size is out
    /// of range, or a feature lacks its bridge.
    pub fn build(self) -> Result<CoreConfig> {
        let audio_engine = self.audio_engine.ok_or_else(audio_engine_missing_error)?;

        let config = CoreConfig {
            audio_engine,
            settings_store: self.settings_store,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
