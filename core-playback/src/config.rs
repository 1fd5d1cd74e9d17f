//! # Playback Configuration
//!
//! Session-level knobs for the playback controller. Every field has a serde
//! default, so hosts can ship a partial JSON document (or none at all).

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Volume the session starts with, `0.0..=1.0`.
    ///
    /// Default: 1.0.
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Start playing as soon as `load_track` completes.
    ///
    /// `play_track`, `next` and `previous` decide on their own; this only
    /// affects plain loads. Default: false.
    #[serde(default)]
    pub autoplay_on_load: bool,

    /// Load the next playlist entry when a track finishes.
    ///
    /// Default: true.
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,

    /// Capacity of the snapshot broadcast channel. Slow observers that fall
    /// further behind are told how many snapshots they missed.
    ///
    /// Default: 64.
    #[serde(default = "default_snapshot_buffer")]
    pub snapshot_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            autoplay_on_load: false,
            auto_advance: default_auto_advance(),
            snapshot_buffer: default_snapshot_buffer(),
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlaybackError::InvalidConfig(format!(
                "initial_volume must be within 0.0..=1.0, got {}",
                self.initial_volume
            )));
        }

        if self.snapshot_buffer == 0 {
            return Err(PlaybackError::InvalidConfig(
                "snapshot_buffer must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_initial_volume() -> f32 {
    1.0
}

fn default_auto_advance() -> bool {
    true
}

fn default_snapshot_buffer() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlaybackConfig::default();
        assert_eq!(config.initial_volume, 1.0);
        assert!(!config.autoplay_on_load);
        assert!(config.auto_advance);
        assert_eq!(config.snapshot_buffer, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PlaybackConfig =
            serde_json::from_str(r#"{"initial_volume":0.4,"auto_advance":false}"#).unwrap();
        assert_eq!(config.initial_volume, 0.4);
        assert!(!config.auto_advance);
        assert_eq!(config.snapshot_buffer, 64);

        let empty: PlaybackConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, PlaybackConfig::default());
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let loud = PlaybackConfig {
            initial_volume: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            loud.validate(),
            Err(PlaybackError::InvalidConfig(_))
        ));

        let nan = PlaybackConfig {
            initial_volume: f32::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());

        let unbuffered = PlaybackConfig {
            snapshot_buffer: 0,
            ..Default::default()
        };
        assert!(unbuffered.validate().is_err());
    }
}
