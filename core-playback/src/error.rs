//! # Playback Error Types
//!
//! [`PlaybackError`] is what internal operations return. Transport commands
//! never hand it to callers: the controller folds it into a [`PlaybackFault`]
//! stored in the published state.

use bridge_traits::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced while loading or driving a track.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Load Errors
    // ========================================================================
    /// The engine could not open the track's media.
    #[error("Failed to load track {track_id}: {source}")]
    LoadFailed {
        track_id: String,
        #[source]
        source: BridgeError,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// A transport command was issued with no media loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// The engine rejected a transport command.
    #[error("Engine rejected {operation}: {source}")]
    Command {
        operation: &'static str,
        #[source]
        source: BridgeError,
    },

    /// The engine reported a fault for the live instance.
    #[error("Engine failure: {0}")]
    Engine(String),

    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),
}

impl PlaybackError {
    /// Returns `true` if the error is transient and retrying may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Command { source, .. } => source.is_transient(),
            PlaybackError::LoadFailed { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Fault classification used when the error is surfaced in state.
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            PlaybackError::LoadFailed { .. } => FaultKind::LoadFailure,
            PlaybackError::NoTrackLoaded => FaultKind::NoTrackLoaded,
            PlaybackError::Command { .. } if self.is_transient() => {
                FaultKind::TransientCommandFailure
            }
            _ => FaultKind::EngineFailure,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Classification of a failure surfaced through `PlaybackState::last_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    /// Bad or unreachable locator, or media the engine cannot decode.
    LoadFailure,
    /// Command rejected while the engine was transitioning.
    TransientCommandFailure,
    /// Unexpected fault inside the engine.
    EngineFailure,
    /// Command needs loaded media but there is none.
    NoTrackLoaded,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::LoadFailure => "LoadFailure",
            FaultKind::TransientCommandFailure => "TransientCommandFailure",
            FaultKind::EngineFailure => "EngineFailure",
            FaultKind::NoTrackLoaded => "NoTrackLoaded",
        }
    }

    /// Whether the user can reasonably retry (e.g. reload the same track).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FaultKind::EngineFailure)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloneable error descriptor published in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFault {
    pub kind: FaultKind,
    pub message: String,
}

impl PlaybackFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&PlaybackError> for PlaybackFault {
    fn from(err: &PlaybackError) -> Self {
        Self::new(err.fault_kind(), err.to_string())
    }
}

impl fmt::Display for PlaybackFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kind_mapping() {
        let load = PlaybackError::LoadFailed {
            track_id: "x".to_string(),
            source: BridgeError::SourceUnavailable("404".to_string()),
        };
        assert_eq!(load.fault_kind(), FaultKind::LoadFailure);

        let busy = PlaybackError::Command {
            operation: "play",
            source: BridgeError::Busy("transitioning".to_string()),
        };
        assert!(busy.is_transient());
        assert_eq!(busy.fault_kind(), FaultKind::TransientCommandFailure);

        let invalid = PlaybackError::Command {
            operation: "play",
            source: BridgeError::InvalidHandle("gone".to_string()),
        };
        assert!(!invalid.is_transient());
        assert_eq!(invalid.fault_kind(), FaultKind::EngineFailure);

        assert_eq!(
            PlaybackError::NoTrackLoaded.fault_kind(),
            FaultKind::NoTrackLoaded
        );
    }

    #[test]
    fn test_fault_from_error_keeps_message() {
        let err = PlaybackError::Engine("decoder crashed".to_string());
        let fault = PlaybackFault::from(&err);
        assert_eq!(fault.kind, FaultKind::EngineFailure);
        assert!(fault.message.contains("decoder crashed"));
        assert!(!fault.kind.is_recoverable());
        assert_eq!(fault.to_string(), "EngineFailure: Engine failure: decoder crashed");
    }
}
