use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Session initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Invalid search query: {0:?}")]
    InvalidQuery(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Invalid playlist name: {0:?}")]
    InvalidName(String),

    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session has been disposed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, ServiceError>;
