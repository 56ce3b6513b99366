//! Error types for playback management

use cadenza_core::{EngineError, UnknownEffectParam};
use thiserror::Error;

/// Playback errors
///
/// Every variant is recoverable: the player stays in its last valid state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    /// Engine unlock or effect chain construction failed; retry `initialize`
    #[error("Audio initialization failed: {0}")]
    InitializationFailed(String),

    /// `initialize` has not completed yet
    #[error("Audio engine not initialized")]
    NotInitialized,

    /// Fetching or decoding the track failed; retry the load
    #[error("Failed to load {url}: {source}")]
    LoadFailed {
        url: String,
        #[source]
        source: EngineError,
    },

    /// Transport action without a loaded track
    #[error("No audio loaded")]
    NoAudioLoaded,

    /// Unknown effect name or out-of-domain value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Engine failure during start/stop/suspend/resume or a stage write
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<UnknownEffectParam> for PlayerError {
    fn from(err: UnknownEffectParam) -> Self {
        Self::InvalidParameter(err.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;
