//! Engine boundary error types for Cadenza

use thiserror::Error;

/// Result type alias using `EngineError`
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Failure reported by the audio engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine could not be unlocked (autoplay gate, device busy, ...)
    #[error("Engine unlock failed: {0}")]
    Unlock(String),

    /// Fetching or decoding a track failed
    #[error("Failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    /// A processing stage could not be created, connected or configured
    #[error("Stage error: {0}")]
    Stage(String),

    /// The source (player) stage rejected a command
    #[error("Source error: {0}")]
    Source(String),

    /// Suspending or resuming the shared clock failed
    #[error("Clock error: {0}")]
    Clock(String),

    /// The stage or source was already disposed
    #[error("Engine resource already disposed")]
    Disposed,
}

impl EngineError {
    /// Create a stage error
    pub fn stage(msg: impl Into<String>) -> Self {
        Self::Stage(msg.into())
    }

    /// Create a source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a clock error
    pub fn clock(msg: impl Into<String>) -> Self {
        Self::Clock(msg.into())
    }

    /// Create a decode error
    pub fn decode(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
