//! Playback Events
//!
//! Transport transitions are announced to observers as they happen and are
//! also queued for callers that prefer polling (`drain_events`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Events emitted by the playback controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Source started from position zero
    PlayStarted {
        /// Duration of the started track
        duration: Duration,
    },

    /// Engine clock suspended, position retained
    Paused,

    /// Engine clock resumed after a pause
    Resumed,

    /// Source halted, position reset to zero
    Stopped,
}

/// Receives transport events
///
/// Called synchronously from inside the transition, after the transport state
/// has been updated and before the transition returns.
pub trait PlaybackObserver: Send + Sync {
    fn on_event(&self, event: &PlaybackEvent);
}
