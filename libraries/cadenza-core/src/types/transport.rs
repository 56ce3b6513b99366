//! Transport and progress types

use crate::units::{calculate_progress, format_time, looped_elapsed};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Transport state of the single playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// No track attached
    #[default]
    Idle,

    /// Track attached, never started
    Loaded,

    /// Source running, clock running
    Playing,

    /// Clock suspended, source position retained
    Paused,

    /// Source halted, next play restarts from 0
    Stopped,
}

impl TransportState {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a track is started (playing or paused)
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of looped playback within the track
///
/// `elapsed` is always in `[0, duration)`, or zero when the duration is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Looped position within the track
    pub elapsed: Duration,

    /// Track duration
    pub duration: Duration,
}

impl ProgressSample {
    /// Sample at position zero
    pub fn zero(duration: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration,
        }
    }

    /// Build a sample from an unwrapped elapsed time, wrapping at `duration`
    pub fn looped(raw_elapsed: Duration, duration: Duration) -> Self {
        let wrapped = looped_elapsed(raw_elapsed.as_secs_f64(), duration.as_secs_f64());
        let mut elapsed = Duration::from_secs_f64(wrapped);
        // Guard float round-trip landing exactly on the duration
        if elapsed >= duration {
            elapsed = Duration::ZERO;
        }
        Self { elapsed, duration }
    }

    /// Progress through the track in percent (0-100)
    pub fn percent(&self) -> f64 {
        calculate_progress(self.elapsed.as_secs_f64(), self.duration.as_secs_f64())
    }

    /// `m:ss / m:ss` label
    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.elapsed.as_secs_f64()),
            format_time(self.duration.as_secs_f64())
        )
    }
}
