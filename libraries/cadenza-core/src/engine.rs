//! Audio engine boundary
//!
//! The core never decodes or processes audio itself. It configures and drives
//! an engine through these traits: a shared suspendable clock, a fixed set of
//! effect stages, and one source (player) stage per loaded track.

use crate::error::EngineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait TimeSource: Send + Sync {
    /// Time elapsed since an arbitrary, fixed origin
    fn now(&self) -> Duration;
}

/// Wall-clock time source backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    /// Create a time source whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// State of the shared engine clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    /// Processing audio
    Running,
    /// Halted, positions retained
    Suspended,
}

/// Shared engine clock
///
/// Suspending the clock halts all audio processing without discarding source
/// positions; resuming continues from where it left off.
#[async_trait]
pub trait EngineClock: TimeSource {
    /// Current clock state
    fn state(&self) -> ClockState;

    /// Suspend processing
    async fn suspend(&self) -> EngineResult<()>;

    /// Resume processing
    async fn resume(&self) -> EngineResult<()>;
}

/// Adapts an engine clock handle into a plain [`TimeSource`]
#[derive(Clone)]
pub struct ClockTime(pub Arc<dyn EngineClock>);

impl TimeSource for ClockTime {
    fn now(&self) -> Duration {
        self.0.now()
    }
}

/// Identifier of a stage within the engine graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId(pub u64);

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

/// Connection target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Another stage's input
    Stage(StageId),

    /// The engine's output device
    Output,
}

/// Kind of downstream processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Output level
    Volume,
    /// Pitch shift without tempo change
    PitchShift,
    /// Three-band equalizer
    Equalizer,
    /// Reverb with wet/dry mix
    Reverb,
}

/// Engine-side parameter of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageParam {
    /// Volume stage level in dB
    VolumeDb,
    /// Pitch shift in semitones
    Pitch,
    /// EQ low band gain in dB
    Low,
    /// EQ mid band gain in dB
    Mid,
    /// EQ high band gain in dB
    High,
    /// Reverb wet mix (0-1)
    Wet,
}

impl StageParam {
    /// Stage kind that owns this parameter
    pub fn kind(self) -> StageKind {
        match self {
            Self::VolumeDb => StageKind::Volume,
            Self::Pitch => StageKind::PitchShift,
            Self::Low | Self::Mid | Self::High => StageKind::Equalizer,
            Self::Wet => StageKind::Reverb,
        }
    }
}

/// Construction options for stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageOptions {
    /// Reverb decay time in seconds
    pub reverb_decay_secs: f64,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            reverb_decay_secs: 0.5,
        }
    }
}

/// A downstream processing stage (volume, pitch shift, EQ, reverb)
pub trait EffectStage: Send {
    /// Identifier used for connections
    fn id(&self) -> StageId;

    /// Stage kind
    fn kind(&self) -> StageKind;

    /// Write an engine parameter
    fn set_param(&mut self, param: StageParam, value: f64) -> EngineResult<()>;

    /// Read an engine parameter
    fn param(&self, param: StageParam) -> EngineResult<f64>;

    /// Release engine resources. Further calls fail with `Disposed`.
    fn dispose(&mut self);
}

/// Source (player) stage state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceState {
    /// Producing audio
    Started,
    /// Halted; the next start begins at zero
    Stopped,
}

/// The player stage for one decoded track
///
/// A stopped source cannot continue from its previous position; `start`
/// always begins at offset zero.
pub trait SourceStage: Send {
    /// Identifier used for connections
    fn id(&self) -> StageId;

    /// Duration of the underlying buffer
    fn duration(&self) -> Duration;

    /// Current state
    fn state(&self) -> SourceState;

    /// Start playback from offset zero
    fn start(&mut self) -> EngineResult<()>;

    /// Halt playback
    fn stop(&mut self) -> EngineResult<()>;

    /// Set the playback-rate multiplier
    fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()>;

    /// Current playback-rate multiplier
    fn playback_rate(&self) -> f64;

    /// Release engine resources. Further calls fail with `Disposed`.
    fn dispose(&mut self);
}

/// Decoded audio track
#[derive(Debug, Clone)]
pub struct DecodedTrack {
    /// Where the track was loaded from
    pub url: String,

    /// Total duration
    pub duration: Duration,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,

    /// Interleaved samples
    pub samples: Arc<[f32]>,
}

/// Audio processing backend
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Unlock audio output. Must complete before anything is audible.
    async fn unlock(&self) -> EngineResult<()>;

    /// Handle to the shared clock
    fn clock(&self) -> Arc<dyn EngineClock>;

    /// Fetch and decode a track
    async fn decode(&self, url: &str) -> EngineResult<DecodedTrack>;

    /// Create a downstream stage
    fn create_stage(
        &self,
        kind: StageKind,
        options: &StageOptions,
    ) -> EngineResult<Box<dyn EffectStage>>;

    /// Create a source stage for a decoded track
    fn create_source(
        &self,
        track: &DecodedTrack,
        looping: bool,
    ) -> EngineResult<Box<dyn SourceStage>>;

    /// Route the output of `from` into `to`
    fn connect(&self, from: StageId, to: Destination) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_params_map_to_owning_stage() {
        assert_eq!(StageParam::VolumeDb.kind(), StageKind::Volume);
        assert_eq!(StageParam::Pitch.kind(), StageKind::PitchShift);
        assert_eq!(StageParam::Mid.kind(), StageKind::Equalizer);
        assert_eq!(StageParam::Wet.kind(), StageKind::Reverb);
    }

    #[test]
    fn monotonic_time_never_goes_backwards() {
        let time = MonotonicTime::new();
        let first = time.now();
        let second = time.now();
        assert!(second >= first);
    }

    #[test]
    fn default_reverb_decay() {
        assert_eq!(StageOptions::default().reverb_decay_secs, 0.5);
    }
}
