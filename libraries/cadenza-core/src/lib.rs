//! Cadenza Core
//!
//! Platform-agnostic types, unit conversion and engine boundary traits for
//! the Cadenza player.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `EffectParameters`, `EffectParam`, `TransportState`, `ProgressSample`
//! - **Engine Boundary**: `AudioEngine`, `EngineClock`, `EffectStage`, `SourceStage`
//! - **Unit Conversion**: gain ↔ dB, `m:ss` formatting, progress percentages
//! - **Error Handling**: `EngineError` and `EngineResult`
//!
//! With the `test-utils` feature, [`test_utils::MockEngine`] provides an
//! in-memory engine with a manually advanced clock.
//!
//! # Example
//!
//! ```rust
//! use cadenza_core::types::{EffectParam, EffectParameters};
//! use cadenza_core::units::{format_time, gain_to_db};
//!
//! let params = EffectParameters::default();
//! assert_eq!(params.get(EffectParam::Volume), 0.7);
//!
//! let volume: EffectParam = "volume".parse().unwrap();
//! assert_eq!(volume.clamp(1.5), Some(1.0));
//!
//! assert_eq!(gain_to_db(1.0), 0.0);
//! assert_eq!(format_time(125.0), "2:05");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod types;
pub mod units;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use engine::{
    AudioEngine, ClockState, ClockTime, DecodedTrack, Destination, EffectStage, EngineClock,
    MonotonicTime, SourceStage, SourceState, StageId, StageKind, StageOptions, StageParam,
    TimeSource,
};
pub use error::{EngineError, EngineResult};
pub use types::{EffectParam, EffectParameters, ProgressSample, TransportState, UnknownEffectParam};
