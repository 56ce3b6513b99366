//! Test utilities for playback testing
//!
//! Provides an in-memory engine with a manually driven clock so transport
//! and progress behavior can be verified without audio hardware.

mod mock_engine;

pub use mock_engine::{ManualClock, MockEngine, MockFailure};
