//! Cadenza - Playback
//!
//! Single-track playback with a fixed real-time effect chain.
//!
//! This crate provides:
//! - Effect chain (volume, pitch shift, 3-band EQ, reverb) with clamped parameters
//! - Transport state machine (play, suspend-based pause, resume, stop)
//! - Looped progress sampling on a configurable interval
//! - Configuration from `cadenza.toml` and `CADENZA_*` environment variables
//!
//! # Architecture
//!
//! `cadenza-playback` never touches audio hardware. It drives an
//! [`AudioEngine`](cadenza_core::AudioEngine) implementation supplied by the
//! platform and keeps all state in plain Rust types:
//!
//! ```text
//! source -> volume -> pitch -> EQ -> reverb -> output
//! ```
//!
//! The [`PlaybackController`] emits [`PlaybackEvent`]s to subscribed
//! [`PlaybackObserver`]s; the [`ProgressClock`] is one such observer.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadenza_core::AudioEngine;
//! use cadenza_playback::{Player, PlayerConfig, Result};
//! use std::sync::Arc;
//!
//! async fn run(engine: Arc<dyn AudioEngine>) -> Result<()> {
//!     let mut player = Player::new(engine, PlayerConfig::load()?)?;
//!
//!     // Must follow a user gesture on platforms that gate audio output
//!     player.initialize().await?;
//!     player.load_demo_track().await?;
//!
//!     player.set_effect("reverb", 0.3)?;
//!     player.toggle_playback().await?;
//!
//!     let mut progress = player.subscribe_progress();
//!     progress.changed().await.ok();
//!     println!("{}", progress.borrow().label());
//!
//!     player.teardown().await
//! }
//! ```

pub mod chain;
pub mod config;
pub mod controller;
mod error;
pub mod events;
pub mod player;
pub mod progress;
pub mod session;
mod timeline;

// Public exports
pub use chain::EffectChain;
pub use config::{EffectSettings, PlaybackSettings, PlayerConfig, ProgressSettings};
pub use controller::PlaybackController;
pub use error::{PlayerError, Result};
pub use events::{PlaybackEvent, PlaybackObserver};
pub use player::{Player, PlayerSnapshot};
pub use progress::ProgressClock;
pub use session::{PlaybackSession, SessionSlot};
pub use timeline::Timeline;
