//! Player configuration

use crate::error::{PlayerError, Result};
use cadenza_core::StageOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slowest sampling rate that still looks smooth
const MAX_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_progress")]
    pub progress: ProgressSettings,

    #[serde(default = "default_playback")]
    pub playback: PlaybackSettings,

    #[serde(default = "default_effects")]
    pub effects: EffectSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProgressSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_looping")]
    pub looping: bool,

    #[serde(default = "default_demo_track_url")]
    pub demo_track_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EffectSettings {
    #[serde(default = "default_reverb_decay_secs")]
    pub reverb_decay_secs: f64,
}

impl PlayerConfig {
    /// Load configuration from `cadenza.toml` (if present) and environment
    pub fn load() -> Result<Self> {
        Self::load_from(PathBuf::from("cadenza.toml"))
    }

    /// Load configuration from `path` (if present) and environment
    ///
    /// Environment variables prefixed with `CADENZA_` override file values,
    /// e.g. `CADENZA_PROGRESS__POLL_INTERVAL_MS=50`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let path = path.as_ref();
        if path.exists() {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENZA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| PlayerError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlayerError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let interval = self.progress.poll_interval_ms;
        if interval == 0 || interval > MAX_POLL_INTERVAL_MS {
            return Err(PlayerError::Config(format!(
                "progress.poll_interval_ms must be in 1..={}, got {}",
                MAX_POLL_INTERVAL_MS, interval
            )));
        }

        let decay = self.effects.reverb_decay_secs;
        if !decay.is_finite() || decay <= 0.0 {
            return Err(PlayerError::Config(format!(
                "effects.reverb_decay_secs must be positive, got {}",
                decay
            )));
        }

        if self.playback.demo_track_url.trim().is_empty() {
            return Err(PlayerError::Config(
                "playback.demo_track_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Progress sampling interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.progress.poll_interval_ms)
    }

    /// Stage construction options
    pub fn stage_options(&self) -> StageOptions {
        StageOptions {
            reverb_decay_secs: self.effects.reverb_decay_secs,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            progress: default_progress(),
            playback: default_playback(),
            effects: default_effects(),
        }
    }
}

// Default values
fn default_progress() -> ProgressSettings {
    ProgressSettings {
        poll_interval_ms: default_poll_interval_ms(),
    }
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_playback() -> PlaybackSettings {
    PlaybackSettings {
        looping: default_looping(),
        demo_track_url: default_demo_track_url(),
    }
}

fn default_looping() -> bool {
    true
}

fn default_demo_track_url() -> String {
    "https://archive.org/download/testmp3testfile/mpthreetest.mp3".to_string()
}

fn default_effects() -> EffectSettings {
    EffectSettings {
        reverb_decay_secs: default_reverb_decay_secs(),
    }
}

fn default_reverb_decay_secs() -> f64 {
    0.5
}
