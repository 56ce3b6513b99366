//! Player - presentation boundary
//!
//! Owns the effect chain, transport controller and progress clock, and wires
//! them to one audio engine. Every failed operation is logged and kept as
//! [`Player::last_error`] in addition to being returned.

use crate::chain::EffectChain;
use crate::config::PlayerConfig;
use crate::controller::PlaybackController;
use crate::error::{PlayerError, Result};
use crate::events::{PlaybackEvent, PlaybackObserver};
use crate::progress::ProgressClock;
use crate::session::PlaybackSession;
use cadenza_core::{
    AudioEngine, ClockTime, Destination, EffectParam, EffectParameters, EngineError,
    ProgressSample, TransportState,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Serializable view of the player for UI layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub state: TransportState,
    pub effects: EffectParameters,
    pub progress: ProgressSample,
    pub duration: Option<Duration>,
    pub last_error: Option<String>,
}

/// Single-track player
pub struct Player {
    engine: Arc<dyn AudioEngine>,
    config: PlayerConfig,
    chain: Option<EffectChain>,
    controller: PlaybackController,
    progress: Arc<ProgressClock>,
    last_error: Option<PlayerError>,
}

impl Player {
    /// Create a player for `engine`.
    ///
    /// Nothing is audible until [`initialize`](Player::initialize) completes.
    pub fn new(engine: Arc<dyn AudioEngine>, config: PlayerConfig) -> Result<Self> {
        config.validate()?;

        let clock = engine.clock();
        let progress = Arc::new(ProgressClock::new(
            Arc::new(ClockTime(Arc::clone(&clock))),
            config.poll_interval(),
        ));

        let mut controller = PlaybackController::new(clock);
        controller.subscribe(progress.clone());

        Ok(Self {
            engine,
            config,
            chain: None,
            controller,
            progress,
            last_error: None,
        })
    }

    /// Unlock the engine and build the effect chain with default parameters.
    ///
    /// Safe to retry after a failure. Calling it again once initialized is a
    /// no-op.
    pub async fn initialize(&mut self) -> Result<()> {
        let result = self.try_initialize().await;
        self.record(result)
    }

    async fn try_initialize(&mut self) -> Result<()> {
        if self.chain.is_some() {
            debug!("Player already initialized");
            return Ok(());
        }

        self.engine
            .unlock()
            .await
            .map_err(|e| PlayerError::InitializationFailed(e.to_string()))?;

        let mut chain = EffectChain::build(self.engine.as_ref(), &self.config.stage_options())
            .map_err(|e| PlayerError::InitializationFailed(e.to_string()))?;

        // Engine stage defaults differ from ours
        chain
            .reset(None)
            .map_err(|e| PlayerError::InitializationFailed(e.to_string()))?;

        self.chain = Some(chain);
        self.last_error = None;
        info!("Player initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.chain.is_some()
    }

    /// Fetch, decode and attach a track, replacing any loaded one.
    ///
    /// A playing track is stopped first. The current effect parameters,
    /// including speed, are applied to the new source before it is attached.
    pub async fn load_track(&mut self, url: &str) -> Result<()> {
        let result = self.try_load_track(url).await;
        self.record(result)
    }

    async fn try_load_track(&mut self, url: &str) -> Result<()> {
        let chain = self.chain.as_mut().ok_or(PlayerError::NotInitialized)?;
        let load_failed = |source: EngineError| PlayerError::LoadFailed {
            url: url.to_string(),
            source,
        };

        info!(url, "Loading track");
        let track = self.engine.decode(url).await.map_err(load_failed)?;
        if track.duration.is_zero() {
            return Err(load_failed(EngineError::decode(url, "track has no audio")));
        }

        let source = self
            .engine
            .create_source(&track, self.config.playback.looping)
            .map_err(load_failed)?;
        let mut session = PlaybackSession::new(source, url);

        self.engine
            .connect(session.source().id(), Destination::Stage(chain.input()))
            .map_err(load_failed)?;

        let parameters = chain.parameters();
        chain.apply_all(Some(session.source_mut()), &parameters)?;

        self.controller.attach(session).await?;
        self.last_error = None;
        Ok(())
    }

    /// Load the configured demo track
    pub async fn load_demo_track(&mut self) -> Result<()> {
        let url = self.config.playback.demo_track_url.clone();
        self.load_track(&url).await
    }

    /// Play, pause or resume. Returns the state after the transition.
    pub async fn toggle_playback(&mut self) -> Result<TransportState> {
        let result = self.controller.toggle_playback().await;
        self.record(result)
    }

    /// Stop and rewind to zero. No-op unless playing or paused.
    pub async fn stop(&mut self) -> Result<()> {
        let result = self.controller.stop().await;
        self.record(result)
    }

    /// Set an effect by its boundary name.
    ///
    /// Out-of-range values are clamped to the parameter's domain; the applied
    /// value is returned. NaN and unknown names are rejected.
    pub fn set_effect(&mut self, name: &str, value: f64) -> Result<f64> {
        let result = name
            .parse::<EffectParam>()
            .map_err(PlayerError::from)
            .and_then(|param| self.apply_effect(param, value));
        self.record(result)
    }

    /// Typed variant of [`set_effect`](Player::set_effect)
    pub fn set_effect_param(&mut self, param: EffectParam, value: f64) -> Result<f64> {
        let result = self.apply_effect(param, value);
        self.record(result)
    }

    fn apply_effect(&mut self, param: EffectParam, value: f64) -> Result<f64> {
        let clamped = param.clamp(value).ok_or_else(|| {
            PlayerError::InvalidParameter(format!("{} = {} is not a number", param, value))
        })?;
        if clamped != value {
            debug!(%param, requested = value, applied = clamped, "Clamped effect value");
        }

        let chain = self.chain.as_mut().ok_or(PlayerError::NotInitialized)?;
        chain.set_parameter(self.controller.source_mut(), param, clamped)?;
        Ok(clamped)
    }

    /// Restore every effect to its default
    pub fn reset_effects(&mut self) -> Result<()> {
        let result = match self.chain.as_mut() {
            Some(chain) => chain.reset(self.controller.source_mut()),
            None => Err(PlayerError::NotInitialized),
        };
        self.record(result)
    }

    /// Release the session, cancel progress sampling and dispose the chain.
    ///
    /// Resources are released even if stopping the transport fails.
    pub async fn teardown(&mut self) -> Result<()> {
        // Sampling ends before the session goes, whatever detach reports
        self.progress.stop();
        let detached = self.controller.detach().await;

        if let Some(mut chain) = self.chain.take() {
            chain.dispose();
        }

        info!("Player torn down");
        self.record(detached)
    }

    pub fn transport_state(&self) -> TransportState {
        self.controller.state()
    }

    /// Current effect parameters (defaults before initialization)
    pub fn effects(&self) -> EffectParameters {
        self.chain
            .as_ref()
            .map(EffectChain::parameters)
            .unwrap_or_default()
    }

    /// Current looped position
    pub fn progress(&self) -> ProgressSample {
        self.progress.sample()
    }

    /// Receiver for samples published on every progress tick
    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSample> {
        self.progress.subscribe()
    }

    /// Register an observer for transport events
    pub fn subscribe(&mut self, observer: Arc<dyn PlaybackObserver>) {
        self.controller.subscribe(observer);
    }

    /// Take transport events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.controller.drain_events()
    }

    /// Duration of the loaded track
    pub fn duration(&self) -> Option<Duration> {
        self.controller.duration()
    }

    pub fn last_error(&self) -> Option<&PlayerError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.transport_state(),
            effects: self.effects(),
            progress: self.progress(),
            duration: self.duration(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            match err {
                PlayerError::NoAudioLoaded
                | PlayerError::NotInitialized
                | PlayerError::InvalidParameter(_) => warn!(error = %err, "Player request rejected"),
                _ => error!(error = %err, "Player operation failed"),
            }
            self.last_error = Some(err.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::test_utils::{MockEngine, MockFailure};

    fn player(engine: &MockEngine) -> Player {
        Player::new(Arc::new(engine.clone()), PlayerConfig::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let engine = MockEngine::new(Duration::from_secs(1));
        let mut config = PlayerConfig::default();
        config.progress.poll_interval_ms = 0;

        assert!(matches!(
            Player::new(Arc::new(engine), config),
            Err(PlayerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let engine = MockEngine::new(Duration::from_secs(1));
        let mut player = player(&engine);

        player.initialize().await.unwrap();
        player.initialize().await.unwrap();
        assert_eq!(engine.live_stage_count(), 4);
        assert!(player.is_initialized());
    }

    #[tokio::test]
    async fn failed_unlock_can_be_retried() {
        let engine = MockEngine::new(Duration::from_secs(1));
        let mut player = player(&engine);

        engine.fail_next(MockFailure::Unlock);
        let err = player.initialize().await.unwrap_err();
        assert!(matches!(err, PlayerError::InitializationFailed(_)));
        assert_eq!(player.last_error(), Some(&err));
        assert!(!player.is_initialized());

        player.initialize().await.unwrap();
        assert!(player.is_initialized());
        assert!(player.last_error().is_none());
    }

    #[tokio::test]
    async fn failed_stage_creation_fails_initialize_cleanly() {
        let engine = MockEngine::new(Duration::from_secs(1));
        let mut player = player(&engine);

        engine.fail_nth(MockFailure::CreateStage, 2);
        let err = player.initialize().await.unwrap_err();
        assert!(matches!(err, PlayerError::InitializationFailed(_)));
        assert!(!player.is_initialized());
        assert_eq!(engine.live_stage_count(), 0);

        player.initialize().await.unwrap();
        assert_eq!(engine.live_stage_count(), 4);
    }

    #[tokio::test]
    async fn teardown_cancels_sampling_even_when_stop_fails() {
        let engine = MockEngine::new(Duration::from_secs(30));
        let mut player = player(&engine);
        player.initialize().await.unwrap();
        player.load_track("mem://a").await.unwrap();
        player.toggle_playback().await.unwrap();
        engine.manual_clock().advance_secs(2.0);
        assert!(player.progress.is_ticking());

        engine.fail_next(MockFailure::Stop);
        let err = player.teardown().await.unwrap_err();
        assert!(matches!(err, PlayerError::Engine(_)));

        assert!(!player.progress.is_ticking());
        assert_eq!(player.progress().elapsed, Duration::ZERO);
        assert_eq!(player.transport_state(), TransportState::Idle);
        assert_eq!(engine.live_source_count(), 0);
        assert_eq!(engine.live_stage_count(), 0);
    }

    #[tokio::test]
    async fn load_requires_initialize() {
        let engine = MockEngine::new(Duration::from_secs(1));
        let mut player = player(&engine);

        let err = player.load_track("mem://a").await.unwrap_err();
        assert_eq!(err, PlayerError::NotInitialized);
        assert_eq!(player.transport_state(), TransportState::Idle);
    }

    #[tokio::test]
    async fn set_effect_clamps_and_reports_applied_value() {
        let engine = MockEngine::new(Duration::from_secs(1));
        let mut player = player(&engine);
        player.initialize().await.unwrap();

        assert_eq!(player.set_effect("volume", 1.4).unwrap(), 1.0);
        assert_eq!(player.set_effect("pitch", -30.0).unwrap(), -12.0);
        assert_eq!(player.effects().pitch, -12.0);

        assert!(matches!(
            player.set_effect("pitch", f64::NAN),
            Err(PlayerError::InvalidParameter(_))
        ));
        assert!(matches!(
            player.set_effect("tremolo", 0.5),
            Err(PlayerError::InvalidParameter(_))
        ));
        assert_eq!(player.effects().pitch, -12.0);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let engine = MockEngine::new(Duration::from_secs(1));
        let player = player(&engine);

        let json = serde_json::to_value(player.snapshot()).unwrap();
        assert_eq!(json["state"], "idle");
        assert_eq!(json["effects"]["lowEQ"], 0.0);
        assert!(json["lastError"].is_null());
    }
}
