//! Transport state machine
//!
//! ```text
//! Idle --attach--> Loaded --toggle--> Playing <--toggle--> Paused
//!                     ^                  |                   |
//!                     |                stop                stop
//!                     |                  v                   |
//!                     +--attach------ Stopped <--------------+
//!                                        |
//!                                      toggle --> Playing (from zero)
//! ```
//!
//! Pause suspends the shared engine clock so the source keeps its position.
//! Stop halts the source; a later play restarts it from zero.

use crate::error::{PlayerError, Result};
use crate::events::{PlaybackEvent, PlaybackObserver};
use crate::session::{PlaybackSession, SessionSlot};
use crate::timeline::Timeline;
use cadenza_core::{
    ClockState, EngineClock, ProgressSample, SourceStage, SourceState, TransportState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct PlaybackController {
    clock: Arc<dyn EngineClock>,
    state: TransportState,
    slot: SessionSlot,
    timeline: Timeline,
    observers: Vec<Arc<dyn PlaybackObserver>>,
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackController {
    /// Create an idle controller driving `clock`
    pub fn new(clock: Arc<dyn EngineClock>) -> Self {
        Self {
            clock,
            state: TransportState::Idle,
            slot: SessionSlot::NoSession,
            timeline: Timeline::new(),
            observers: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    /// Register an observer for transport events
    pub fn subscribe(&mut self, observer: Arc<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    /// Install a freshly loaded session.
    ///
    /// A playing or paused session is stopped first (emitting `Stopped`) and
    /// its source released. If that stop fails the new session is dropped
    /// and the old one stays in place.
    pub async fn attach(&mut self, session: PlaybackSession) -> Result<()> {
        if self.state.is_active() {
            self.stop().await?;
        }

        let url = session.url().to_string();
        let duration = session.duration();
        if let Some(previous) = self.slot.replace(session) {
            debug!(url = previous.url(), "Releasing previous session");
        }

        self.timeline.reset();
        self.state = TransportState::Loaded;
        info!(url = %url, duration_secs = duration.as_secs_f64(), "Track loaded");
        Ok(())
    }

    /// Play, pause or resume depending on the current state.
    ///
    /// Returns the state after the transition.
    pub async fn toggle_playback(&mut self) -> Result<TransportState> {
        match self.state {
            TransportState::Idle => {
                warn!("Toggle requested with no audio loaded");
                Err(PlayerError::NoAudioLoaded)
            }
            TransportState::Loaded | TransportState::Stopped => self.start().await,
            TransportState::Playing => self.pause().await,
            TransportState::Paused if self.source_started() => self.resume().await,
            TransportState::Paused => {
                debug!("Source halted while paused, restarting from zero");
                self.start().await
            }
        }
    }

    fn source_started(&self) -> bool {
        self.slot
            .session()
            .is_some_and(|session| session.source().state() == SourceState::Started)
    }

    /// Start the source from zero, resuming a suspended clock first
    async fn start(&mut self) -> Result<TransportState> {
        if self.clock.state() == ClockState::Suspended {
            self.clock.resume().await.map_err(|e| {
                error!(error = %e, "Engine clock failed to resume");
                e
            })?;
        }

        let session = self.slot.session_mut().ok_or(PlayerError::NoAudioLoaded)?;
        let duration = session.duration();

        session.source_mut().start().map_err(|e| {
            error!(error = %e, "Source failed to start");
            e
        })?;

        self.timeline.start(self.clock.now());
        self.state = TransportState::Playing;
        info!(duration_secs = duration.as_secs_f64(), "Playback started");
        self.emit(PlaybackEvent::PlayStarted { duration });
        Ok(self.state)
    }

    async fn pause(&mut self) -> Result<TransportState> {
        self.clock.suspend().await.map_err(|e| {
            error!(error = %e, "Engine clock failed to suspend");
            e
        })?;

        self.timeline.pause(self.clock.now());
        self.state = TransportState::Paused;
        info!("Playback paused");
        self.emit(PlaybackEvent::Paused);
        Ok(self.state)
    }

    async fn resume(&mut self) -> Result<TransportState> {
        self.clock.resume().await.map_err(|e| {
            error!(error = %e, "Engine clock failed to resume");
            e
        })?;

        self.mark_resumed();
        info!("Playback resumed");
        self.emit(PlaybackEvent::Resumed);
        Ok(self.state)
    }

    fn mark_resumed(&mut self) {
        if let Some(gap) = self.timeline.resume(self.clock.now()) {
            debug!(gap_secs = gap.as_secs_f64(), "Discounting paused time");
        }
        self.state = TransportState::Playing;
    }

    /// Halt the source and reset the position to zero.
    ///
    /// A paused clock is resumed first so the engine processes the stop. If
    /// the source then refuses to stop, the clock is suspended again and the
    /// transport stays `Paused`. Without an active transport this is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.state.is_active() {
            debug!(state = %self.state, "Stop ignored");
            return Ok(());
        }

        let was_paused = self.state == TransportState::Paused;
        if was_paused {
            self.clock.resume().await.map_err(|e| {
                error!(error = %e, "Engine clock failed to resume");
                e
            })?;
        }

        if let Err(err) = self.stop_source() {
            error!(error = %err, "Source failed to stop");
            if was_paused {
                self.restore_pause().await;
            }
            return Err(err);
        }

        self.timeline.reset();
        self.state = TransportState::Stopped;
        info!("Playback stopped");
        self.emit(PlaybackEvent::Stopped);
        Ok(())
    }

    fn stop_source(&mut self) -> Result<()> {
        let session = self.slot.session_mut().ok_or(PlayerError::NoAudioLoaded)?;
        let source = session.source_mut();
        if source.state() == SourceState::Started {
            source.stop()?;
        }
        Ok(())
    }

    /// Put the clock back to sleep after a stop that did not happen.
    ///
    /// If the clock cannot be suspended the source is audible again, so the
    /// transport moves to `Playing` and observers are told.
    async fn restore_pause(&mut self) {
        match self.clock.suspend().await {
            Ok(()) => debug!("Clock suspended again after failed stop"),
            Err(e) => {
                error!(error = %e, "Engine clock failed to suspend after failed stop");
                self.mark_resumed();
                self.emit(PlaybackEvent::Resumed);
            }
        }
    }

    /// Stop and release the session, returning to `Idle`.
    ///
    /// The session is released even if stopping fails; the stop error is
    /// still returned.
    pub async fn detach(&mut self) -> Result<()> {
        let stopped = self.stop().await;
        drop(self.slot.take());
        self.timeline.reset();
        self.state = TransportState::Idle;
        debug!("Session detached");
        stopped
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Duration of the loaded track
    pub fn duration(&self) -> Option<Duration> {
        self.slot.session().map(PlaybackSession::duration)
    }

    pub fn has_session(&self) -> bool {
        self.slot.is_active()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.slot.session()
    }

    /// Source of the loaded track, for playback-rate writes
    pub fn source_mut(&mut self) -> Option<&mut dyn SourceStage> {
        self.slot.session_mut().map(PlaybackSession::source_mut)
    }

    /// Current position, wrapped at the track duration
    pub fn position(&self) -> ProgressSample {
        match self.duration() {
            Some(duration) => self.timeline.sample(self.clock.now(), duration),
            None => ProgressSample::default(),
        }
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.pending_events.push(event);
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}
