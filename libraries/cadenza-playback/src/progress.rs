//! Progress clock
//!
//! Samples the looped playback position on a fixed interval and publishes it
//! through a `watch` channel. Reads are also available on demand through
//! [`ProgressClock::sample`], independent of the ticker.
//!
//! The ticker runs only while playing. It is a tokio task that is aborted on
//! pause, stop and drop, so no sample is published after `stop` returns.

use crate::events::{PlaybackEvent, PlaybackObserver};
use crate::timeline::Timeline;
use cadenza_core::{ProgressSample, TimeSource};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Smallest accepted sampling interval
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct Tracking {
    timeline: Timeline,
    duration: Duration,
}

struct Shared {
    time: Arc<dyn TimeSource>,
    tracking: Mutex<Tracking>,
    sender: watch::Sender<ProgressSample>,
}

impl Shared {
    fn tracking(&self) -> MutexGuard<'_, Tracking> {
        self.tracking.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sample(&self) -> ProgressSample {
        let tracking = self.tracking();
        tracking.timeline.sample(self.time.now(), tracking.duration)
    }

    /// Sample and send under the tracking lock, so a tick racing a stop
    /// can never publish a position older than the reset
    fn publish(&self) -> ProgressSample {
        let tracking = self.tracking();
        let sample = tracking.timeline.sample(self.time.now(), tracking.duration);
        self.sender.send_replace(sample);
        sample
    }
}

/// Looped playback position sampler
pub struct ProgressClock {
    shared: Arc<Shared>,
    interval: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressClock {
    /// Create a stopped clock reading `time` every `interval`
    pub fn new(time: Arc<dyn TimeSource>, interval: Duration) -> Self {
        let (sender, _) = watch::channel(ProgressSample::default());
        Self {
            shared: Arc::new(Shared {
                time,
                tracking: Mutex::new(Tracking::default()),
                sender,
            }),
            interval: interval.max(MIN_INTERVAL),
            ticker: Mutex::new(None),
        }
    }

    /// Sampling interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start timing a track of `duration` from zero
    pub fn start(&self, duration: Duration) {
        {
            let mut tracking = self.shared.tracking();
            tracking.timeline.start(self.shared.time.now());
            tracking.duration = duration;
        }
        self.shared.publish();
        self.spawn_ticker();
        debug!(duration_secs = duration.as_secs_f64(), "Progress clock started");
    }

    /// Freeze the position. Repeated calls have no further effect.
    pub fn pause(&self) {
        let paused = self
            .shared
            .tracking()
            .timeline
            .pause(self.shared.time.now());
        if paused {
            self.abort_ticker();
            self.shared.publish();
            debug!("Progress clock paused");
        }
    }

    /// Continue after a pause, excluding the paused gap. No-op if not paused.
    pub fn resume(&self) {
        let gap = self
            .shared
            .tracking()
            .timeline
            .resume(self.shared.time.now());
        if let Some(gap) = gap {
            self.shared.publish();
            self.spawn_ticker();
            debug!(gap_secs = gap.as_secs_f64(), "Progress clock resumed");
        }
    }

    /// Cancel sampling and reset the position to zero
    pub fn stop(&self) {
        self.abort_ticker();
        self.shared.tracking().timeline.reset();
        self.shared.publish();
        debug!("Progress clock stopped");
    }

    /// Read the position now, without waiting for a tick
    pub fn sample(&self) -> ProgressSample {
        self.shared.sample()
    }

    /// Most recently published sample
    pub fn current(&self) -> ProgressSample {
        *self.shared.sender.borrow()
    }

    /// Receiver notified on every published sample
    pub fn subscribe(&self) -> watch::Receiver<ProgressSample> {
        self.shared.sender.subscribe()
    }

    /// Whether a ticker task is currently scheduled
    pub fn is_ticking(&self) -> bool {
        self.ticker_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn ticker_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_ticker(&self) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime, progress will only update on demand");
                return;
            }
        };

        let shared = Arc::downgrade(&self.shared);
        let period = self.interval;
        let task = handle.spawn(tick(shared, period));

        if let Some(previous) = self.ticker_slot().replace(task) {
            previous.abort();
        }
    }

    fn abort_ticker(&self) {
        if let Some(task) = self.ticker_slot().take() {
            task.abort();
        }
    }
}

async fn tick(shared: Weak<Shared>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(state) = shared.upgrade() else {
            break;
        };
        state.publish();
    }
}

impl PlaybackObserver for ProgressClock {
    fn on_event(&self, event: &PlaybackEvent) {
        match *event {
            PlaybackEvent::PlayStarted { duration } => self.start(duration),
            PlaybackEvent::Paused => self.pause(),
            PlaybackEvent::Resumed => self.resume(),
            PlaybackEvent::Stopped => self.stop(),
        }
    }
}

impl Drop for ProgressClock {
    fn drop(&mut self) {
        self.abort_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::test_utils::MockEngine;

    fn clock() -> (MockEngine, ProgressClock) {
        let engine = MockEngine::new(Duration::from_secs(10));
        let time: Arc<dyn TimeSource> = Arc::new(engine.manual_clock());
        (engine, ProgressClock::new(time, Duration::from_millis(100)))
    }

    fn secs(sample: ProgressSample) -> f64 {
        sample.elapsed.as_secs_f64()
    }

    #[test]
    fn sample_tracks_time_without_runtime() {
        let (engine, clock) = clock();
        clock.start(Duration::from_secs(10));
        assert!(!clock.is_ticking());

        engine.manual_clock().advance_secs(3.0);
        assert!((secs(clock.sample()) - 3.0).abs() < 1e-6);
        assert_eq!(clock.sample().duration, Duration::from_secs(10));
    }

    #[test]
    fn pause_freezes_and_resume_excludes_gap() {
        let (engine, clock) = clock();
        let time = engine.manual_clock();
        clock.start(Duration::from_secs(10));

        time.advance_secs(3.0);
        clock.pause();
        time.advance_secs(5.0);
        assert!((secs(clock.sample()) - 3.0).abs() < 1e-6);

        clock.resume();
        assert!((secs(clock.sample()) - 3.0).abs() < 1e-6);
        time.advance_secs(1.0);
        assert!((secs(clock.sample()) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn repeated_pause_and_resume_are_idempotent() {
        let (engine, clock) = clock();
        let time = engine.manual_clock();
        clock.start(Duration::from_secs(10));

        time.advance_secs(2.0);
        clock.pause();
        time.advance_secs(1.0);
        clock.pause();
        time.advance_secs(1.0);
        clock.resume();
        clock.resume();
        time.advance_secs(1.0);

        assert!((secs(clock.sample()) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn position_wraps_at_duration() {
        let (engine, clock) = clock();
        clock.start(Duration::from_secs(5));
        engine.manual_clock().advance_secs(12.0);
        assert!((secs(clock.sample()) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn stop_resets_and_publishes_zero() {
        let (engine, clock) = clock();
        clock.start(Duration::from_secs(10));
        engine.manual_clock().advance_secs(4.0);
        clock.pause();
        assert!((secs(clock.current()) - 4.0).abs() < 1e-6);

        clock.stop();
        assert_eq!(clock.current().elapsed, Duration::ZERO);
        engine.manual_clock().advance_secs(4.0);
        assert_eq!(clock.sample().elapsed, Duration::ZERO);
    }

    #[test]
    fn observer_events_drive_the_clock() {
        let (engine, clock) = clock();
        clock.on_event(&PlaybackEvent::PlayStarted {
            duration: Duration::from_secs(10),
        });
        engine.manual_clock().advance_secs(2.0);
        clock.on_event(&PlaybackEvent::Paused);
        engine.manual_clock().advance_secs(2.0);
        clock.on_event(&PlaybackEvent::Resumed);
        assert!((secs(clock.sample()) - 2.0).abs() < 1e-6);

        clock.on_event(&PlaybackEvent::Stopped);
        assert_eq!(clock.sample().elapsed, Duration::ZERO);
    }

    #[test]
    fn zero_interval_is_raised() {
        let time: Arc<dyn TimeSource> = Arc::new(cadenza_core::MonotonicTime::new());
        let clock = ProgressClock::new(time, Duration::ZERO);
        assert_eq!(clock.interval(), MIN_INTERVAL);
    }

    #[tokio::test]
    async fn ticker_runs_only_while_playing() {
        let (_engine, clock) = clock();
        clock.start(Duration::from_secs(10));
        assert!(clock.is_ticking());

        clock.pause();
        assert!(!clock.is_ticking());

        clock.resume();
        assert!(clock.is_ticking());

        clock.stop();
        assert!(!clock.is_ticking());
    }
}
