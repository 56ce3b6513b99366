//! Start/pause bookkeeping for elapsed playback time
//!
//! Elapsed time is `now - started_at - paused_total`, frozen at the pause
//! instant while paused. All fields change together in one `&mut self` call,
//! so a reader holding the same lock never sees a partial transition.

use cadenza_core::ProgressSample;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeline {
    started_at: Option<Duration>,
    paused_at: Option<Duration>,
    paused_total: Duration,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin timing from `now`, forgetting previous pauses
    pub fn start(&mut self, now: Duration) {
        self.started_at = Some(now);
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
    }

    /// Record a pause at `now`.
    ///
    /// Returns `false` (and changes nothing) if not running or already paused.
    pub fn pause(&mut self, now: Duration) -> bool {
        if self.started_at.is_none() || self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// End a pause at `now`, returning the length of the gap.
    ///
    /// Returns `None` (and changes nothing) if not paused.
    pub fn resume(&mut self, now: Duration) -> Option<Duration> {
        let paused_at = self.paused_at.take()?;
        let gap = now.saturating_sub(paused_at);
        self.paused_total += gap;
        Some(gap)
    }

    /// Forget everything
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Accumulated pause time, excluding a pause still in progress
    pub fn paused_total(&self) -> Duration {
        self.paused_total
    }

    /// Elapsed play time at `now`, not wrapped. Never negative.
    pub fn elapsed(&self, now: Duration) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };
        let effective_now = self.paused_at.unwrap_or(now);
        effective_now
            .saturating_sub(started_at)
            .saturating_sub(self.paused_total)
    }

    /// Elapsed play time at `now`, wrapped at `duration`
    pub fn sample(&self, now: Duration, duration: Duration) -> ProgressSample {
        ProgressSample::looped(self.elapsed(now), duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn not_started_is_zero() {
        let timeline = Timeline::new();
        assert_eq!(timeline.elapsed(secs(50.0)), Duration::ZERO);
        assert!(!timeline.is_started());
    }

    #[test]
    fn elapsed_counts_from_start() {
        let mut timeline = Timeline::new();
        timeline.start(secs(10.0));
        assert_eq!(timeline.elapsed(secs(13.0)), secs(3.0));
    }

    #[test]
    fn pause_freezes_and_resume_discounts_gap() {
        let mut timeline = Timeline::new();
        timeline.start(secs(0.0));

        assert!(timeline.pause(secs(3.0)));
        assert_eq!(timeline.elapsed(secs(6.0)), secs(3.0));

        assert_eq!(timeline.resume(secs(8.0)), Some(secs(5.0)));
        assert_eq!(timeline.elapsed(secs(8.0)), secs(3.0));
        assert_eq!(timeline.elapsed(secs(9.0)), secs(4.0));
    }

    #[test]
    fn double_pause_is_single_pause() {
        let mut timeline = Timeline::new();
        timeline.start(secs(0.0));

        assert!(timeline.pause(secs(2.0)));
        assert!(!timeline.pause(secs(4.0)));

        timeline.resume(secs(6.0));
        assert_eq!(timeline.paused_total(), secs(4.0));
        assert_eq!(timeline.elapsed(secs(6.0)), secs(2.0));
    }

    #[test]
    fn resume_without_pause_is_noop() {
        let mut timeline = Timeline::new();
        timeline.start(secs(1.0));
        let before = timeline;

        assert_eq!(timeline.resume(secs(5.0)), None);
        assert_eq!(timeline, before);
    }

    #[test]
    fn pause_before_start_is_ignored() {
        let mut timeline = Timeline::new();
        assert!(!timeline.pause(secs(1.0)));
        assert!(!timeline.is_paused());
    }

    #[test]
    fn clock_going_backwards_saturates() {
        let mut timeline = Timeline::new();
        timeline.start(secs(10.0));
        assert_eq!(timeline.elapsed(secs(5.0)), Duration::ZERO);
    }

    #[test]
    fn restart_clears_pauses() {
        let mut timeline = Timeline::new();
        timeline.start(secs(0.0));
        timeline.pause(secs(1.0));
        timeline.resume(secs(3.0));

        timeline.start(secs(10.0));
        assert_eq!(timeline.paused_total(), Duration::ZERO);
        assert_eq!(timeline.elapsed(secs(11.0)), secs(1.0));
    }

    #[test]
    fn sample_wraps_at_duration() {
        let mut timeline = Timeline::new();
        timeline.start(secs(0.0));
        let sample = timeline.sample(secs(12.0), secs(5.0));
        assert!((sample.elapsed.as_secs_f64() - 2.0).abs() < 1e-6);
    }
}
