//! Progress ticker tests on tokio's paused clock
//!
//! The ticker and the time source both follow tokio time, which advances
//! automatically while every task is idle.

use cadenza_core::{ProgressSample, TimeSource};
use cadenza_playback::ProgressClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

struct TokioTime {
    origin: Instant,
}

impl TokioTime {
    fn new() -> Arc<dyn TimeSource> {
        Arc::new(Self {
            origin: Instant::now(),
        })
    }
}

impl TimeSource for TokioTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

fn progress_clock(interval_ms: u64) -> ProgressClock {
    ProgressClock::new(TokioTime::new(), Duration::from_millis(interval_ms))
}

fn secs(sample: ProgressSample) -> f64 {
    sample.elapsed.as_secs_f64()
}

#[tokio::test(start_paused = true)]
async fn ticker_publishes_while_playing() {
    let clock = progress_clock(100);
    let mut updates = clock.subscribe();

    clock.start(Duration::from_secs(10));
    sleep(Duration::from_millis(3_050)).await;

    let published = secs(*updates.borrow_and_update());
    assert!((published - 3.0).abs() <= 0.1, "published {published}");
}

#[tokio::test(start_paused = true)]
async fn published_value_freezes_during_pause() {
    let clock = progress_clock(100);
    clock.start(Duration::from_secs(10));

    sleep(Duration::from_millis(2_000)).await;
    clock.pause();
    let frozen = clock.current();

    sleep(Duration::from_secs(5)).await;
    assert_eq!(clock.current(), frozen);
    assert!((secs(clock.sample()) - 2.0).abs() < 1e-3);

    clock.resume();
    sleep(Duration::from_millis(1_050)).await;
    assert!((secs(clock.current()) - 3.0).abs() <= 0.1);
}

#[tokio::test(start_paused = true)]
async fn nothing_is_published_after_stop() {
    let clock = progress_clock(50);
    let mut updates = clock.subscribe();

    clock.start(Duration::from_secs(10));
    sleep(Duration::from_millis(500)).await;
    clock.stop();
    updates.borrow_and_update();

    sleep(Duration::from_secs(2)).await;
    assert!(!updates.has_changed().unwrap());
    assert_eq!(clock.current().elapsed, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn interval_controls_update_rate() {
    let clock = progress_clock(250);
    let mut updates = clock.subscribe();
    clock.start(Duration::from_secs(60));
    updates.borrow_and_update();

    let mut ticks = 0;
    let deadline = Instant::now() + Duration::from_millis(1_010);
    while tokio::time::timeout_at(deadline, updates.changed()).await.is_ok() {
        updates.borrow_and_update();
        ticks += 1;
    }

    // First tick fires immediately, then every 250 ms
    assert!((4..=5).contains(&ticks), "ticks = {ticks}");
}

#[tokio::test(start_paused = true)]
async fn looping_wraps_published_position() {
    let clock = progress_clock(100);
    clock.start(Duration::from_secs(5));

    sleep(Duration::from_millis(12_050)).await;
    assert!((secs(clock.current()) - 2.0).abs() <= 0.1);
}
