//! Property-based tests for progress tracking and effect parameters
//!
//! Uses proptest to verify invariants across many random inputs.

use cadenza_core::test_utils::MockEngine;
use cadenza_core::{EffectParam, StageOptions};
use cadenza_playback::{EffectChain, Timeline};
use proptest::prelude::*;
use std::time::Duration;

// ===== Helpers =====

#[derive(Debug, Clone, Copy)]
enum Step {
    Advance(u64),
    Pause,
    Resume,
}

fn arbitrary_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (1u64..5_000).prop_map(Step::Advance), // milliseconds
        1 => Just(Step::Pause),
        1 => Just(Step::Resume),
    ]
}

fn arbitrary_param() -> impl Strategy<Value = EffectParam> {
    prop::sample::select(EffectParam::ALL.to_vec())
}

// ===== Property Tests =====

proptest! {
    /// Property: looped position always lies in [0, duration)
    #[test]
    fn position_stays_within_track(
        duration_ms in 1u64..600_000,
        steps in prop::collection::vec(arbitrary_step(), 0..60),
    ) {
        let duration = Duration::from_millis(duration_ms);
        let mut now = Duration::ZERO;
        let mut timeline = Timeline::new();
        timeline.start(now);

        for step in steps {
            match step {
                Step::Advance(ms) => now += Duration::from_millis(ms),
                Step::Pause => { timeline.pause(now); }
                Step::Resume => { timeline.resume(now); }
            }
            let sample = timeline.sample(now, duration);
            prop_assert!(sample.elapsed < duration, "{:?} >= {:?}", sample.elapsed, duration);
            prop_assert!((0.0..=100.0).contains(&sample.percent()));
        }
    }

    /// Property: unwrapped elapsed time never decreases and never exceeds wall time
    #[test]
    fn elapsed_is_monotonic(steps in prop::collection::vec(arbitrary_step(), 0..80)) {
        let mut now = Duration::from_secs(1);
        let started = now;
        let mut timeline = Timeline::new();
        timeline.start(now);
        let mut previous = Duration::ZERO;

        for step in steps {
            match step {
                Step::Advance(ms) => now += Duration::from_millis(ms),
                Step::Pause => { timeline.pause(now); }
                Step::Resume => { timeline.resume(now); }
            }
            let elapsed = timeline.elapsed(now);
            prop_assert!(elapsed >= previous);
            prop_assert!(elapsed <= now - started);
            previous = elapsed;
        }
    }

    /// Property: pausing N times then resuming equals pausing once
    #[test]
    fn repeated_pause_is_single_pause(
        before_ms in 0u64..10_000,
        gaps in prop::collection::vec(0u64..2_000, 1..10),
        after_ms in 0u64..10_000,
    ) {
        let mut once = Timeline::new();
        let mut many = Timeline::new();
        once.start(Duration::ZERO);
        many.start(Duration::ZERO);

        let mut now = Duration::from_millis(before_ms);
        once.pause(now);
        for gap in &gaps {
            many.pause(now);
            now += Duration::from_millis(*gap);
        }
        once.resume(now);
        many.resume(now);
        // Extra resumes are ignored
        many.resume(now);

        now += Duration::from_millis(after_ms);
        prop_assert_eq!(once.elapsed(now), many.elapsed(now));
        prop_assert_eq!(once.elapsed(now), Duration::from_millis(before_ms + after_ms));
    }

    /// Property: any finite request is clamped into the domain and applied
    #[test]
    fn clamped_effects_stay_in_domain(
        param in arbitrary_param(),
        value in -1_000.0f64..1_000.0,
    ) {
        let engine = MockEngine::new(Duration::from_secs(1));
        let mut chain = EffectChain::build(&engine, &StageOptions::default()).unwrap();

        let applied = param.clamp(value).unwrap();
        prop_assert!(param.domain().contains(&applied));

        chain.set_parameter(None, param, applied).unwrap();
        prop_assert_eq!(chain.parameters().get(param), applied);
    }

    /// Property: out-of-domain values never reach the engine
    #[test]
    fn unclamped_values_are_rejected(
        param in arbitrary_param(),
        excess in 0.001f64..1_000.0,
    ) {
        let engine = MockEngine::new(Duration::from_secs(1));
        let mut chain = EffectChain::build(&engine, &StageOptions::default()).unwrap();
        let before = chain.parameters();
        engine.clear_calls();

        let value = param.domain().end() + excess;
        prop_assert!(chain.set_parameter(None, param, value).is_err());
        prop_assert!(engine.calls().is_empty());
        prop_assert_eq!(chain.parameters(), before);
    }
}
