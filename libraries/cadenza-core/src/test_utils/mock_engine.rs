//! In-memory audio engine
//!
//! Records every stage write and transport command instead of producing
//! sound. Time only moves when the test advances the [`ManualClock`].
//! One-shot failures can be armed per operation with [`MockEngine::fail_next`]
//! or, to fail partway through a sequence, [`MockEngine::fail_nth`].

use crate::engine::{
    AudioEngine, ClockState, DecodedTrack, Destination, EffectStage, EngineClock, SourceStage,
    SourceState, StageId, StageKind, StageOptions, StageParam, TimeSource,
};
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Operation that can be made to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MockFailure {
    Unlock,
    Decode,
    CreateStage,
    CreateSource,
    Connect,
    Suspend,
    Resume,
    Start,
    Stop,
    SetParam,
}

#[derive(Debug, Clone)]
struct StageRecord {
    kind: StageKind,
    params: HashMap<StageParam, f64>,
    disposed: bool,
}

#[derive(Debug, Clone)]
struct SourceRecord {
    state: SourceState,
    rate: f64,
    looping: bool,
    starts: u32,
    disposed: bool,
}

#[derive(Debug)]
struct MockState {
    now: Duration,
    clock: ClockState,
    unlocked: bool,
    next_id: u64,
    track_duration: Duration,
    stages: HashMap<StageId, StageRecord>,
    sources: HashMap<StageId, SourceRecord>,
    connections: Vec<(StageId, Destination)>,
    /// Calls left before each armed failure fires, counting the failing one
    armed: HashMap<MockFailure, usize>,
    calls: Vec<String>,
}

impl MockState {
    fn take_failure(&mut self, failure: MockFailure) -> bool {
        match self.armed.get_mut(&failure) {
            Some(remaining) if *remaining <= 1 => {
                self.armed.remove(&failure);
                true
            }
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        }
    }

    fn allocate_id(&mut self) -> StageId {
        self.next_id += 1;
        StageId(self.next_id)
    }
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Manually advanced engine clock
#[derive(Clone)]
pub struct ManualClock {
    state: Shared,
}

impl ManualClock {
    /// Move time forward
    pub fn advance(&self, by: Duration) {
        lock(&self.state).now += by;
    }

    /// Move time forward by fractional seconds
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Duration {
        lock(&self.state).now
    }
}

#[async_trait]
impl EngineClock for ManualClock {
    fn state(&self) -> ClockState {
        lock(&self.state).clock
    }

    async fn suspend(&self) -> EngineResult<()> {
        let mut state = lock(&self.state);
        state.calls.push("clock.suspend".to_string());
        if state.take_failure(MockFailure::Suspend) {
            return Err(EngineError::clock("suspend rejected"));
        }
        state.clock = ClockState::Suspended;
        Ok(())
    }

    async fn resume(&self) -> EngineResult<()> {
        let mut state = lock(&self.state);
        state.calls.push("clock.resume".to_string());
        if state.take_failure(MockFailure::Resume) {
            return Err(EngineError::clock("resume rejected"));
        }
        state.clock = ClockState::Running;
        Ok(())
    }
}

struct MockStage {
    id: StageId,
    kind: StageKind,
    state: Shared,
}

impl EffectStage for MockStage {
    fn id(&self) -> StageId {
        self.id
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn set_param(&mut self, param: StageParam, value: f64) -> EngineResult<()> {
        let mut state = lock(&self.state);
        if state.take_failure(MockFailure::SetParam) {
            return Err(EngineError::stage("parameter write rejected"));
        }
        state.calls.push(format!("{}.set {:?}", self.id, param));
        let record = state.stages.get_mut(&self.id).ok_or(EngineError::Disposed)?;
        if record.disposed {
            return Err(EngineError::Disposed);
        }
        if param.kind() != record.kind {
            return Err(EngineError::stage(format!(
                "{:?} is not a parameter of {:?}",
                param, record.kind
            )));
        }
        record.params.insert(param, value);
        Ok(())
    }

    fn param(&self, param: StageParam) -> EngineResult<f64> {
        let state = lock(&self.state);
        let record = state.stages.get(&self.id).ok_or(EngineError::Disposed)?;
        if record.disposed {
            return Err(EngineError::Disposed);
        }
        record
            .params
            .get(&param)
            .copied()
            .ok_or_else(|| EngineError::stage(format!("{:?} not on {:?}", param, record.kind)))
    }

    fn dispose(&mut self) {
        let mut state = lock(&self.state);
        state.calls.push(format!("{}.dispose", self.id));
        if let Some(record) = state.stages.get_mut(&self.id) {
            record.disposed = true;
        }
    }
}

struct MockSource {
    id: StageId,
    duration: Duration,
    state: Shared,
}

impl MockSource {
    fn with_record<T>(
        &self,
        f: impl FnOnce(&mut SourceRecord) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut state = lock(&self.state);
        let record = state.sources.get_mut(&self.id).ok_or(EngineError::Disposed)?;
        if record.disposed {
            return Err(EngineError::Disposed);
        }
        f(record)
    }
}

impl SourceStage for MockSource {
    fn id(&self) -> StageId {
        self.id
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn state(&self) -> SourceState {
        self.with_record(|record| Ok(record.state))
            .unwrap_or(SourceState::Stopped)
    }

    fn start(&mut self) -> EngineResult<()> {
        {
            let mut state = lock(&self.state);
            state.calls.push(format!("{}.start", self.id));
            if state.take_failure(MockFailure::Start) {
                return Err(EngineError::source("start rejected"));
            }
        }
        self.with_record(|record| {
            record.state = SourceState::Started;
            record.starts += 1;
            Ok(())
        })
    }

    fn stop(&mut self) -> EngineResult<()> {
        {
            let mut state = lock(&self.state);
            state.calls.push(format!("{}.stop", self.id));
            if state.take_failure(MockFailure::Stop) {
                return Err(EngineError::source("stop rejected"));
            }
            if state.clock == ClockState::Suspended {
                return Err(EngineError::source("stop issued while clock suspended"));
            }
        }
        self.with_record(|record| {
            record.state = SourceState::Stopped;
            Ok(())
        })
    }

    fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()> {
        self.with_record(|record| {
            record.rate = rate;
            Ok(())
        })
    }

    fn playback_rate(&self) -> f64 {
        self.with_record(|record| Ok(record.rate)).unwrap_or(1.0)
    }

    fn dispose(&mut self) {
        let mut state = lock(&self.state);
        state.calls.push(format!("{}.dispose", self.id));
        if let Some(record) = state.sources.get_mut(&self.id) {
            record.disposed = true;
            record.state = SourceState::Stopped;
        }
    }
}

/// In-memory [`AudioEngine`]
///
/// Freshly created stages carry engine defaults that differ from the effect
/// defaults (volume 0 dB, full reverb wet mix), so callers must push their
/// parameters explicitly.
#[derive(Clone)]
pub struct MockEngine {
    state: Shared,
    clock: ManualClock,
}

impl MockEngine {
    /// Create an engine whose decoded tracks last `track_duration`
    pub fn new(track_duration: Duration) -> Self {
        let state = Arc::new(Mutex::new(MockState {
            now: Duration::ZERO,
            clock: ClockState::Running,
            unlocked: false,
            next_id: 0,
            track_duration,
            stages: HashMap::new(),
            sources: HashMap::new(),
            connections: Vec::new(),
            armed: HashMap::new(),
            calls: Vec::new(),
        }));
        let clock = ManualClock {
            state: Arc::clone(&state),
        };
        Self { state, clock }
    }

    /// Concrete clock handle for advancing time
    pub fn manual_clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Change the duration of subsequently decoded tracks
    pub fn set_track_duration(&self, duration: Duration) {
        lock(&self.state).track_duration = duration;
    }

    /// Make the next call of `failure` return an error
    pub fn fail_next(&self, failure: MockFailure) {
        self.fail_nth(failure, 1);
    }

    /// Let `nth - 1` calls of `failure` succeed, then fail the next one
    pub fn fail_nth(&self, failure: MockFailure, nth: usize) {
        lock(&self.state).armed.insert(failure, nth.max(1));
    }

    /// Whether `unlock` succeeded at least once
    pub fn is_unlocked(&self) -> bool {
        lock(&self.state).unlocked
    }

    /// Current clock state
    pub fn clock_state(&self) -> ClockState {
        lock(&self.state).clock
    }

    /// Value of `param` on the live stage of its kind
    pub fn stage_param(&self, param: StageParam) -> Option<f64> {
        let state = lock(&self.state);
        state
            .stages
            .values()
            .find(|record| record.kind == param.kind() && !record.disposed)
            .and_then(|record| record.params.get(&param).copied())
    }

    /// Id of the live stage of `kind`
    pub fn stage_id(&self, kind: StageKind) -> Option<StageId> {
        let state = lock(&self.state);
        state
            .stages
            .iter()
            .find(|(_, record)| record.kind == kind && !record.disposed)
            .map(|(id, _)| *id)
    }

    /// Number of stages that have not been disposed
    pub fn live_stage_count(&self) -> usize {
        lock(&self.state)
            .stages
            .values()
            .filter(|record| !record.disposed)
            .count()
    }

    /// The most recently created source that has not been disposed
    pub fn live_source(&self) -> Option<StageId> {
        let state = lock(&self.state);
        state
            .sources
            .iter()
            .filter(|(_, record)| !record.disposed)
            .map(|(id, _)| *id)
            .max()
    }

    /// Number of sources that have not been disposed
    pub fn live_source_count(&self) -> usize {
        lock(&self.state)
            .sources
            .values()
            .filter(|record| !record.disposed)
            .count()
    }

    /// State of source `id`
    pub fn source_state(&self, id: StageId) -> Option<SourceState> {
        lock(&self.state).sources.get(&id).map(|record| record.state)
    }

    /// Playback rate of source `id`
    pub fn source_rate(&self, id: StageId) -> Option<f64> {
        lock(&self.state).sources.get(&id).map(|record| record.rate)
    }

    /// How many times source `id` was started
    pub fn source_starts(&self, id: StageId) -> u32 {
        lock(&self.state)
            .sources
            .get(&id)
            .map_or(0, |record| record.starts)
    }

    /// Whether source `id` was created looping
    pub fn source_looping(&self, id: StageId) -> Option<bool> {
        lock(&self.state).sources.get(&id).map(|record| record.looping)
    }

    /// Every connection made so far, in order
    pub fn connections(&self) -> Vec<(StageId, Destination)> {
        lock(&self.state).connections.clone()
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }
}

fn engine_defaults(kind: StageKind) -> HashMap<StageParam, f64> {
    let defaults: &[(StageParam, f64)] = match kind {
        StageKind::Volume => &[(StageParam::VolumeDb, 0.0)],
        StageKind::PitchShift => &[(StageParam::Pitch, 0.0)],
        StageKind::Equalizer => &[
            (StageParam::Low, 0.0),
            (StageParam::Mid, 0.0),
            (StageParam::High, 0.0),
        ],
        StageKind::Reverb => &[(StageParam::Wet, 1.0)],
    };
    defaults.iter().copied().collect()
}

#[async_trait]
impl AudioEngine for MockEngine {
    async fn unlock(&self) -> EngineResult<()> {
        let mut state = lock(&self.state);
        state.calls.push("engine.unlock".to_string());
        if state.take_failure(MockFailure::Unlock) {
            return Err(EngineError::Unlock("no user gesture".to_string()));
        }
        state.unlocked = true;
        state.clock = ClockState::Running;
        Ok(())
    }

    fn clock(&self) -> Arc<dyn EngineClock> {
        Arc::new(self.clock.clone())
    }

    async fn decode(&self, url: &str) -> EngineResult<DecodedTrack> {
        let mut state = lock(&self.state);
        state.calls.push(format!("engine.decode {}", url));
        if state.take_failure(MockFailure::Decode) {
            return Err(EngineError::decode(url, "404 Not Found"));
        }
        let sample_rate = 8_000;
        let frames = (state.track_duration.as_secs_f64() * f64::from(sample_rate)) as usize;
        Ok(DecodedTrack {
            url: url.to_string(),
            duration: state.track_duration,
            sample_rate,
            channels: 2,
            samples: vec![0.0_f32; frames * 2].into(),
        })
    }

    fn create_stage(
        &self,
        kind: StageKind,
        _options: &StageOptions,
    ) -> EngineResult<Box<dyn EffectStage>> {
        let mut state = lock(&self.state);
        if state.take_failure(MockFailure::CreateStage) {
            return Err(EngineError::stage(format!("cannot create {:?}", kind)));
        }
        let id = state.allocate_id();
        state.calls.push(format!("engine.create {:?} {}", kind, id));
        state.stages.insert(
            id,
            StageRecord {
                kind,
                params: engine_defaults(kind),
                disposed: false,
            },
        );
        Ok(Box::new(MockStage {
            id,
            kind,
            state: Arc::clone(&self.state),
        }))
    }

    fn create_source(
        &self,
        track: &DecodedTrack,
        looping: bool,
    ) -> EngineResult<Box<dyn SourceStage>> {
        let mut state = lock(&self.state);
        if state.take_failure(MockFailure::CreateSource) {
            return Err(EngineError::source("cannot create player"));
        }
        let id = state.allocate_id();
        state.calls.push(format!("engine.create_source {}", id));
        state.sources.insert(
            id,
            SourceRecord {
                state: SourceState::Stopped,
                rate: 1.0,
                looping,
                starts: 0,
                disposed: false,
            },
        );
        Ok(Box::new(MockSource {
            id,
            duration: track.duration,
            state: Arc::clone(&self.state),
        }))
    }

    fn connect(&self, from: StageId, to: Destination) -> EngineResult<()> {
        let mut state = lock(&self.state);
        if state.take_failure(MockFailure::Connect) {
            return Err(EngineError::stage(format!("cannot connect {}", from)));
        }
        state.connections.push((from, to));
        Ok(())
    }
}
