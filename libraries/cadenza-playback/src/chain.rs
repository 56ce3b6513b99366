//! Effect chain
//!
//! Fixed topology, built once and kept across track loads:
//!
//! ```text
//! source -> volume -> pitch shift -> EQ (low, mid, high) -> reverb -> output
//! ```
//!
//! Only parameter values change at runtime. The source stage belongs to the
//! loaded session; the chain only writes its playback rate.

use crate::error::{PlayerError, Result};
use cadenza_core::units::gain_to_db;
use cadenza_core::{
    AudioEngine, Destination, EffectParam, EffectParameters, EffectStage, EngineError,
    EngineResult, SourceStage, StageId, StageKind, StageOptions, StageParam,
};
use tracing::{debug, info};

/// Where an effect parameter lands in the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamTarget {
    PlaybackRate,
    Stage(StageKind, StageParam),
}

impl ParamTarget {
    fn of(param: EffectParam) -> Self {
        match param {
            EffectParam::Speed => Self::PlaybackRate,
            EffectParam::Pitch => Self::Stage(StageKind::PitchShift, StageParam::Pitch),
            EffectParam::Reverb => Self::Stage(StageKind::Reverb, StageParam::Wet),
            EffectParam::LowEq => Self::Stage(StageKind::Equalizer, StageParam::Low),
            EffectParam::MidEq => Self::Stage(StageKind::Equalizer, StageParam::Mid),
            EffectParam::HighEq => Self::Stage(StageKind::Equalizer, StageParam::High),
            EffectParam::Volume => Self::Stage(StageKind::Volume, StageParam::VolumeDb),
        }
    }
}

/// Engine-side value for a user-facing value
fn to_engine_units(param: EffectParam, value: f64) -> f64 {
    match param {
        EffectParam::Volume => gain_to_db(value),
        _ => value,
    }
}

/// The four persistent downstream stages plus the current parameter values
pub struct EffectChain {
    volume: Box<dyn EffectStage>,
    pitch: Box<dyn EffectStage>,
    eq: Box<dyn EffectStage>,
    reverb: Box<dyn EffectStage>,
    parameters: EffectParameters,
    disposed: bool,
}

impl EffectChain {
    /// Create and connect the four stages.
    ///
    /// Stages are created back to front so each can connect to the one after
    /// it. On failure every stage created so far is disposed.
    ///
    /// The engine's stage defaults are left untouched; call [`apply_all`] or
    /// [`reset`] to push [`EffectParameters`] into the engine.
    ///
    /// [`apply_all`]: EffectChain::apply_all
    /// [`reset`]: EffectChain::reset
    pub fn build(engine: &dyn AudioEngine, options: &StageOptions) -> EngineResult<Self> {
        let order = [
            StageKind::Reverb,
            StageKind::Equalizer,
            StageKind::PitchShift,
            StageKind::Volume,
        ];

        let mut stages: Vec<Box<dyn EffectStage>> = Vec::with_capacity(order.len());
        let mut downstream = Destination::Output;

        for kind in order {
            match Self::create_connected(engine, kind, options, downstream) {
                Ok(stage) => {
                    downstream = Destination::Stage(stage.id());
                    stages.push(stage);
                }
                Err(err) => {
                    for stage in &mut stages {
                        stage.dispose();
                    }
                    return Err(err);
                }
            }
        }

        let [reverb, eq, pitch, volume]: [Box<dyn EffectStage>; 4] = stages
            .try_into()
            .map_err(|_| EngineError::stage("effect chain incomplete"))?;

        info!(input = %volume.id(), "Effect chain built");

        Ok(Self {
            volume,
            pitch,
            eq,
            reverb,
            parameters: EffectParameters::default(),
            disposed: false,
        })
    }

    fn create_connected(
        engine: &dyn AudioEngine,
        kind: StageKind,
        options: &StageOptions,
        downstream: Destination,
    ) -> EngineResult<Box<dyn EffectStage>> {
        let mut stage = engine.create_stage(kind, options)?;
        if let Err(err) = engine.connect(stage.id(), downstream) {
            stage.dispose();
            return Err(err);
        }
        Ok(stage)
    }

    /// Stage a source must connect to
    pub fn input(&self) -> StageId {
        self.volume.id()
    }

    /// Current parameter values
    pub fn parameters(&self) -> EffectParameters {
        self.parameters
    }

    /// Set one parameter, writing exactly one engine control.
    ///
    /// `value` must already be inside the parameter's domain. `speed` goes to
    /// the source's playback rate; without a source it is only stored and
    /// reaches the engine on the next [`apply_all`](EffectChain::apply_all).
    pub fn set_parameter(
        &mut self,
        source: Option<&mut (dyn SourceStage + '_)>,
        param: EffectParam,
        value: f64,
    ) -> Result<()> {
        if !param.contains(value) {
            return Err(PlayerError::InvalidParameter(format!(
                "{} = {} is outside {:?}",
                param,
                value,
                param.domain()
            )));
        }

        self.write(source, param, value)?;
        self.parameters.set(param, value);
        Ok(())
    }

    /// [`set_parameter`](EffectChain::set_parameter) by boundary name
    pub fn set_parameter_by_name(
        &mut self,
        source: Option<&mut (dyn SourceStage + '_)>,
        name: &str,
        value: f64,
    ) -> Result<()> {
        let param: EffectParam = name.parse()?;
        self.set_parameter(source, param, value)
    }

    /// Push every parameter to the engine.
    ///
    /// The whole record is validated before anything is written. If a write
    /// fails, parameters written so far keep their new values.
    pub fn apply_all(
        &mut self,
        mut source: Option<&mut (dyn SourceStage + '_)>,
        parameters: &EffectParameters,
    ) -> Result<()> {
        if let Some((param, value)) = parameters.first_out_of_domain() {
            return Err(PlayerError::InvalidParameter(format!(
                "{} = {} is outside {:?}",
                param,
                value,
                param.domain()
            )));
        }

        for (param, value) in parameters.iter() {
            self.write(source.as_deref_mut(), param, value)?;
            self.parameters.set(param, value);
        }

        debug!(?parameters, "Applied all effects");
        Ok(())
    }

    /// Restore the default parameters and push them to the engine
    pub fn reset(&mut self, source: Option<&mut (dyn SourceStage + '_)>) -> Result<()> {
        self.apply_all(source, &EffectParameters::default())?;
        info!("Reset all effects to defaults");
        Ok(())
    }

    /// Read the engine-side value of `param`.
    ///
    /// Volume is reported in dB. Speed is read from `source`.
    pub fn stage_value(&self, source: Option<&dyn SourceStage>, param: EffectParam) -> Result<f64> {
        match ParamTarget::of(param) {
            ParamTarget::PlaybackRate => source
                .map(|source| source.playback_rate())
                .ok_or(PlayerError::NoAudioLoaded),
            ParamTarget::Stage(kind, stage_param) => Ok(self.stage(kind).param(stage_param)?),
        }
    }

    /// Release all four stages. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.volume.dispose();
        self.pitch.dispose();
        self.eq.dispose();
        self.reverb.dispose();
        self.disposed = true;
        info!("Effect chain disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn write(
        &mut self,
        source: Option<&mut (dyn SourceStage + '_)>,
        param: EffectParam,
        value: f64,
    ) -> Result<()> {
        match ParamTarget::of(param) {
            ParamTarget::PlaybackRate => match source {
                Some(source) => source.set_playback_rate(value)?,
                None => debug!(value, "No source attached, playback rate stored"),
            },
            ParamTarget::Stage(kind, stage_param) => {
                let engine_value = to_engine_units(param, value);
                self.stage_mut(kind).set_param(stage_param, engine_value)?;
            }
        }
        debug!(%param, value, "Applied effect");
        Ok(())
    }

    fn stage(&self, kind: StageKind) -> &dyn EffectStage {
        match kind {
            StageKind::Volume => self.volume.as_ref(),
            StageKind::PitchShift => self.pitch.as_ref(),
            StageKind::Equalizer => self.eq.as_ref(),
            StageKind::Reverb => self.reverb.as_ref(),
        }
    }

    fn stage_mut(&mut self, kind: StageKind) -> &mut dyn EffectStage {
        match kind {
            StageKind::Volume => self.volume.as_mut(),
            StageKind::PitchShift => self.pitch.as_mut(),
            StageKind::Equalizer => self.eq.as_mut(),
            StageKind::Reverb => self.reverb.as_mut(),
        }
    }
}

impl Drop for EffectChain {
    fn drop(&mut self) {
        self.dispose();
    }
}
