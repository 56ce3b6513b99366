//! Effect parameter types

use crate::units::unit_to_percent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// One of the seven user-adjustable effect parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectParam {
    /// Playback-rate multiplier (0.25 - 2.0)
    #[serde(rename = "speed")]
    Speed,
    /// Pitch shift in semitones (-12 - 12)
    #[serde(rename = "pitch")]
    Pitch,
    /// Reverb wet mix (0 - 1)
    #[serde(rename = "reverb")]
    Reverb,
    /// Low band gain in dB (-20 - 20)
    #[serde(rename = "lowEQ")]
    LowEq,
    /// Mid band gain in dB (-20 - 20)
    #[serde(rename = "midEQ")]
    MidEq,
    /// High band gain in dB (-20 - 20)
    #[serde(rename = "highEQ")]
    HighEq,
    /// Linear output gain (0 - 1)
    #[serde(rename = "volume")]
    Volume,
}

impl EffectParam {
    /// Every parameter, in the order they are applied
    pub const ALL: [EffectParam; 7] = [
        EffectParam::Speed,
        EffectParam::Pitch,
        EffectParam::Reverb,
        EffectParam::LowEq,
        EffectParam::MidEq,
        EffectParam::HighEq,
        EffectParam::Volume,
    ];

    /// Name used at the presentation boundary
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Pitch => "pitch",
            Self::Reverb => "reverb",
            Self::LowEq => "lowEQ",
            Self::MidEq => "midEQ",
            Self::HighEq => "highEQ",
            Self::Volume => "volume",
        }
    }

    /// Valid value range
    #[must_use]
    pub fn domain(self) -> RangeInclusive<f64> {
        match self {
            Self::Speed => 0.25..=2.0,
            Self::Pitch => -12.0..=12.0,
            Self::Reverb | Self::Volume => 0.0..=1.0,
            Self::LowEq | Self::MidEq | Self::HighEq => -20.0..=20.0,
        }
    }

    /// Check that `value` is finite and inside the domain
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        value.is_finite() && self.domain().contains(&value)
    }

    /// Clamp `value` into the domain.
    ///
    /// Returns `None` for NaN; infinities clamp to the nearest bound.
    #[must_use]
    pub fn clamp(self, value: f64) -> Option<f64> {
        if value.is_nan() {
            return None;
        }
        let domain = self.domain();
        Some(value.clamp(*domain.start(), *domain.end()))
    }

    /// Human-readable label for a value of this parameter
    #[must_use]
    pub fn format_value(self, value: f64) -> String {
        match self {
            Self::Speed => format!("{:.2}x", value),
            Self::Pitch => format!("{:.1} semitones", value),
            Self::Reverb | Self::Volume => format!("{:.0}%", unit_to_percent(value)),
            Self::LowEq | Self::MidEq | Self::HighEq => format!("{:.1} dB", value),
        }
    }
}

impl fmt::Display for EffectParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unknown effect parameter name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown effect parameter: {0}")]
pub struct UnknownEffectParam(pub String);

impl FromStr for EffectParam {
    type Err = UnknownEffectParam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|param| param.name() == s)
            .ok_or_else(|| UnknownEffectParam(s.to_string()))
    }
}

/// Current value of every effect parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectParameters {
    /// Playback-rate multiplier
    pub speed: f64,
    /// Semitones
    pub pitch: f64,
    /// Wet mix
    pub reverb: f64,
    /// Low band, dB
    #[serde(rename = "lowEQ")]
    pub low_eq: f64,
    /// Mid band, dB
    #[serde(rename = "midEQ")]
    pub mid_eq: f64,
    /// High band, dB
    #[serde(rename = "highEQ")]
    pub high_eq: f64,
    /// Linear gain
    pub volume: f64,
}

impl EffectParameters {
    /// Default output volume
    pub const DEFAULT_VOLUME: f64 = 0.7;

    /// Read one parameter
    #[must_use]
    pub fn get(&self, param: EffectParam) -> f64 {
        match param {
            EffectParam::Speed => self.speed,
            EffectParam::Pitch => self.pitch,
            EffectParam::Reverb => self.reverb,
            EffectParam::LowEq => self.low_eq,
            EffectParam::MidEq => self.mid_eq,
            EffectParam::HighEq => self.high_eq,
            EffectParam::Volume => self.volume,
        }
    }

    /// Write one parameter (no domain check)
    pub fn set(&mut self, param: EffectParam, value: f64) {
        let slot = match param {
            EffectParam::Speed => &mut self.speed,
            EffectParam::Pitch => &mut self.pitch,
            EffectParam::Reverb => &mut self.reverb,
            EffectParam::LowEq => &mut self.low_eq,
            EffectParam::MidEq => &mut self.mid_eq,
            EffectParam::HighEq => &mut self.high_eq,
            EffectParam::Volume => &mut self.volume,
        };
        *slot = value;
    }

    /// First parameter whose value is outside its domain, if any
    #[must_use]
    pub fn first_out_of_domain(&self) -> Option<(EffectParam, f64)> {
        EffectParam::ALL
            .into_iter()
            .map(|param| (param, self.get(param)))
            .find(|(param, value)| !param.contains(*value))
    }

    /// Iterate `(param, value)` pairs in application order
    pub fn iter(&self) -> impl Iterator<Item = (EffectParam, f64)> + '_ {
        EffectParam::ALL
            .into_iter()
            .map(move |param| (param, self.get(param)))
    }
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 0.0,
            reverb: 0.0,
            low_eq: 0.0,
            mid_eq: 0.0,
            high_eq: 0.0,
            volume: Self::DEFAULT_VOLUME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_domain() {
        let params = EffectParameters::default();
        assert_eq!(params.speed, 1.0);
        assert_eq!(params.volume, 0.7);
        assert!(params.first_out_of_domain().is_none());
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for param in EffectParam::ALL {
            assert_eq!(param.name().parse::<EffectParam>(), Ok(param));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "bass".parse::<EffectParam>().unwrap_err();
        assert_eq!(err, UnknownEffectParam("bass".to_string()));

        // Names are case sensitive
        assert!("lowEq".parse::<EffectParam>().is_err());
    }

    #[test]
    fn clamp_respects_domain() {
        assert_eq!(EffectParam::Speed.clamp(5.0), Some(2.0));
        assert_eq!(EffectParam::Speed.clamp(0.0), Some(0.25));
        assert_eq!(EffectParam::Pitch.clamp(-30.0), Some(-12.0));
        assert_eq!(EffectParam::Volume.clamp(f64::INFINITY), Some(1.0));
        assert_eq!(EffectParam::LowEq.clamp(f64::NAN), None);
        assert_eq!(EffectParam::Reverb.clamp(0.3), Some(0.3));
    }

    #[test]
    fn contains_rejects_non_finite() {
        assert!(EffectParam::Volume.contains(0.0));
        assert!(EffectParam::Volume.contains(1.0));
        assert!(!EffectParam::Volume.contains(1.01));
        assert!(!EffectParam::HighEq.contains(f64::NAN));
    }

    #[test]
    fn get_set_every_field() {
        let mut params = EffectParameters::default();
        for (i, param) in EffectParam::ALL.into_iter().enumerate() {
            params.set(param, i as f64 * 0.1);
        }
        for (i, param) in EffectParam::ALL.into_iter().enumerate() {
            assert_eq!(params.get(param), i as f64 * 0.1);
        }
    }

    #[test]
    fn out_of_domain_is_reported() {
        let mut params = EffectParameters::default();
        params.mid_eq = 25.0;
        assert_eq!(
            params.first_out_of_domain(),
            Some((EffectParam::MidEq, 25.0))
        );
    }

    #[test]
    fn value_labels() {
        assert_eq!(EffectParam::Speed.format_value(1.0), "1.00x");
        assert_eq!(EffectParam::Volume.format_value(0.7), "70%");
        assert_eq!(EffectParam::Reverb.format_value(0.0), "0%");
        assert_eq!(EffectParam::Pitch.format_value(-3.5), "-3.5 semitones");
        assert_eq!(EffectParam::HighEq.format_value(6.0), "6.0 dB");
    }

    #[test]
    fn serializes_with_boundary_names() {
        let json = serde_json::to_value(EffectParameters::default()).unwrap();
        assert_eq!(json["lowEQ"], 0.0);
        assert_eq!(json["volume"], 0.7);
        assert_eq!(
            serde_json::to_value(EffectParam::HighEq).unwrap(),
            "highEQ"
        );
    }
}
