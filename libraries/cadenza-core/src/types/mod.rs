//! Domain types

mod effects;
mod transport;

pub use effects::{EffectParam, EffectParameters, UnknownEffectParam};
pub use transport::{ProgressSample, TransportState};
