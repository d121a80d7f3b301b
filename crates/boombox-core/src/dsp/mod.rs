//! Signal nodes of the tone/analysis chain.

pub mod analyser;
pub mod biquad;
pub mod panner;

pub use analyser::{Analyser, AnalyserHandle, AnalyserSettings, FrequencySource};
pub use biquad::{ShelfFilter, ShelfKind};
pub use panner::StereoPanner;
