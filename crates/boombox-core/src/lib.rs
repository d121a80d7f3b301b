//! Boombox audio core: tone-shaping graph and spectrum visualizer.
//!
//! The player hands a [`media::MediaElement`] to a [`graph::GraphBuilder`],
//! which taps it once and wires
//! `source → bass shelf → treble shelf → panner → analyser → output`.
//! [`tone::ToneControls`] write user settings into that graph, and the
//! [`visualizer::Visualizer`] turns analyser snapshots into 16 display bars
//! for as long as playback runs.

pub mod config;
pub mod dsp;
pub mod error;
pub mod graph;
pub mod media;
pub mod param;
pub mod platform;
pub mod spectrum;
pub mod tone;
pub mod visualizer;

pub use error::{GraphError, MediaError};
pub use graph::{AudioGraphHandle, GraphAvailability, GraphBuilder};
pub use spectrum::{BarState, SpectrumFrame, BAR_COUNT};
pub use tone::{ToneControls, ToneParameters};
pub use visualizer::{FrameClock, Visualizer, VisualizerState};
