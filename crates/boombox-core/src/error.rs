use thiserror::Error;

use crate::media::ElementId;

/// Failures while building or resuming the audio graph.
///
/// None of these are fatal to playback: the builder turns every variant
/// into [`GraphAvailability::Unavailable`](crate::graph::GraphAvailability)
/// and audio passes straight through to the output.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("no audio processing capability on this platform")]
    Unsupported,

    #[error("media element {0} already has a source tap")]
    AlreadyTapped(ElementId),

    #[error("audio context is closed")]
    ContextClosed,

    #[error("could not resume audio context: {0}")]
    ResumeFailed(String),

    #[error("invalid analyser fft size {0} (power of two in 32..=32768 required)")]
    InvalidFftSize(usize),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MediaError {
    #[error("media element has no source")]
    NoSource,

    #[error("unsupported channel count {0}")]
    UnsupportedChannels(u16),
}
