//! Audio graph builder.
//!
//! One graph per media element, built lazily on the first playback attempt:
//!
//! ```text
//! source tap → bass shelf → treble shelf → stereo panner → analyser → destination
//! ```
//!
//! After construction only parameters change; the chain is never rebuilt.
//! Every failure (no platform support, closed context, second element)
//! degrades to [`GraphAvailability::Unavailable`], where audio passes
//! through unfiltered.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::config::AudioConfig;
use crate::dsp::{Analyser, AnalyserHandle, AnalyserSettings, ShelfFilter, ShelfKind, StereoPanner};
use crate::error::GraphError;
use crate::media::{ElementId, MediaElement};
use crate::param::AudioParam;

// ── Audio context ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

impl ContextState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ContextState::Running,
            1 => ContextState::Suspended,
            _ => ContextState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ContextState::Running => 0,
            ContextState::Suspended => 1,
            ContextState::Closed => 2,
        }
    }
}

/// Processing context. Clones share state, so a suspend from the platform
/// side is seen by the graph running on the audio thread.
#[derive(Debug, Clone)]
pub struct AudioContext {
    sample_rate: u32,
    state: Arc<AtomicU8>,
}

impl AudioContext {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            state: Arc::new(AtomicU8::new(ContextState::Running.as_u8())),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn suspend(&self) {
        if self.state() == ContextState::Running {
            self.state
                .store(ContextState::Suspended.as_u8(), Ordering::Release);
        }
    }

    pub fn resume(&self) -> Result<(), GraphError> {
        match self.state() {
            ContextState::Closed => Err(GraphError::ContextClosed),
            _ => {
                self.state
                    .store(ContextState::Running.as_u8(), Ordering::Release);
                Ok(())
            }
        }
    }

    pub fn close(&self) {
        self.state.store(ContextState::Closed.as_u8(), Ordering::Release);
    }
}

/// The capability check: a platform either hands out a context or says no.
pub trait AudioPlatform: Send {
    fn create_context(&self, sample_rate: u32) -> Result<AudioContext, GraphError>;
}

/// In-process DSP; always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwarePlatform;

impl AudioPlatform for SoftwarePlatform {
    fn create_context(&self, sample_rate: u32) -> Result<AudioContext, GraphError> {
        Ok(AudioContext::new(sample_rate))
    }
}

/// A platform without audio processing. Playback still works, unfiltered.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatform;

impl AudioPlatform for UnsupportedPlatform {
    fn create_context(&self, _sample_rate: u32) -> Result<AudioContext, GraphError> {
        Err(GraphError::Unsupported)
    }
}

// ── Graph ─────────────────────────────────────────────────────────────────────

/// Node kinds in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    SourceTap,
    BassShelf,
    TrebleShelf,
    Panner,
    Analyser,
    Destination,
}

struct GraphNodes {
    bass: ShelfFilter,
    treble: ShelfFilter,
    panner: StereoPanner,
    analyser: Analyser,
}

/// Shared handle to the one graph bound to a media element.
#[derive(Clone)]
pub struct AudioGraphHandle {
    element: ElementId,
    context: AudioContext,
    nodes: Arc<Mutex<GraphNodes>>,
    bass_gain: AudioParam,
    treble_gain: AudioParam,
    pan: AudioParam,
    analyser: AnalyserHandle,
}

impl std::fmt::Debug for AudioGraphHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioGraphHandle")
            .field("element", &self.element)
            .field("context", &self.context.state())
            .finish()
    }
}

impl AudioGraphHandle {
    fn build(
        element: ElementId,
        context: AudioContext,
        config: &AudioConfig,
    ) -> Result<Self, GraphError> {
        let rate = context.sample_rate() as f32;
        let bass = ShelfFilter::new(ShelfKind::Low, config.bass_frequency_hz, rate);
        let treble = ShelfFilter::new(ShelfKind::High, config.treble_frequency_hz, rate);
        let panner = StereoPanner::new();
        let analyser = Analyser::new(AnalyserSettings::from(config))?;

        Ok(Self {
            element,
            context,
            bass_gain: bass.gain(),
            treble_gain: treble.gain(),
            pan: panner.pan(),
            analyser: analyser.handle(),
            nodes: Arc::new(Mutex::new(GraphNodes {
                bass,
                treble,
                panner,
                analyser,
            })),
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    pub fn chain(&self) -> [NodeKind; 6] {
        [
            NodeKind::SourceTap,
            NodeKind::BassShelf,
            NodeKind::TrebleShelf,
            NodeKind::Panner,
            NodeKind::Analyser,
            NodeKind::Destination,
        ]
    }

    pub fn bass_gain(&self) -> &AudioParam {
        &self.bass_gain
    }

    pub fn treble_gain(&self) -> &AudioParam {
        &self.treble_gain
    }

    pub fn pan(&self) -> &AudioParam {
        &self.pan
    }

    pub fn analyser(&self) -> AnalyserHandle {
        self.analyser.clone()
    }

    /// Pull one block from the tapped element through the chain into `out`.
    /// A context that is not running produces silence.
    pub fn process(&self, element: &mut dyn MediaElement, out: &mut [f32]) {
        if self.context.state() != ContextState::Running {
            out.fill(0.0);
            return;
        }
        element.read(out);

        let mut nodes = lock(&self.nodes);
        nodes.bass.process(out);
        nodes.treble.process(out);
        nodes.panner.process(out);
        nodes.analyser.process(out);
    }
}

fn lock(nodes: &Mutex<GraphNodes>) -> MutexGuard<'_, GraphNodes> {
    nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Result of [`GraphBuilder::ensure_graph`].
#[derive(Debug, Clone)]
pub enum GraphAvailability {
    Available(AudioGraphHandle),
    Unavailable,
}

impl GraphAvailability {
    pub fn handle(&self) -> Option<&AudioGraphHandle> {
        match self {
            GraphAvailability::Available(handle) => Some(handle),
            GraphAvailability::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.handle().is_some()
    }

    pub fn analyser(&self) -> Option<AnalyserHandle> {
        self.handle().map(AudioGraphHandle::analyser)
    }

    /// Write the next block for the output device. Without a graph the
    /// element's samples go out untouched.
    pub fn render(&self, element: &mut dyn MediaElement, out: &mut [f32]) {
        match self {
            GraphAvailability::Available(handle) => handle.process(element, out),
            GraphAvailability::Unavailable => element.read(out),
        }
    }
}

/// Owns the lazily created context and the single graph.
pub struct GraphBuilder {
    platform: Box<dyn AudioPlatform>,
    config: AudioConfig,
    context: Option<AudioContext>,
    graph: Option<AudioGraphHandle>,
    disabled: Option<GraphError>,
    taps_created: usize,
}

impl GraphBuilder {
    pub fn new(platform: Box<dyn AudioPlatform>, config: AudioConfig) -> Self {
        Self {
            platform,
            config,
            context: None,
            graph: None,
            disabled: None,
            taps_created: 0,
        }
    }

    /// Return the graph for `element`, building it on first use and
    /// resuming a suspended context. Safe to call any number of times.
    pub fn ensure_graph(&mut self, element: &dyn MediaElement) -> GraphAvailability {
        match self.try_ensure(element) {
            Ok(handle) => GraphAvailability::Available(handle),
            Err(e @ GraphError::AlreadyTapped(_)) => {
                warn!("audio graph not attached: {}", e);
                GraphAvailability::Unavailable
            }
            Err(e) => {
                if self.disabled.is_none() {
                    warn!("audio processing disabled, passing audio through: {}", e);
                    self.disabled = Some(e);
                }
                GraphAvailability::Unavailable
            }
        }
    }

    fn try_ensure(&mut self, element: &dyn MediaElement) -> Result<AudioGraphHandle, GraphError> {
        if let Some(e) = &self.disabled {
            return Err(e.clone());
        }

        if let Some(graph) = &self.graph {
            if graph.element() != element.id() {
                return Err(GraphError::AlreadyTapped(graph.element()));
            }
            if graph.context().state() == ContextState::Suspended {
                debug!("resuming suspended audio context");
            }
            graph
                .context()
                .resume()
                .map_err(|e| GraphError::ResumeFailed(e.to_string()))?;
            return Ok(graph.clone());
        }

        let context = match &self.context {
            Some(ctx) => ctx.clone(),
            None => {
                let ctx = self.platform.create_context(element.sample_rate())?;
                debug!("audio context created at {} Hz", ctx.sample_rate());
                self.context = Some(ctx.clone());
                ctx
            }
        };

        let graph = AudioGraphHandle::build(element.id(), context, &self.config)?;
        self.taps_created += 1;
        info!(
            "audio graph attached to element {} (bass {} Hz, treble {} Hz, fft {})",
            element.id(),
            self.config.bass_frequency_hz,
            self.config.treble_frequency_hz,
            self.config.fft_size
        );
        self.graph = Some(graph.clone());
        Ok(graph)
    }

    pub fn is_ready(&self) -> bool {
        self.disabled.is_none()
            && self
                .graph
                .as_ref()
                .is_some_and(|g| g.context().state() == ContextState::Running)
    }

    pub fn graph(&self) -> Option<&AudioGraphHandle> {
        self.graph.as_ref()
    }

    pub fn context(&self) -> Option<&AudioContext> {
        self.context.as_ref()
    }

    /// Source taps created so far. Never exceeds one.
    pub fn taps_created(&self) -> usize {
        self.taps_created
    }

    /// Why processing was disabled, if it was.
    pub fn disabled_reason(&self) -> Option<&GraphError> {
        self.disabled.as_ref()
    }
}
