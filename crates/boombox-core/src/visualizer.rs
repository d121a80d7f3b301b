//! Visualizer lifecycle — couples the spectrum sampler to playback state.
//!
//! Two states: `Idle` (bars at rest, nothing scheduled) and `Sampling`
//! (one frame per display refresh). Leaving `Sampling` cancels the frame
//! registration and publishes the resting frame in a single step.
//!
//! Frames go out through a `tokio::sync::watch` channel; the rendering
//! layer subscribes and draws whatever is latest.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::dsp::FrequencySource;
use crate::spectrum::{run_frame, BandScaling, SpectrumFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizerState {
    Idle,
    Sampling,
}

/// Who drives the per-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClock {
    /// The owner calls [`Visualizer::tick`] once per display refresh.
    Manual,
    /// A tokio task ticks at `fps` and publishes frames itself.
    Interval { fps: u32 },
}

/// The scheduled frame callback. Cancelled exactly once, on `cancel()` or
/// on drop, whichever comes first.
pub struct FrameRegistration {
    live: Arc<AtomicUsize>,
    task: Option<AbortHandle>,
    active: bool,
}

impl FrameRegistration {
    fn new(live: Arc<AtomicUsize>, task: Option<AbortHandle>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            live,
            task,
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cancel(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for FrameRegistration {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct Visualizer {
    scaling: BandScaling,
    clock: FrameClock,
    state: VisualizerState,
    source: Option<Arc<dyn FrequencySource>>,
    registration: Option<FrameRegistration>,
    live: Arc<AtomicUsize>,
    /// Bumped on every stop so a frame computed by a cancelled task is
    /// never published after the resting frame.
    epoch: Arc<AtomicU64>,
    tx: watch::Sender<SpectrumFrame>,
    bins: Vec<u8>,
}

impl Visualizer {
    pub fn new(scaling: BandScaling, clock: FrameClock) -> Self {
        let scaling = scaling.sanitized();
        let (tx, _) = watch::channel(SpectrumFrame::resting(&scaling));
        Self {
            scaling,
            clock,
            state: VisualizerState::Idle,
            source: None,
            registration: None,
            live: Arc::new(AtomicUsize::new(0)),
            epoch: Arc::new(AtomicU64::new(0)),
            tx,
            bins: Vec::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SpectrumFrame> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> VisualizerState {
        self.state
    }

    pub fn scaling(&self) -> &BandScaling {
        &self.scaling
    }

    /// Latest published frame.
    pub fn frame(&self) -> SpectrumFrame {
        self.tx.borrow().clone()
    }

    /// Frame callbacks currently registered. Zero whenever idle.
    pub fn live_registrations(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// React to the playback controller's `isPlaying` flag. Playing without
    /// an analyser stays idle: there is nothing to sample.
    pub fn set_playing(
        &mut self,
        playing: bool,
        source: Option<Arc<dyn FrequencySource>>,
    ) -> SpectrumFrame {
        match (playing, source) {
            (true, Some(source)) => self.start(source),
            (true, None) => {
                debug!("playing without analyser; visualizer stays idle");
                self.stop();
            }
            (false, _) => self.stop(),
        }
        self.frame()
    }

    /// A new track was loaded into the element. Sampling resumes on the
    /// next `set_playing(true, ..)`.
    pub fn track_changed(&mut self) {
        self.stop();
    }

    /// Run one frame when sampling under the manual clock; otherwise just
    /// report the latest frame.
    pub fn tick(&mut self) -> SpectrumFrame {
        if self.state == VisualizerState::Sampling && self.clock == FrameClock::Manual {
            if let Some(source) = &self.source {
                source.byte_frequency_data(&mut self.bins);
                self.tx.send_replace(run_frame(&self.bins, &self.scaling));
            }
        }
        self.frame()
    }

    fn start(&mut self, source: Arc<dyn FrequencySource>) {
        if self.state == VisualizerState::Sampling {
            if let FrameClock::Interval { fps } = self.clock {
                // The running task owns the old source; replace it.
                self.epoch.fetch_add(1, Ordering::SeqCst);
                if let Some(mut registration) = self.registration.take() {
                    registration.cancel();
                }
                let task = self.spawn_loop(Arc::clone(&source), fps);
                self.registration = Some(FrameRegistration::new(Arc::clone(&self.live), task));
                debug!("frame loop restarted on a new source");
            }
            self.source = Some(source);
            return;
        }

        let task = match self.clock {
            FrameClock::Manual => None,
            FrameClock::Interval { fps } => self.spawn_loop(Arc::clone(&source), fps),
        };
        self.source = Some(source);
        self.registration = Some(FrameRegistration::new(Arc::clone(&self.live), task));
        self.state = VisualizerState::Sampling;
        info!("visualizer sampling");
    }

    fn spawn_loop(&self, source: Arc<dyn FrequencySource>, fps: u32) -> Option<AbortHandle> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(rt) => rt,
            Err(_) => {
                warn!("no tokio runtime for the frame loop; frames only advance on tick()");
                return None;
            }
        };

        let tx = self.tx.clone();
        let scaling = self.scaling.clone();
        let epoch = Arc::clone(&self.epoch);
        let my_epoch = epoch.load(Ordering::SeqCst);
        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);

        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut bins = Vec::with_capacity(source.frequency_bin_count());
            loop {
                interval.tick().await;
                source.byte_frequency_data(&mut bins);
                let frame = run_frame(&bins, &scaling);
                tx.send_if_modified(|current| {
                    if epoch.load(Ordering::SeqCst) != my_epoch {
                        return false;
                    }
                    *current = frame;
                    true
                });
            }
        });
        Some(handle.abort_handle())
    }

    fn stop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(mut registration) = self.registration.take() {
            registration.cancel();
        }
        self.source = None;
        if self.state == VisualizerState::Sampling {
            info!("visualizer idle");
        }
        self.state = VisualizerState::Idle;
        self.tx.send_replace(SpectrumFrame::resting(&self.scaling));
    }
}

impl Drop for Visualizer {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        // registration's own Drop cancels the frame callback
    }
}
