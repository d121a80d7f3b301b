//! End-to-end: element → graph → tone → visualizer, driven block by block
//! the way the output device callback and the display refresh would.

use std::sync::Arc;

use boombox_core::config::AudioConfig;
use boombox_core::dsp::FrequencySource;
use boombox_core::graph::{GraphBuilder, SoftwarePlatform, UnsupportedPlatform};
use boombox_core::media::{MediaElement, MediaEvent, PcmData, PcmElement};
use boombox_core::spectrum::BandScaling;
use boombox_core::{
    FrameClock, ToneControls, ToneParameters, Visualizer, VisualizerState, BAR_COUNT,
};

const RATE: u32 = 48_000;
const BLOCK: usize = 512;

struct Player {
    element: PcmElement,
    builder: GraphBuilder,
    tone: ToneControls,
    visualizer: Visualizer,
}

impl Player {
    fn new(builder: GraphBuilder) -> Self {
        Self {
            element: PcmElement::new(RATE),
            builder,
            tone: ToneControls::new(ToneParameters::default()),
            visualizer: Visualizer::new(BandScaling::default(), FrameClock::Manual),
        }
    }

    fn load(&mut self, name: &str, data: PcmData) {
        self.element.set_src(name, data);
        self.visualizer.track_changed();
    }

    fn play(&mut self) {
        let graph = self.builder.ensure_graph(&self.element);
        if let Some(handle) = graph.handle() {
            self.tone.attach(handle.clone());
        }
        self.tone.apply_volume(&mut self.element);
        self.element.play().unwrap();
        let analyser = graph
            .analyser()
            .map(|a| Arc::new(a) as Arc<dyn FrequencySource>);
        self.visualizer.set_playing(true, analyser);
    }

    fn pause(&mut self) {
        self.element.pause();
        self.visualizer.set_playing(false, None);
    }

    fn pump(&mut self, blocks: usize) -> Vec<f32> {
        let graph = self.builder.ensure_graph(&self.element);
        let mut out = vec![0.0; BLOCK * 2];
        for _ in 0..blocks {
            graph.render(&mut self.element, &mut out);
        }
        out
    }
}

fn software() -> GraphBuilder {
    GraphBuilder::new(Box::new(SoftwarePlatform), AudioConfig::default())
}

#[test]
fn loud_bass_tone_lights_bass_bars() {
    let mut p = Player::new(software());
    // 200 Hz sits in analyser bin 1 (187.5 Hz per bin) → bar 0.
    p.load("bass.wav", PcmData::sine(200.0, 0.9, 2.0, RATE));
    p.tone.set_volume(100.0, &mut p.element);
    p.play();
    for _ in 0..10 {
        p.pump(4);
        p.visualizer.tick();
    }
    let frame = p.visualizer.frame();
    assert_eq!(p.visualizer.state(), VisualizerState::Sampling);
    assert!(frame.bars[0].height > 10.0, "bar 0 = {}", frame.bars[0].height);
    assert!(frame.bars[0].height > frame.bars[10].height);
}

#[test]
fn pause_mid_loop_reports_idle_floor_immediately() {
    let mut p = Player::new(software());
    p.load("a.wav", PcmData::sine(3000.0, 0.9, 2.0, RATE));
    p.play();
    p.pump(20);
    assert!(!p.visualizer.tick().is_resting(&BandScaling::default()));

    p.pause();
    let frame = p.visualizer.tick();
    for bar in frame.bars {
        assert_eq!(bar.height, 2.0);
        assert_eq!(bar.opacity, 0.6);
    }
    assert_eq!(p.visualizer.live_registrations(), 0);
}

#[test]
fn track_change_reuses_the_tap() {
    let mut p = Player::new(software());
    p.load("a.wav", PcmData::sine(440.0, 0.5, 0.5, RATE));
    p.play();
    p.pump(4);

    p.load("b.wav", PcmData::sine(880.0, 0.5, 0.5, RATE));
    assert_eq!(p.visualizer.state(), VisualizerState::Idle);
    p.play();
    p.pump(4);

    assert_eq!(p.builder.taps_created(), 1);
    assert_eq!(p.visualizer.live_registrations(), 1);
}

#[test]
fn bass_change_leaves_mid_and_treble_bars_alone() {
    let track = PcmData::sine(5000.0, 0.7, 2.0, RATE);
    let mut boosted = Player::new(software());
    let mut control = Player::new(software());
    for p in [&mut boosted, &mut control] {
        p.load("a.wav", track.clone());
        p.play();
        p.pump(20);
        p.visualizer.tick();
    }

    let before = boosted.visualizer.frame();
    boosted.tone.set_bass(15.0);
    // A setter never publishes a frame by itself.
    assert_eq!(boosted.visualizer.frame(), before);
    assert_eq!(boosted.tone.params().treble_gain_db, 0.0);
    assert_eq!(boosted.tone.params().pan_position, 0.0);

    for p in [&mut boosted, &mut control] {
        p.pump(20);
        p.visualizer.tick();
    }
    let (a, b) = (boosted.visualizer.frame(), control.visualizer.frame());
    for bar in 4..BAR_COUNT {
        let delta = (a.bars[bar].height - b.bars[bar].height).abs();
        assert!(delta < 2.0, "bar {bar} moved by {delta}");
    }
}

#[test]
fn tone_set_before_playback_applies_on_first_play() {
    let mut p = Player::new(software());
    p.tone.set_treble(-8.0);
    p.tone.set_pan_ui(-50.0);
    p.load("a.wav", PcmData::sine(440.0, 0.5, 0.5, RATE));
    assert!(p.builder.graph().is_none());

    p.play();
    let graph = p.builder.graph().unwrap();
    assert_eq!(graph.treble_gain().get(), -8.0);
    assert_eq!(graph.pan().get(), -1.0);
}

#[test]
fn hard_left_pan_silences_right_channel() {
    let mut p = Player::new(software());
    p.load("a.wav", PcmData::sine(440.0, 0.5, 1.0, RATE));
    p.tone.set_pan(-1.0);
    p.play();
    let out = p.pump(2);
    assert!(out.chunks_exact(2).all(|f| f[1].abs() < 1e-6));
    assert!(out.chunks_exact(2).any(|f| f[0].abs() > 0.1));
}

#[test]
fn unsupported_platform_still_plays() {
    let mut p = Player::new(GraphBuilder::new(
        Box::new(UnsupportedPlatform),
        AudioConfig::default(),
    ));
    p.load("a.wav", PcmData::sine(440.0, 0.5, 1.0, RATE));
    p.tone.set_bass(20.0);
    p.play();

    let out = p.pump(2);
    assert!(out.iter().any(|&s| s.abs() > 0.1));
    assert_eq!(p.visualizer.state(), VisualizerState::Idle);
    assert!(p.visualizer.tick().is_resting(&BandScaling::default()));
    assert!(!p.tone.is_attached());
}

#[test]
fn track_end_is_reported() {
    let mut p = Player::new(software());
    p.load("short.wav", PcmData::sine(440.0, 0.5, 0.01, RATE));
    p.element.drain_events();
    p.play();
    p.pump(4);

    let events = p.element.drain_events();
    assert_eq!(events.first(), Some(&MediaEvent::Play));
    assert_eq!(events.last(), Some(&MediaEvent::Ended));
    assert!(p.element.is_paused());
}
