//! App — playback controller and event loop.
//!
//! Architecture:
//! - `App` owns the element handle, the graph builder, tone controls and the
//!   visualizer. It is the only place that flips `is_playing`.
//! - A blocking task forwards terminal events over a `tokio::mpsc` channel.
//! - The visualizer publishes bar frames on a `watch` channel; a new frame
//!   triggers a redraw.
//! - A media tick drains element events (time updates, track end, errors).

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Terminal,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use boombox_core::config::Config;
use boombox_core::dsp::FrequencySource;
use boombox_core::graph::{AudioPlatform, GraphBuilder};
use boombox_core::media::{MediaElement, MediaEvent};
use boombox_core::spectrum::SpectrumFrame;
use boombox_core::{FrameClock, ToneControls, ToneParameters, Visualizer};

use crate::action::Action;
use crate::components::spectrum_bars::draw_spectrum;
use crate::components::status::{draw_footer, draw_header, StatusInfo, Transport};
use crate::decode::decode_wav;
use crate::output::{lock, SharedElement, SharedGraph};
use crate::theme::C_BG;

/// How often element events are drained.
const MEDIA_TICK_MS: u64 = 50;
const INPUT_POLL_MS: u64 = 100;

enum AppMessage {
    Event(Event),
}

pub struct App {
    playlist: Vec<PathBuf>,
    current: usize,
    element: SharedElement,
    graph: SharedGraph,
    builder: GraphBuilder,
    tone: ToneControls,
    tone_path: PathBuf,
    visualizer: Visualizer,
    frames: watch::Receiver<SpectrumFrame>,
    is_playing: bool,
    autoplay: bool,
    position_secs: f64,
    duration_secs: Option<f64>,
    error: Option<String>,
    show_keys: bool,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: &Config,
        platform: Box<dyn AudioPlatform>,
        playlist: Vec<PathBuf>,
        element: SharedElement,
        graph: SharedGraph,
        tone: ToneParameters,
        tone_path: PathBuf,
    ) -> Self {
        let visualizer = Visualizer::new(
            config.visualizer.scaling.clone(),
            FrameClock::Interval {
                fps: config.visualizer.frame_rate,
            },
        );
        let frames = visualizer.subscribe();
        let tone = ToneControls::new(tone);
        tone.apply_volume(&mut *lock(&element));

        Self {
            playlist,
            current: 0,
            element,
            graph,
            builder: GraphBuilder::new(platform, config.audio.clone()),
            tone,
            tone_path,
            visualizer,
            frames,
            is_playing: false,
            autoplay: config.player.autoplay,
            position_secs: 0.0,
            duration_secs: None,
            error: None,
            show_keys: true,
            should_quit: false,
        }
    }

    // ── Playback control ──────────────────────────────────────────────────────

    fn load_track(&mut self, index: usize) {
        let Some(path) = self.playlist.get(index).cloned() else {
            return;
        };
        self.set_playing(false);
        self.visualizer.track_changed();
        self.current = index;
        self.position_secs = 0.0;
        self.duration_secs = None;

        match decode_wav(&path) {
            Ok(data) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                info!("loaded {}", path.display());
                lock(&self.element).set_src(name, data);
                self.error = None;
            }
            Err(e) => {
                warn!("could not load {}: {:#}", path.display(), e);
                self.error = Some(format!("{:#}", e));
            }
        }
    }

    fn play(&mut self) {
        // Graph is built on the first playback attempt and reused after.
        let availability = {
            let element = lock(&self.element);
            self.builder.ensure_graph(&*element)
        };
        if let Some(handle) = availability.handle() {
            self.tone.attach(handle.clone());
        }
        *lock(&self.graph) = availability.clone();

        let started = {
            let mut element = lock(&self.element);
            self.tone.apply_volume(&mut *element);
            element.play()
        };
        match started {
            Ok(()) => {
                let analyser = availability
                    .analyser()
                    .map(|a| Arc::new(a) as Arc<dyn FrequencySource>);
                self.is_playing = true;
                self.visualizer.set_playing(true, analyser);
            }
            Err(e) => {
                warn!("play failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if playing {
            self.play();
            return;
        }
        lock(&self.element).pause();
        if self.is_playing {
            debug!("playback paused");
        }
        self.is_playing = false;
        self.visualizer.set_playing(false, None);
    }

    fn transport(&self) -> Transport {
        if self.is_playing {
            Transport::Playing
        } else if self.position_secs > 0.0 {
            Transport::Paused
        } else {
            Transport::Stopped
        }
    }

    fn handle_media_events(&mut self) -> bool {
        let events = lock(&self.element).drain_events();
        let redraw = !events.is_empty();
        for event in events {
            match event {
                MediaEvent::TimeUpdate(t) => self.position_secs = t,
                MediaEvent::LoadedMetadata { duration_secs } => {
                    self.duration_secs = Some(duration_secs)
                }
                MediaEvent::Ended => {
                    info!("track ended");
                    self.set_playing(false);
                    self.position_secs = 0.0;
                    if self.current + 1 < self.playlist.len() {
                        self.load_track(self.current + 1);
                        self.set_playing(true);
                    }
                }
                MediaEvent::Error(msg) => {
                    warn!("media error: {}", msg);
                    self.error = Some(msg);
                }
                MediaEvent::Play | MediaEvent::Pause => {}
            }
        }
        redraw
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::TogglePause => {
                let playing = self.is_playing;
                self.set_playing(!playing);
            }
            Action::Stop => {
                self.set_playing(false);
                lock(&self.element).seek(0.0);
                self.position_secs = 0.0;
            }
            Action::Next => {
                if self.current + 1 < self.playlist.len() {
                    let was_playing = self.is_playing;
                    self.load_track(self.current + 1);
                    if was_playing {
                        self.set_playing(true);
                    }
                }
            }
            Action::Prev => {
                let was_playing = self.is_playing;
                self.load_track(self.current.saturating_sub(1));
                if was_playing {
                    self.set_playing(true);
                }
            }
            Action::SeekRelative(delta) => {
                let mut element = lock(&self.element);
                let target = element.current_time() + delta;
                element.seek(target);
                self.position_secs = element.current_time();
            }
            Action::Mute => {
                let mut element = lock(&self.element);
                let muted = element.muted();
                element.set_muted(!muted);
            }
            Action::BassDelta(d) => {
                let db = self.tone.params().bass_gain_db + d;
                self.tone.set_bass(db);
            }
            Action::TrebleDelta(d) => {
                let db = self.tone.params().treble_gain_db + d;
                self.tone.set_treble(db);
            }
            Action::PanDelta(d) => {
                let ui = self.tone.params().pan_position * boombox_core::tone::PAN_UI_RANGE + d;
                self.tone.set_pan_ui(ui);
            }
            Action::VolumeDelta(d) => {
                let level = self.tone.params().volume_level + d;
                self.tone.set_volume(level, &mut *lock(&self.element));
            }
            Action::ResetTone => {
                self.tone.set_bass(0.0);
                self.tone.set_treble(0.0);
                self.tone.set_pan(0.0);
            }
            Action::ToggleHelp => self.show_keys = !self.show_keys,
            Action::Quit => self.should_quit = true,
            Action::Noop => {}
        }
    }

    fn status(&self) -> StatusInfo {
        let element = lock(&self.element);
        StatusInfo {
            track: element.src().map(str::to_string),
            track_index: self.current,
            track_count: self.playlist.len(),
            transport: self.transport(),
            position_secs: self.position_secs,
            duration_secs: self.duration_secs,
            muted: element.muted(),
            graph_available: self.builder.disabled_reason().is_none(),
            error: self.error.clone(),
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let footer_h = if self.show_keys { 2 } else { 1 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(footer_h),
            ])
            .split(area);

        draw_header(frame, rows[0], &self.status());
        let spectrum = self.frames.borrow().clone();
        draw_spectrum(frame, rows[1], &spectrum);
        draw_footer(frame, rows[2], &self.tone.params(), self.show_keys);
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        if let Err(e) = self.tone.params().save(&self.tone_path) {
            warn!("could not save tone settings: {:#}", e);
        }
        // Cancels the frame registration before the terminal goes away.
        self.set_playing(false);
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard events ──────────────────────────────────
        // Polls so the thread notices the receiver going away on quit.
        tokio::task::spawn_blocking(move || {
            while !tx.is_closed() {
                match event::poll(Duration::from_millis(INPUT_POLL_MS)) {
                    Ok(true) => match event::read() {
                        Ok(ev) => {
                            if tx.blocking_send(AppMessage::Event(ev)).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    },
                    Ok(false) => {}
                    Err(_) => break,
                }
            }
        });

        // Separate receiver so the select futures don't borrow `self`.
        let mut frame_updates = self.visualizer.subscribe();

        let mut media_tick = tokio::time::interval(Duration::from_millis(MEDIA_TICK_MS));
        media_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        if !self.playlist.is_empty() {
            self.load_track(0);
            if self.autoplay {
                self.set_playing(true);
            }
        }

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(AppMessage::Event(ev)) = rx.recv() => {
                    match ev {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            self.dispatch(Action::from_key(key));
                        }
                        _ => {}
                    }
                    needs_redraw = true;
                }
                changed = frame_updates.changed() => {
                    needs_redraw = changed.is_ok();
                }
                _ = media_tick.tick() => {
                    needs_redraw = self.handle_media_events();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use boombox_core::graph::{SoftwarePlatform, UnsupportedPlatform};
    use boombox_core::media::{PcmData, PcmElement};
    use boombox_core::{GraphAvailability, VisualizerState};

    use super::*;

    const RATE: u32 = 48_000;

    fn app_with(platform: Box<dyn AudioPlatform>) -> App {
        let element = Arc::new(Mutex::new(PcmElement::new(RATE)));
        let graph = Arc::new(Mutex::new(GraphAvailability::Unavailable));
        App::new(
            &Config::default(),
            platform,
            Vec::new(),
            element,
            graph,
            ToneParameters::default(),
            PathBuf::from("tone.json"),
        )
    }

    fn load_sine(app: &App) {
        lock(&app.element).set_src("sine.wav", PcmData::sine(440.0, 0.5, 1.0, RATE));
    }

    #[test]
    fn test_play_without_track_reports_error() {
        let mut app = app_with(Box::new(SoftwarePlatform));
        app.dispatch(Action::TogglePause);
        assert!(!app.is_playing);
        assert!(app.error.is_some());
        assert_eq!(app.visualizer.state(), VisualizerState::Idle);
    }

    #[test]
    fn test_first_play_builds_graph_into_output_slot() {
        let mut app = app_with(Box::new(SoftwarePlatform));
        load_sine(&app);
        assert!(!lock(&app.graph).is_available());

        app.dispatch(Action::TogglePause);
        assert!(app.is_playing);
        assert!(lock(&app.graph).is_available());
        assert_eq!(app.visualizer.state(), VisualizerState::Sampling);

        app.dispatch(Action::TogglePause);
        assert!(!app.is_playing);
        assert_eq!(app.visualizer.state(), VisualizerState::Idle);
        assert_eq!(app.builder.taps_created(), 1);
    }

    #[test]
    fn test_unsupported_platform_plays_without_visualizer() {
        let mut app = app_with(Box::new(UnsupportedPlatform));
        load_sine(&app);
        app.dispatch(Action::TogglePause);
        assert!(app.is_playing);
        assert!(!lock(&app.graph).is_available());
        assert_eq!(app.visualizer.state(), VisualizerState::Idle);
        assert!(!app.status().graph_available);
    }

    #[test]
    fn test_tone_keys_update_parameters() {
        let mut app = app_with(Box::new(SoftwarePlatform));
        app.dispatch(Action::BassDelta(3.0));
        app.dispatch(Action::PanDelta(-5.0));
        app.dispatch(Action::VolumeDelta(25.0));

        let tone = app.tone.params();
        assert_eq!(tone.bass_gain_db, 3.0);
        assert!((tone.pan_position + 0.1).abs() < 1e-6);
        assert_eq!(tone.volume_level, 75.0);
        assert!((lock(&app.element).volume() - 0.75).abs() < 1e-6);

        app.dispatch(Action::ResetTone);
        let tone = app.tone.params();
        assert_eq!(tone.bass_gain_db, 0.0);
        assert_eq!(tone.pan_position, 0.0);
        assert_eq!(tone.volume_level, 75.0);
    }

    #[test]
    fn test_stop_rewinds() {
        let mut app = app_with(Box::new(SoftwarePlatform));
        load_sine(&app);
        app.dispatch(Action::TogglePause);
        app.dispatch(Action::SeekRelative(0.5));
        assert!(app.position_secs > 0.0);

        app.dispatch(Action::Stop);
        assert_eq!(app.transport(), Transport::Stopped);
        assert_eq!(lock(&app.element).current_time(), 0.0);
    }

    #[test]
    fn test_mute_toggles() {
        let mut app = app_with(Box::new(SoftwarePlatform));
        app.dispatch(Action::Mute);
        assert!(lock(&app.element).muted());
        app.dispatch(Action::Mute);
        assert!(!lock(&app.element).muted());
    }
}
