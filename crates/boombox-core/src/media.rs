//! Playback source — the element the audio graph taps.
//!
//! `MediaElement` is what the player controls (transport, volume) and what
//! the graph pulls samples from. `PcmElement` is the in-memory
//! implementation used by the terminal player and the tests.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::MediaError;

/// Seconds between two `TimeUpdate` events while playing.
const TIME_UPDATE_INTERVAL_SECS: f64 = 0.25;

/// Identity of one media element. Replacing the source keeps the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle events, drained by the playback controller.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Play,
    Pause,
    Ended,
    Error(String),
    TimeUpdate(f64),
    LoadedMetadata { duration_secs: f64 },
}

pub trait MediaElement: Send {
    fn id(&self) -> ElementId;

    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;

    fn current_time(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn seek(&mut self, secs: f64);

    fn src(&self) -> Option<&str>;

    /// Native output volume, 0..=1.
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);

    fn sample_rate(&self) -> u32;

    /// Fill `out` with interleaved stereo frames. Writes silence while
    /// paused, ended, or without a source.
    fn read(&mut self, out: &mut [f32]);

    fn drain_events(&mut self) -> Vec<MediaEvent>;
}

/// Decoded interleaved stereo audio.
#[derive(Debug, Clone)]
pub struct PcmData {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl PcmData {
    /// Build from interleaved samples. Mono is duplicated to both sides,
    /// extra channels beyond the first two are dropped.
    pub fn from_interleaved(
        samples: &[f32],
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self, MediaError> {
        let stereo: Vec<f32> = match channels {
            0 => return Err(MediaError::UnsupportedChannels(0)),
            1 => samples.iter().flat_map(|&s| [s, s]).collect(),
            2 => samples.to_vec(),
            n => samples
                .chunks_exact(n as usize)
                .flat_map(|frame| [frame[0], frame[1]])
                .collect(),
        };
        Ok(Self {
            samples: Arc::new(stereo),
            sample_rate,
        })
    }

    /// A stereo sine tone, handy for demos and tests.
    pub fn sine(freq: f32, amplitude: f32, secs: f32, sample_rate: u32) -> Self {
        let frames = (secs * sample_rate as f32) as usize;
        let step = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
        let samples = (0..frames)
            .flat_map(|i| {
                let s = amplitude * (step * i as f32).sin();
                [s, s]
            })
            .collect();
        Self {
            samples: Arc::new(samples),
            sample_rate,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

pub struct PcmElement {
    id: ElementId,
    src: Option<String>,
    data: Option<PcmData>,
    position: usize,
    paused: bool,
    volume: f32,
    muted: bool,
    output_rate: u32,
    last_time_update: f64,
    events: VecDeque<MediaEvent>,
}

impl PcmElement {
    pub fn new(output_rate: u32) -> Self {
        Self {
            id: ElementId::next(),
            src: None,
            data: None,
            position: 0,
            paused: true,
            volume: 1.0,
            muted: false,
            output_rate,
            last_time_update: 0.0,
            events: VecDeque::new(),
        }
    }

    /// Swap in a new track. The element (and any tap on it) stays the same;
    /// playback resets to the start in the paused state.
    pub fn set_src(&mut self, src: impl Into<String>, data: PcmData) {
        if data.sample_rate() != self.output_rate {
            tracing::warn!(
                "track rate {} Hz differs from output rate {} Hz; playing at output rate",
                data.sample_rate(),
                self.output_rate
            );
        }
        let duration_secs = data.duration_secs();
        self.src = Some(src.into());
        self.data = Some(data);
        self.position = 0;
        self.last_time_update = 0.0;
        if !self.paused {
            self.paused = true;
            self.events.push_back(MediaEvent::Pause);
        }
        self.events
            .push_back(MediaEvent::LoadedMetadata { duration_secs });
    }

    fn frames_total(&self) -> usize {
        self.data.as_ref().map_or(0, PcmData::frames)
    }

    fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

impl MediaElement for PcmElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.data.is_none() {
            self.events
                .push_back(MediaEvent::Error(MediaError::NoSource.to_string()));
            return Err(MediaError::NoSource);
        }
        if self.position >= self.frames_total() {
            self.position = 0;
        }
        if self.paused {
            self.paused = false;
            self.events.push_back(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.events.push_back(MediaEvent::Pause);
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.position as f64 / self.output_rate.max(1) as f64
    }

    fn duration(&self) -> Option<f64> {
        self.data
            .as_ref()
            .map(|_| self.frames_total() as f64 / self.output_rate.max(1) as f64)
    }

    fn seek(&mut self, secs: f64) {
        let frame = (secs.max(0.0) * self.output_rate as f64) as usize;
        self.position = frame.min(self.frames_total());
        self.last_time_update = self.current_time();
        self.events
            .push_back(MediaEvent::TimeUpdate(self.current_time()));
    }

    fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        if !volume.is_nan() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn sample_rate(&self) -> u32 {
        self.output_rate
    }

    fn read(&mut self, out: &mut [f32]) {
        let gain = self.gain();
        let mut written = 0;

        if !self.paused {
            if let Some(data) = &self.data {
                let start = self.position * 2;
                let available = data.samples.len().saturating_sub(start);
                let n = available.min(out.len()) & !1;
                for (dst, &src) in out[..n].iter_mut().zip(&data.samples[start..start + n]) {
                    *dst = src * gain;
                }
                written = n;
                self.position += n / 2;
            }

            if self.position >= self.frames_total() {
                self.paused = true;
                self.events.push_back(MediaEvent::Ended);
            } else if self.current_time() - self.last_time_update >= TIME_UPDATE_INTERVAL_SECS {
                self.last_time_update = self.current_time();
                self.events
                    .push_back(MediaEvent::TimeUpdate(self.last_time_update));
            }
        }

        out[written..].fill(0.0);
    }

    fn drain_events(&mut self) -> Vec<MediaEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_with(data: PcmData) -> PcmElement {
        let mut el = PcmElement::new(data.sample_rate());
        el.set_src("test.wav", data);
        el
    }

    #[test]
    fn test_mono_is_duplicated() {
        let pcm = PcmData::from_interleaved(&[0.1, 0.2], 1, 8000).unwrap();
        let mut el = element_with(pcm);
        el.play().unwrap();
        let mut out = [0.0; 4];
        el.read(&mut out);
        assert_eq!(out, [0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_play_without_source_errors() {
        let mut el = PcmElement::new(44100);
        assert_eq!(el.play(), Err(MediaError::NoSource));
        assert!(matches!(el.drain_events()[..], [MediaEvent::Error(_)]));
    }

    #[test]
    fn test_paused_reads_silence() {
        let mut el = element_with(PcmData::sine(440.0, 0.5, 0.1, 8000));
        let mut out = [1.0; 8];
        el.read(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(el.current_time(), 0.0);
    }

    #[test]
    fn test_volume_and_mute_scale_output() {
        let pcm = PcmData::from_interleaved(&[0.8, 0.8, 0.8, 0.8], 2, 8000).unwrap();
        let mut el = element_with(pcm);
        el.set_volume(0.5);
        el.play().unwrap();
        let mut out = [0.0; 2];
        el.read(&mut out);
        assert_eq!(out, [0.4, 0.4]);

        el.set_muted(true);
        el.read(&mut out);
        assert_eq!(out, [0.0, 0.0]);
    }

    #[test]
    fn test_end_of_track_emits_ended_once() {
        let pcm = PcmData::from_interleaved(&[0.5; 4], 2, 8000).unwrap();
        let mut el = element_with(pcm);
        el.drain_events();
        el.play().unwrap();

        let mut out = [0.0; 8];
        el.read(&mut out);
        assert_eq!(out, [0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);
        assert!(el.is_paused());
        el.read(&mut out);

        let events = el.drain_events();
        assert_eq!(events, vec![MediaEvent::Play, MediaEvent::Ended]);
    }

    #[test]
    fn test_set_src_keeps_identity_and_pauses() {
        let mut el = element_with(PcmData::sine(440.0, 0.5, 1.0, 8000));
        let id = el.id();
        el.play().unwrap();
        el.drain_events();

        el.set_src("next.wav", PcmData::sine(220.0, 0.5, 2.0, 8000));
        assert_eq!(el.id(), id);
        assert!(el.is_paused());
        assert_eq!(el.src(), Some("next.wav"));
        assert_eq!(
            el.drain_events(),
            vec![
                MediaEvent::Pause,
                MediaEvent::LoadedMetadata { duration_secs: 2.0 }
            ]
        );
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut el = element_with(PcmData::sine(440.0, 0.5, 1.0, 8000));
        el.seek(5.0);
        assert_eq!(el.current_time(), 1.0);
        el.seek(-3.0);
        assert_eq!(el.current_time(), 0.0);
    }
}
