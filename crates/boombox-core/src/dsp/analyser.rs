//! Frequency analyser node.
//!
//! The audio thread pushes stereo frames through [`Analyser::process`];
//! any number of [`AnalyserHandle`]s read the byte spectrum of the most
//! recent `fft_size` samples on demand.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard};

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::AudioConfig;
use crate::error::GraphError;

/// Anything the spectrum sampler can read frequency bins from.
pub trait FrequencySource: Send + Sync {
    /// Number of bins returned by [`FrequencySource::byte_frequency_data`].
    fn frequency_bin_count(&self) -> usize;

    /// Fill `out` with one byte of energy (0..=255) per bin.
    fn byte_frequency_data(&self, out: &mut Vec<u8>);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserSettings {
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self::from(&AudioConfig::default())
    }
}

impl From<&AudioConfig> for AnalyserSettings {
    fn from(cfg: &AudioConfig) -> Self {
        Self {
            fft_size: cfg.fft_size,
            smoothing_time_constant: cfg.smoothing_time_constant.clamp(0.0, 1.0),
            min_decibels: cfg.min_decibels,
            max_decibels: cfg.max_decibels,
        }
    }
}

impl AnalyserSettings {
    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(GraphError::InvalidFftSize(self.fft_size));
        }
        Ok(())
    }
}

struct AnalyserCore {
    settings: AnalyserSettings,
    samples: VecDeque<f32>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    fft: Arc<dyn Fft<f32>>,
}

impl AnalyserCore {
    fn new(settings: AnalyserSettings) -> Self {
        let n = settings.fft_size;
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n);
        Self {
            settings,
            samples: std::iter::repeat(0.0).take(n).collect(),
            window: blackman_window(n),
            smoothed: vec![0.0; n / 2],
            scratch: vec![Complex::new(0.0, 0.0); n],
            fft,
        }
    }

    fn push(&mut self, sample: f32) {
        if self.samples.len() == self.settings.fft_size {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn spectrum(&mut self, out: &mut Vec<u8>) {
        let n = self.settings.fft_size;
        for (slot, (&s, &w)) in self
            .scratch
            .iter_mut()
            .zip(self.samples.iter().zip(self.window.iter()))
        {
            *slot = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.settings.smoothing_time_constant;
        let db_range = self.settings.max_decibels - self.settings.min_decibels;
        let scale = if db_range > 0.0 { 255.0 / db_range } else { 0.0 };

        out.clear();
        out.reserve(n / 2);
        for (k, bin) in self.scratch.iter().take(n / 2).enumerate() {
            let magnitude = bin.norm() / n as f32;
            let smoothed = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            self.smoothed[k] = if smoothed.is_finite() { smoothed } else { 0.0 };

            let db = 20.0 * self.smoothed[k].log10();
            let byte = (scale * (db - self.settings.min_decibels)).floor();
            out.push(if byte.is_nan() { 0 } else { byte.clamp(0.0, 255.0) as u8 });
        }
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            A0 - A1 * (2.0 * PI * x).cos() + A2 * (4.0 * PI * x).cos()
        })
        .collect()
}

/// Audio-thread side of the analyser.
pub struct Analyser {
    core: Arc<Mutex<AnalyserCore>>,
}

impl Analyser {
    pub fn new(settings: AnalyserSettings) -> Result<Self, GraphError> {
        settings.validate()?;
        Ok(Self {
            core: Arc::new(Mutex::new(AnalyserCore::new(settings))),
        })
    }

    pub fn handle(&self) -> AnalyserHandle {
        AnalyserHandle {
            core: Arc::clone(&self.core),
        }
    }

    /// Record interleaved stereo frames (downmixed to mono). Audio passes
    /// through unchanged.
    pub fn process(&mut self, frames: &[f32]) {
        let mut core = lock(&self.core);
        for frame in frames.chunks_exact(2) {
            core.push(0.5 * (frame[0] + frame[1]));
        }
    }
}

/// Reader side of the analyser, safe to hold on the UI thread.
#[derive(Clone)]
pub struct AnalyserHandle {
    core: Arc<Mutex<AnalyserCore>>,
}

impl std::fmt::Debug for AnalyserHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyserHandle")
            .field("settings", &lock(&self.core).settings)
            .finish()
    }
}

impl AnalyserHandle {
    pub fn settings(&self) -> AnalyserSettings {
        lock(&self.core).settings
    }

    pub fn fft_size(&self) -> usize {
        self.settings().fft_size
    }
}

impl FrequencySource for AnalyserHandle {
    fn frequency_bin_count(&self) -> usize {
        self.fft_size() / 2
    }

    fn byte_frequency_data(&self, out: &mut Vec<u8>) {
        lock(&self.core).spectrum(out);
    }
}

// A panic while holding the lock leaves plain sample data behind; keep using it.
fn lock(core: &Mutex<AnalyserCore>) -> MutexGuard<'_, AnalyserCore> {
    core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_frames(freq: f32, sample_rate: f32, amplitude: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = amplitude * (2.0 * PI * freq * i as f32 / sample_rate).sin();
                [s, s]
            })
            .collect()
    }

    #[test]
    fn test_invalid_fft_size_rejected() {
        let settings = AnalyserSettings { fft_size: 300, ..Default::default() };
        assert_eq!(
            Analyser::new(settings).err(),
            Some(GraphError::InvalidFftSize(300))
        );
    }

    #[test]
    fn test_silence_is_all_zero() {
        let analyser = Analyser::new(AnalyserSettings::default()).unwrap();
        let handle = analyser.handle();
        let mut bins = Vec::new();
        handle.byte_frequency_data(&mut bins);
        assert_eq!(bins.len(), 128);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_in_expected_bin() {
        let settings = AnalyserSettings {
            smoothing_time_constant: 0.0,
            ..Default::default()
        };
        let mut analyser = Analyser::new(settings).unwrap();
        let handle = analyser.handle();

        // 256-point FFT at 48 kHz: 187.5 Hz per bin, so 3 kHz lands in bin 16.
        analyser.process(&sine_frames(3000.0, 48000.0, 0.01, 1024));
        let mut bins = Vec::new();
        handle.byte_frequency_data(&mut bins);

        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|&(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 16);
        assert!(bins[16] > 150);
        assert!(bins[100] < 50);
    }

    #[test]
    fn test_smoothing_lags_behind_input() {
        let mut analyser = Analyser::new(AnalyserSettings::default()).unwrap();
        let handle = analyser.handle();
        analyser.process(&sine_frames(3000.0, 48000.0, 0.01, 1024));

        let mut first = Vec::new();
        handle.byte_frequency_data(&mut first);
        let mut second = Vec::new();
        handle.byte_frequency_data(&mut second);
        assert!(second[16] > first[16]);
    }
}
