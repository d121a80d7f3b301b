//! Shelf filters (RBJ audio-EQ cookbook, shelf slope S = 1).

use std::f64::consts::PI;

use crate::param::AudioParam;

/// Gain range accepted by the shelf filters, in dB.
pub const SHELF_GAIN_MIN_DB: f32 = -20.0;
pub const SHELF_GAIN_MAX_DB: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShelfKind {
    /// Boost/cut everything below the corner frequency.
    Low,
    /// Boost/cut everything above the corner frequency.
    High,
}

/// Normalised biquad coefficients (a0 = 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    pub fn identity() -> Self {
        Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 }
    }

    pub fn shelf(kind: ShelfKind, freq: f64, gain_db: f64, sample_rate: f64) -> Self {
        let freq = freq.clamp(1.0, sample_rate * 0.499);
        let a = 10.0_f64.powf(gain_db / 40.0);
        if !a.is_finite() || a < 1e-10 {
            return Self::identity();
        }

        let w0 = 2.0 * PI * freq / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / 2.0 * 2.0_f64.sqrt();
        let k = 2.0 * a.sqrt() * alpha;

        let (b0, b1, b2, a0, a1, a2) = match kind {
            ShelfKind::Low => (
                a * ((a + 1.0) - (a - 1.0) * cos + k),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
                a * ((a + 1.0) - (a - 1.0) * cos - k),
                (a + 1.0) + (a - 1.0) * cos + k,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos),
                (a + 1.0) + (a - 1.0) * cos - k,
            ),
            ShelfKind::High => (
                a * ((a + 1.0) + (a - 1.0) * cos + k),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
                a * ((a + 1.0) + (a - 1.0) * cos - k),
                (a + 1.0) - (a - 1.0) * cos + k,
                2.0 * ((a - 1.0) - (a + 1.0) * cos),
                (a + 1.0) - (a - 1.0) * cos - k,
            ),
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Direct Form I history for one channel.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl ChannelState {
    #[inline]
    fn tick(&mut self, c: &BiquadCoeffs, x: f64) -> f64 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// A stereo shelf filter node with a live gain parameter.
#[derive(Debug)]
pub struct ShelfFilter {
    kind: ShelfKind,
    frequency: f32,
    sample_rate: f32,
    gain: AudioParam,
    applied_gain: f32,
    coeffs: BiquadCoeffs,
    state: [ChannelState; 2],
}

impl ShelfFilter {
    pub fn new(kind: ShelfKind, frequency: f32, sample_rate: f32) -> Self {
        Self {
            kind,
            frequency,
            sample_rate,
            gain: AudioParam::new(0.0, SHELF_GAIN_MIN_DB, SHELF_GAIN_MAX_DB),
            applied_gain: 0.0,
            coeffs: BiquadCoeffs::identity(),
            state: [ChannelState::default(); 2],
        }
    }

    pub fn kind(&self) -> ShelfKind {
        self.kind
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Handle to the gain parameter (dB).
    pub fn gain(&self) -> AudioParam {
        self.gain.clone()
    }

    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    fn refresh_coeffs(&mut self) {
        let gain = self.gain.get();
        if gain == self.applied_gain {
            return;
        }
        self.applied_gain = gain;
        self.coeffs = BiquadCoeffs::shelf(
            self.kind,
            self.frequency as f64,
            gain as f64,
            self.sample_rate as f64,
        );
    }

    /// Filter interleaved stereo frames in place.
    pub fn process(&mut self, frames: &mut [f32]) {
        self.refresh_coeffs();
        let coeffs = self.coeffs;
        for frame in frames.chunks_exact_mut(2) {
            frame[0] = self.state[0].tick(&coeffs, frame[0] as f64) as f32;
            frame[1] = self.state[1].tick(&coeffs, frame[1] as f64) as f32;
        }
    }
}
