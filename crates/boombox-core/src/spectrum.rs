//! Spectrum sampler — folds analyser bins into display bars.
//!
//! Bins are split into `BAR_COUNT` equal slices. Each slice is averaged,
//! normalised to 0..1 and scaled per band:
//!
//! - bass bars: `n^bass_exponent` (quiet rumble suppressed, peaks punch)
//! - mid bars: linear
//! - treble bars: `n^treble_exponent` (faint detail lifted)
//!
//! Heights land in `[floor, ceiling]`; opacity follows height linearly.

use serde::{Deserialize, Serialize};

pub const BAR_COUNT: usize = 16;

/// Band boundaries and curve constants. Chosen by eye, kept configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandScaling {
    /// Last bar index of the bass band (inclusive).
    pub bass_end: usize,
    /// Last bar index of the mid band (inclusive).
    pub mid_end: usize,
    pub bass_exponent: f32,
    pub treble_exponent: f32,
    pub floor: f32,
    pub ceiling: f32,
    pub min_opacity: f32,
    pub max_opacity: f32,
}

impl Default for BandScaling {
    fn default() -> Self {
        Self {
            bass_end: 3,
            mid_end: 11,
            bass_exponent: 2.5,
            treble_exponent: 0.5,
            floor: 2.0,
            ceiling: 100.0,
            min_opacity: 0.6,
            max_opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Bass,
    Mid,
    Treble,
}

impl BandScaling {
    /// Copy with values from a hand-edited config forced into a usable shape.
    /// Non-finite or inverted pairs fall back to the defaults.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let finite_or = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };
        let positive_or = |v: f32, fallback: f32| {
            if v.is_finite() && v > 0.0 {
                v
            } else {
                fallback
            }
        };

        let (floor, ceiling) = {
            let floor = finite_or(self.floor, d.floor);
            let ceiling = finite_or(self.ceiling, d.ceiling);
            if floor <= ceiling {
                (floor, ceiling)
            } else {
                (d.floor, d.ceiling)
            }
        };
        let (min_opacity, max_opacity) = {
            let min = finite_or(self.min_opacity, d.min_opacity).clamp(0.0, 1.0);
            let max = finite_or(self.max_opacity, d.max_opacity).clamp(0.0, 1.0);
            if min <= max {
                (min, max)
            } else {
                (d.min_opacity, d.max_opacity)
            }
        };

        Self {
            bass_end: self.bass_end,
            mid_end: self.mid_end.max(self.bass_end),
            bass_exponent: positive_or(self.bass_exponent, d.bass_exponent),
            treble_exponent: positive_or(self.treble_exponent, d.treble_exponent),
            floor,
            ceiling,
            min_opacity,
            max_opacity,
        }
    }

    pub fn band(&self, bar: usize) -> Band {
        if bar <= self.bass_end {
            Band::Bass
        } else if bar <= self.mid_end {
            Band::Mid
        } else {
            Band::Treble
        }
    }

    /// Bar height for a normalised (0..=1) slice energy.
    pub fn height(&self, bar: usize, normalized: f32) -> f32 {
        let n = normalized.clamp(0.0, 1.0);
        let scaled = match self.band(bar) {
            Band::Bass => n.powf(self.bass_exponent),
            Band::Mid => n,
            Band::Treble => n.powf(self.treble_exponent),
        } * 100.0;
        // max/min rather than clamp: clamp panics on an inverted range.
        scaled.max(self.floor).min(self.ceiling)
    }

    pub fn opacity(&self, height: f32) -> f32 {
        let t = (height / 100.0).clamp(0.0, 1.0);
        self.min_opacity + t * (self.max_opacity - self.min_opacity)
    }

    pub fn resting_bar(&self) -> BarState {
        BarState {
            height: self.floor,
            opacity: self.min_opacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarState {
    /// Percent of full height.
    pub height: f32,
    pub opacity: f32,
}

/// One frame of bar output, lowest frequency first.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    pub bars: [BarState; BAR_COUNT],
}

impl Default for SpectrumFrame {
    fn default() -> Self {
        Self::resting(&BandScaling::default())
    }
}

impl SpectrumFrame {
    pub fn resting(scaling: &BandScaling) -> Self {
        Self {
            bars: [scaling.resting_bar(); BAR_COUNT],
        }
    }

    pub fn is_resting(&self, scaling: &BandScaling) -> bool {
        self.bars.iter().all(|b| *b == scaling.resting_bar())
    }

    pub fn heights(&self) -> [f32; BAR_COUNT] {
        self.bars.map(|b| b.height)
    }
}

/// Compute one frame from a bin snapshot. Fewer bins than bars means there
/// is nothing to sample, and the resting frame comes back.
pub fn run_frame(bins: &[u8], scaling: &BandScaling) -> SpectrumFrame {
    let slice_width = bins.len() / BAR_COUNT;
    if slice_width == 0 {
        return SpectrumFrame::resting(scaling);
    }

    let mut frame = SpectrumFrame::resting(scaling);
    for (i, (bar, slice)) in frame
        .bars
        .iter_mut()
        .zip(bins.chunks_exact(slice_width))
        .enumerate()
    {
        let sum: u32 = slice.iter().map(|&b| b as u32).sum();
        let normalized = sum as f32 / slice_width as f32 / 255.0;
        let height = scaling.height(i, normalized);
        *bar = BarState {
            height,
            opacity: scaling.opacity(height),
        };
    }
    frame
}
